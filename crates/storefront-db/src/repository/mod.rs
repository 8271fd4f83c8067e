//! # Repository Module
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories Borrow a Connection                     │
//! │                                                                         │
//! │  let mut tx = db.begin().await?;                                       │
//! │       │                                                                 │
//! │       ├── CartRepository::new(&mut tx).find_by_customer(..)            │
//! │       ├── ProductRepository::new(&mut tx).get_by_id(..)                │
//! │       └── OrderRepository::new(&mut tx).insert(..)                     │
//! │       │                                                                 │
//! │  tx.commit().await?;   ← all of it, or (on drop) none of it            │
//! │                                                                         │
//! │  A repository lives for one borrow of the connection, so several can   │
//! │  take turns on the same transaction.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Products and stock decrements
//! - [`CustomerRepository`] - Customers, credit cards, addresses
//! - [`CartRepository`] - Carts and reservations
//! - [`OrderRepository`] - Orders, lines, payments
//! - [`CouponRepository`] - Coupons

pub mod cart;
pub mod coupon;
pub mod customer;
pub mod order;
pub mod product;

pub use cart::CartRepository;
pub use coupon::CouponRepository;
pub use customer::CustomerRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
