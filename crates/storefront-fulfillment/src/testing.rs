//! Fixtures shared by the unit tests.
//!
//! Every helper takes its own pooled connection and returns it before
//! finishing; the in-memory pool only has one.

use chrono::{DateTime, Duration, Utc};

use storefront_core::{Address, Coupon, CouponType, CreditCard, Customer, Product, Reservation};
use storefront_db::{
    CartRepository, CouponRepository, CustomerRepository, Database, DbConfig, ProductRepository,
};

pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub async fn seed_customer(db: &Database, id: &str) {
    let mut conn = db.acquire().await.unwrap();
    let mut repo = CustomerRepository::new(&mut conn);
    if repo.get_by_id(id).await.unwrap().is_some() {
        return;
    }
    repo.insert(&Customer {
        id: id.to_string(),
        name: format!("Customer {}", id),
        email: format!("{}@example.com", id),
        is_active: true,
        ranking: 0,
        created_at: Utc::now(),
    })
    .await
    .unwrap();
}

/// Active product weighing 500 g.
pub async fn seed_product(db: &Database, id: &str, stock: i64, price_cents: i64) {
    let mut conn = db.acquire().await.unwrap();
    let now = Utc::now();
    ProductRepository::new(&mut conn)
        .insert(&Product {
            id: id.to_string(),
            sku: format!("SKU-{}", id),
            name: format!("Product {}", id),
            sale_price_cents: price_cents,
            stock_quantity: stock,
            weight_grams: 500,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
}

/// Puts a blocked hold in `customer_id`'s cart; returns the reservation id.
pub async fn seed_reservation(
    db: &Database,
    customer_id: &str,
    product_id: &str,
    quantity: i64,
    expires_at: DateTime<Utc>,
) -> String {
    seed_customer(db, customer_id).await;

    let mut conn = db.acquire().await.unwrap();
    let mut repo = CartRepository::new(&mut conn);
    let cart = match repo.find_by_customer(customer_id).await.unwrap() {
        Some(cart) => cart,
        None => repo.create(customer_id, Utc::now()).await.unwrap(),
    };

    let reservation = Reservation {
        id: uuid::Uuid::new_v4().to_string(),
        cart_id: cart.id,
        product_id: product_id.to_string(),
        quantity,
        is_blocked: true,
        blocked_at: expires_at - Duration::minutes(30),
        expires_at,
    };
    repo.insert_reservation(&reservation).await.unwrap();
    reservation.id
}

pub async fn seed_address(
    db: &Database,
    id: &str,
    customer_id: &str,
    state: Option<&str>,
    country: Option<&str>,
) {
    let mut conn = db.acquire().await.unwrap();
    CustomerRepository::new(&mut conn)
        .insert_address(&Address {
            id: id.to_string(),
            customer_id: customer_id.to_string(),
            street: "Rua das Flores 100".to_string(),
            city: "Campinas".to_string(),
            state: state.map(String::from),
            country: country.map(String::from),
        })
        .await
        .unwrap();
}

pub async fn seed_card(db: &Database, id: &str, customer_id: &str, number: &str) {
    let mut conn = db.acquire().await.unwrap();
    CustomerRepository::new(&mut conn)
        .insert_card(&CreditCard {
            id: id.to_string(),
            customer_id: customer_id.to_string(),
            card_number: number.to_string(),
            holder_name: "HOLDER".to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
}

pub async fn seed_coupon(
    db: &Database,
    id: &str,
    customer_id: &str,
    coupon_type: CouponType,
    value_cents: i64,
) -> Coupon {
    let now = Utc::now();
    let coupon = Coupon {
        id: id.to_string(),
        code: format!("CODE-{}", id),
        coupon_type,
        value_cents,
        customer_id: customer_id.to_string(),
        is_used: false,
        used_at: None,
        expires_at: None,
        created_at: now,
        updated_at: now,
    };
    let mut conn = db.acquire().await.unwrap();
    CouponRepository::new(&mut conn).insert(&coupon).await.unwrap();
    coupon
}

pub async fn load_coupon(db: &Database, id: &str) -> Option<Coupon> {
    let mut conn = db.acquire().await.unwrap();
    CouponRepository::new(&mut conn).get_by_id(id).await.unwrap()
}

pub async fn load_product(db: &Database, id: &str) -> Product {
    let mut conn = db.acquire().await.unwrap();
    ProductRepository::new(&mut conn)
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap()
}

pub async fn customer_ranking(db: &Database, id: &str) -> i64 {
    let mut conn = db.acquire().await.unwrap();
    CustomerRepository::new(&mut conn)
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap()
        .ranking
}

pub async fn set_customer_ranking(db: &Database, id: &str, ranking: i64) {
    let mut conn = db.acquire().await.unwrap();
    assert!(CustomerRepository::new(&mut conn)
        .update_ranking(id, ranking)
        .await
        .unwrap());
}
