//! # Fulfillment Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOREFRONT_RESERVATION_TTL_MINUTES=15                              │
//! │     STOREFRONT_SWEEPER_ENABLED=false                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/storefront/fulfillment.toml (Linux)                      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [reservation]
//! ttl_minutes = 30
//!
//! [sweeper]
//! enabled = true
//! period_secs = 60
//!
//! [payment]
//! min_card_amount_cents = 1000
//! change_coupon_validity_days = 90
//! authorization_timeout_secs = 10
//!
//! [card_operator]
//! enabled = true
//! max_amount_per_card_cents = 500000
//! rejected_card_suffixes = ["0000"]
//!
//! [freight]
//! per_kg_cents = 250
//! handling_cents = 300
//!
//! [database]
//! path = "/var/lib/storefront/storefront.db"
//! max_connections = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use storefront_core::coupon::{DEFAULT_CHANGE_COUPON_VALIDITY_DAYS, MAX_CHANGE_COUPON_VALIDITY_DAYS};
use storefront_core::freight::WeightBasedFreight;
use storefront_core::payment::{AllocationPolicy, DEFAULT_MIN_CARD_AMOUNT_CENTS};
use storefront_core::reservation::MAX_RESERVATION_TTL_MINUTES;
use storefront_core::{Money, DEFAULT_RESERVATION_TTL_MINUTES};

use crate::error::{FulfillmentError, FulfillmentResult};

fn default_true() -> bool {
    true
}

// =============================================================================
// Reservation Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationSettings {
    /// Minutes a hold lasts after its last edit.
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
}

fn default_ttl_minutes() -> i64 {
    DEFAULT_RESERVATION_TTL_MINUTES
}

impl Default for ReservationSettings {
    fn default() -> Self {
        ReservationSettings {
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

// =============================================================================
// Sweeper Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweeperSettings {
    /// When false, ticks still fire but do no work.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between ticks.
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
}

fn default_period_secs() -> u64 {
    60
}

impl Default for SweeperSettings {
    fn default() -> Self {
        SweeperSettings {
            enabled: true,
            period_secs: default_period_secs(),
        }
    }
}

impl SweeperSettings {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

// =============================================================================
// Payment Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettings {
    /// Smallest card portion accepted without a coupon.
    #[serde(default = "default_min_card_amount")]
    pub min_card_amount_cents: i64,

    /// Lifetime of change coupons.
    #[serde(default = "default_change_validity")]
    pub change_coupon_validity_days: i64,

    /// Upper bound on a card authorization call.
    #[serde(default = "default_authorization_timeout")]
    pub authorization_timeout_secs: u64,
}

fn default_min_card_amount() -> i64 {
    DEFAULT_MIN_CARD_AMOUNT_CENTS
}

fn default_change_validity() -> i64 {
    DEFAULT_CHANGE_COUPON_VALIDITY_DAYS
}

fn default_authorization_timeout() -> u64 {
    10
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            min_card_amount_cents: default_min_card_amount(),
            change_coupon_validity_days: default_change_validity(),
            authorization_timeout_secs: default_authorization_timeout(),
        }
    }
}

impl PaymentSettings {
    pub fn allocation_policy(&self) -> AllocationPolicy {
        AllocationPolicy {
            min_card_amount: Money::from_cents(self.min_card_amount_cents),
        }
    }

    pub fn authorization_timeout(&self) -> Duration {
        Duration::from_secs(self.authorization_timeout_secs)
    }
}

// =============================================================================
// Card Operator Settings
// =============================================================================

/// Settings for the simulated card operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardOperatorSettings {
    /// When false, every authorization is approved.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Largest amount one card may be charged.
    #[serde(default = "default_max_per_card")]
    pub max_amount_per_card_cents: i64,

    /// Card numbers ending in any of these are declined.
    #[serde(default = "default_rejected_suffixes")]
    pub rejected_card_suffixes: Vec<String>,
}

fn default_max_per_card() -> i64 {
    500_000
}

fn default_rejected_suffixes() -> Vec<String> {
    vec!["0000".to_string()]
}

impl Default for CardOperatorSettings {
    fn default() -> Self {
        CardOperatorSettings {
            enabled: true,
            max_amount_per_card_cents: default_max_per_card(),
            rejected_card_suffixes: default_rejected_suffixes(),
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "storefront", "fulfillment")
        .map(|dirs| dirs.data_dir().join("storefront.db"))
        .unwrap_or_else(|| PathBuf::from("storefront.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete fulfillment configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentConfig {
    #[serde(default)]
    pub reservation: ReservationSettings,

    #[serde(default)]
    pub sweeper: SweeperSettings,

    #[serde(default)]
    pub payment: PaymentSettings,

    #[serde(default)]
    pub card_operator: CardOperatorSettings,

    #[serde(default)]
    pub freight: WeightBasedFreight,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl FulfillmentConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (fulfillment.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> FulfillmentResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading fulfillment config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document. Missing sections and keys take defaults.
    pub fn from_toml(contents: &str) -> FulfillmentResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load fulfillment config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> FulfillmentResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| FulfillmentError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Fulfillment config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> FulfillmentResult<()> {
        if self.reservation.ttl_minutes <= 0 {
            return Err(FulfillmentError::InvalidConfig(
                "reservation.ttl_minutes must be greater than 0".into(),
            ));
        }

        if self.reservation.ttl_minutes > MAX_RESERVATION_TTL_MINUTES {
            return Err(FulfillmentError::InvalidConfig(format!(
                "reservation.ttl_minutes must be at most {}",
                MAX_RESERVATION_TTL_MINUTES
            )));
        }

        if self.sweeper.period_secs == 0 {
            return Err(FulfillmentError::InvalidConfig(
                "sweeper.period_secs must be greater than 0".into(),
            ));
        }

        if self.payment.min_card_amount_cents < 0 {
            return Err(FulfillmentError::InvalidConfig(
                "payment.min_card_amount_cents must not be negative".into(),
            ));
        }

        if self.payment.change_coupon_validity_days <= 0 {
            return Err(FulfillmentError::InvalidConfig(
                "payment.change_coupon_validity_days must be greater than 0".into(),
            ));
        }

        if self.payment.change_coupon_validity_days > MAX_CHANGE_COUPON_VALIDITY_DAYS {
            return Err(FulfillmentError::InvalidConfig(format!(
                "payment.change_coupon_validity_days must be at most {}",
                MAX_CHANGE_COUPON_VALIDITY_DAYS
            )));
        }

        if self.payment.authorization_timeout_secs == 0 {
            return Err(FulfillmentError::InvalidConfig(
                "payment.authorization_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(FulfillmentError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(ttl) = env_parse::<i64>("STOREFRONT_RESERVATION_TTL_MINUTES") {
            debug!(ttl_minutes = ttl, "Overriding reservation TTL from environment");
            self.reservation.ttl_minutes = ttl;
        }

        if let Some(enabled) = env_parse::<bool>("STOREFRONT_SWEEPER_ENABLED") {
            debug!(enabled, "Overriding sweeper flag from environment");
            self.sweeper.enabled = enabled;
        }

        if let Some(secs) = env_parse::<u64>("STOREFRONT_SWEEPER_PERIOD_SECS") {
            self.sweeper.period_secs = secs;
        }

        if let Some(cents) = env_parse::<i64>("STOREFRONT_MIN_CARD_AMOUNT_CENTS") {
            self.payment.min_card_amount_cents = cents;
        }

        if let Some(secs) = env_parse::<u64>("STOREFRONT_AUTHORIZATION_TIMEOUT_SECS") {
            self.payment.authorization_timeout_secs = secs;
        }

        if let Some(enabled) = env_parse::<bool>("STOREFRONT_CARD_OPERATOR_ENABLED") {
            self.card_operator.enabled = enabled;
        }

        if let Ok(path) = std::env::var("STOREFRONT_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "storefront", "fulfillment")
            .map(|dirs| dirs.config_dir().join("fulfillment.toml"))
    }
}

/// Reads and parses an environment variable, warning on malformed values.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = %key, value = %raw, "Ignoring malformed environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FulfillmentConfig::default();
        assert_eq!(config.reservation.ttl_minutes, 30);
        assert!(config.sweeper.enabled);
        assert_eq!(config.sweeper.period(), Duration::from_secs(60));
        assert_eq!(config.payment.min_card_amount_cents, 1000);
        assert_eq!(config.payment.change_coupon_validity_days, 90);
        assert_eq!(config.card_operator.rejected_card_suffixes, vec!["0000"]);
        assert_eq!(config.freight.per_kg_cents, 250);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FulfillmentConfig::from_toml(
            r#"
            [reservation]
            ttl_minutes = 15

            [sweeper]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.reservation.ttl_minutes, 15);
        assert!(!config.sweeper.enabled);
        assert_eq!(config.sweeper.period_secs, 60);
        assert_eq!(config.payment.authorization_timeout_secs, 10);
    }

    #[test]
    fn test_config_validation() {
        let mut config = FulfillmentConfig::default();

        config.reservation.ttl_minutes = 0;
        assert!(config.validate().is_err());
        config.reservation.ttl_minutes = 30;

        config.sweeper.period_secs = 0;
        assert!(config.validate().is_err());
        config.sweeper.period_secs = 60;

        config.payment.min_card_amount_cents = -1;
        assert!(config.validate().is_err());
        config.payment.min_card_amount_cents = 0;
        assert!(config.validate().is_ok());

        config.payment.change_coupon_validity_days = 0;
        assert!(config.validate().is_err());
        config.payment.change_coupon_validity_days = 90;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_unrepresentable_lifetimes() {
        let mut config = FulfillmentConfig::default();

        config.reservation.ttl_minutes = MAX_RESERVATION_TTL_MINUTES;
        assert!(config.validate().is_ok());
        config.reservation.ttl_minutes = i64::MAX;
        assert!(matches!(
            config.validate(),
            Err(FulfillmentError::InvalidConfig(msg)) if msg.contains("ttl_minutes")
        ));
        config.reservation.ttl_minutes = 30;

        config.payment.change_coupon_validity_days = MAX_CHANGE_COUPON_VALIDITY_DAYS + 1;
        assert!(matches!(
            config.validate(),
            Err(FulfillmentError::InvalidConfig(msg)) if msg.contains("validity_days")
        ));
    }

    #[test]
    fn test_toml_serialization() {
        let config = FulfillmentConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[reservation]"));
        assert!(toml_str.contains("[card_operator]"));

        let parsed = FulfillmentConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("storefront-no-such-config.toml");
        let config = FulfillmentConfig::load(Some(path)).unwrap();
        assert_eq!(config.reservation.ttl_minutes, 30);
    }
}
