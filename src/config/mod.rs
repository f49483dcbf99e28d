//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `SCOOTER_LEASE`
//! prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use scooter_lease::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod leasing;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use leasing::LeasingConfig;
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`]. Once loaded it is immutable and handed
/// to the adapters; nothing downstream reads the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment processor configuration (Stripe)
    pub payment: PaymentConfig,

    /// Catalog prices, redirect URLs and delivery policy
    pub leasing: LeasingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SCOOTER_LEASE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `SCOOTER_LEASE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `SCOOTER_LEASE__LEASING__APP_URL=...` -> `leasing.app_url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SCOOTER_LEASE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration sections
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.leasing.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const MINIMAL_ENV: &[(&str, &str)] = &[
        ("SCOOTER_LEASE__DATABASE__URL", "postgresql://lease@localhost/scooters"),
        ("SCOOTER_LEASE__PAYMENT__STRIPE_API_KEY", "sk_test_xxx"),
        ("SCOOTER_LEASE__PAYMENT__STRIPE_WEBHOOK_SECRET", "whsec_xxx"),
        ("SCOOTER_LEASE__LEASING__APP_URL", "https://lease.example.edu"),
        ("SCOOTER_LEASE__LEASING__BASIC_PRICE_ID", "price_basic"),
        ("SCOOTER_LEASE__LEASING__PREMIUM_PRICE_ID", "price_premium"),
        ("SCOOTER_LEASE__LEASING__INSURANCE_PRICE_ID", "price_insurance"),
        ("SCOOTER_LEASE__LEASING__CABLE_LOCK_PRICE_ID", "price_cable"),
        ("SCOOTER_LEASE__LEASING__ULOCK_PRICE_ID", "price_ulock"),
    ];

    const OPTIONAL_ENV: &[&str] = &[
        "SCOOTER_LEASE__SERVER__PORT",
        "SCOOTER_LEASE__SERVER__ENVIRONMENT",
        "SCOOTER_LEASE__LEASING__MIN_DELIVERY_LEAD_DAYS",
    ];

    fn set_minimal_env() {
        for (key, value) in MINIMAL_ENV {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in MINIMAL_ENV {
            env::remove_var(key);
        }
        for key in OPTIONAL_ENV {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://lease@localhost/scooters");
        assert_eq!(config.leasing.app_url, "https://lease.example.edu");
        assert_eq!(config.leasing.min_delivery_lead_days, 3);
        assert_eq!(config.leasing.security_deposit_cents, 10_000);
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_leasing_section_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::remove_var("SCOOTER_LEASE__LEASING__APP_URL");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_server_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("SCOOTER_LEASE__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_lead_days_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("SCOOTER_LEASE__LEASING__MIN_DELIVERY_LEAD_DAYS", "0");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.leasing.delivery_policy().allows_same_day());
    }
}
