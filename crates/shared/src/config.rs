//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Accounting engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Accounting engine configuration.
///
/// `bank_methods` enumerates the payment-method strings settled through the
/// Bank account; anything else must be `cash` or `customer_account`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Payment methods settled through the Bank account.
    #[serde(default = "default_bank_methods")]
    pub bank_methods: Vec<String>,
    /// Deadline for point lookups and updates, in seconds.
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,
    /// Deadline for inserts that may pull many foreign labels, in seconds.
    #[serde(default = "default_insert_timeout")]
    pub insert_timeout_secs: u64,
}

fn default_bank_methods() -> Vec<String> {
    vec!["bank_account".to_string(), "bank_card".to_string()]
}

fn default_lookup_timeout() -> u64 {
    5
}

fn default_insert_timeout() -> u64 {
    50
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bank_methods: default_bank_methods(),
            lookup_timeout_secs: default_lookup_timeout(),
            insert_timeout_secs: default_insert_timeout(),
        }
    }
}

impl EngineConfig {
    /// Returns true if the payment method settles through the Bank account.
    #[must_use]
    pub fn is_bank_method(&self, method: &str) -> bool {
        self.bank_methods.iter().any(|m| m == method)
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TILLBOOK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
