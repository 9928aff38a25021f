use secrecy::Secret;
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;

use crate::services::secret_hasher::HashCost;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Postgres connection string; the in-memory store is used when absent
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,

    // Partner bank registry
    pub bank_service_url: Url,
    pub bank_timeout_ms: u64,

    // Card issuance
    pub card_number_prefix: String,
    pub max_identifier_attempts: u32,

    // CVV hashing (Argon2id)
    pub cvv_hash_memory_kib: u32,
    pub cvv_hash_iterations: u32,
    pub cvv_hash_parallelism: u32,
    pub cvv_pepper: Option<Secret<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Self::from_source(&config)
    }

    fn from_source(config: &config::Config) -> Result<Self, config::ConfigError> {
        let defaults = HashCost::default();

        let bank_service_url: String = config.get("bank_service_url")?;
        let bank_service_url = Url::parse(&bank_service_url).map_err(|e| {
            config::ConfigError::Message(format!("bank_service_url is not a valid URL: {}", e))
        })?;

        Ok(Self {
            database_url: optional(config, "database_url")?,
            database_max_connections: optional(config, "database_max_connections")?.unwrap_or(20),
            host: optional(config, "host")?.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: optional(config, "port")?.unwrap_or(3000),

            bank_service_url,
            bank_timeout_ms: optional(config, "bank_timeout_ms")?.unwrap_or(3000),

            card_number_prefix: optional(config, "card_number_prefix")?
                .unwrap_or_else(|| "5135".to_string()),
            max_identifier_attempts: optional(config, "max_identifier_attempts")?.unwrap_or(5),

            cvv_hash_memory_kib: optional(config, "cvv_hash_memory_kib")?
                .unwrap_or(defaults.memory_kib),
            cvv_hash_iterations: optional(config, "cvv_hash_iterations")?
                .unwrap_or(defaults.iterations),
            cvv_hash_parallelism: optional(config, "cvv_hash_parallelism")?
                .unwrap_or(defaults.parallelism),
            cvv_pepper: optional::<String>(config, "cvv_pepper")?.map(Secret::new),
        })
    }

    pub fn hash_cost(&self) -> HashCost {
        HashCost {
            memory_kib: self.cvv_hash_memory_kib,
            iterations: self.cvv_hash_iterations,
            parallelism: self.cvv_hash_parallelism,
        }
    }

    pub fn bank_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.bank_timeout_ms)
    }
}

/// Reads a key that may be absent. A present value that does not parse is
/// an error, never a silent fallback.
fn optional<T: DeserializeOwned>(
    config: &config::Config,
    key: &str,
) -> Result<Option<T>, config::ConfigError> {
    match config.get::<T>(key) {
        Ok(value) => Ok(Some(value)),
        Err(config::ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
