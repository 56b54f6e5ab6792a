use std::env::VarError;

/// Process-wide configuration, read once at startup.
///
/// Mirrors the teacher's flat env-var-driven setup (`dotenvy::dotenv().ok()`
/// then `std::env::var`), but assembles the Postgres DSN from its parts when
/// `DATABASE_URL` isn't supplied directly.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub etherscan_token: String,
    /// Read for parity with the original deployment's env contract; unused
    /// by the block-explorer-only client.
    pub web3_provider: Option<String>,
    pub catalog_dir: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => Self::database_url_from_parts()?,
        };

        let etherscan_token = require_env("ETHERSCAN_TOKEN")?;
        let web3_provider = std::env::var("WEB3_PROVIDER").ok();
        let catalog_dir = std::env::var("CATALOG_DIR").unwrap_or_else(|_| "data".to_string());

        Ok(Self {
            database_url,
            etherscan_token,
            web3_provider,
            catalog_dir,
        })
    }

    fn database_url_from_parts() -> Result<String, ConfigError> {
        let user = require_env("POSTGRES_USER")?;
        let password = require_env("POSTGRES_PASSWORD")?;
        let host = require_env("POSTGRES_HOST")?;
        let port = require_env("POSTGRES_PORT")?;
        let db = require_env("POSTGRES_DB")?;

        Ok(format!(
            "postgres://{user}:{password}@{host}:{port}/{db}"
        ))
    }
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) => Ok(value),
        Err(VarError::NotPresent) | Err(VarError::NotUnicode(_)) => {
            Err(ConfigError::Missing(name))
        }
    }
}
