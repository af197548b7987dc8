use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub docs_root: Option<PathBuf>,
    pub invoice_from: String,
    pub invoice_email: String,
    pub cors_origin: Option<String>,
}

impl Config {
    /// Reads `PRODHUB_*` variables. A `.env` in the working directory is honored
    /// but never overrides variables already present in the environment.
    pub fn try_load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }

        Ok(Self {
            bind: try_load("PRODHUB_BIND", "127.0.0.1:5053")?,
            db_path: try_load("PRODHUB_DB", "data/mission-control.db")?,
            docs_root: optional("PRODHUB_DOCS_ROOT").map(PathBuf::from),
            invoice_from: try_load("PRODHUB_INVOICE_FROM", "Production Hub")?,
            invoice_email: optional("PRODHUB_INVOICE_EMAIL").unwrap_or_default(),
            cors_origin: optional("PRODHUB_CORS_ORIGIN"),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = optional(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }
    })
}
