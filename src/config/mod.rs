//! Configuration module for fraudscope.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Storage, Server, and Observability.

mod observability_config;
mod server_config;
mod storage_config;

pub use observability_config::ObservabilityEnvConfig;
pub use server_config::ServerEnvConfig;
pub use storage_config::StorageEnvConfig;

use anyhow::{Context, Result};
use std::env;

/// Main application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub storage: StorageEnvConfig,
    pub server: ServerEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            storage: StorageEnvConfig::from_lookup(&lookup),
            server: ServerEnvConfig::from_lookup(&lookup).context("Failed to load server config")?,
            observability: ObservabilityEnvConfig::from_lookup(&lookup),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("MODEL_DIR", "/tmp/models"),
            ("PORT", "9000"),
            ("OBSERVABILITY_ENABLED", "false"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.storage.model_dir.to_str(), Some("/tmp/models"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert!(!config.observability.enabled);
    }

    #[test]
    fn test_bad_upload_limit_fails_with_context() {
        let err = Config::from_lookup(|key| (key == "MAX_UPLOAD_MB").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("MAX_UPLOAD_MB"));
    }
}
