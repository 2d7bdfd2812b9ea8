//! HTTP server configuration parsing from environment variables.

use anyhow::{Context, Result};

/// Server environment configuration
#[derive(Debug, Clone)]
pub struct ServerEnvConfig {
    pub bind_address: String,
    pub port: u16,
    /// Request body limit for CSV uploads
    pub max_upload_mb: usize,
}

impl Default for ServerEnvConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_mb: 200,
        }
    }
}

impl ServerEnvConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let port = lookup("PORT")
            .unwrap_or_else(|| defaults.port.to_string())
            .parse::<u16>()
            .context("Failed to parse PORT")?;
        let max_upload_mb = lookup("MAX_UPLOAD_MB")
            .unwrap_or_else(|| defaults.max_upload_mb.to_string())
            .parse::<usize>()
            .context("Failed to parse MAX_UPLOAD_MB")?;

        Ok(Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port,
            max_upload_mb,
        })
    }

    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerEnvConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.socket_address(), "0.0.0.0:8000");
        assert_eq!(config.max_upload_bytes(), 200 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = ServerEnvConfig::from_lookup(|key| (key == "PORT").then(|| "http".to_string()));
        assert!(result.is_err());
    }
}
