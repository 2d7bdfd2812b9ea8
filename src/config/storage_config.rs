//! Model store and dataset locations.

use std::path::PathBuf;

/// Storage environment configuration
#[derive(Debug, Clone)]
pub struct StorageEnvConfig {
    /// Root of the model and metrics store
    pub model_dir: PathBuf,
    /// Dataset used when a training request sets `use_local_file`
    pub local_data_path: PathBuf,
}

impl Default for StorageEnvConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            local_data_path: PathBuf::from("data/credit_card_transactions.csv"),
        }
    }
}

impl StorageEnvConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            model_dir: lookup("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            local_data_path: lookup("LOCAL_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_data_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_defaults() {
        let config = StorageEnvConfig::from_lookup(|_| None);
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert_eq!(
            config.local_data_path,
            PathBuf::from("data/credit_card_transactions.csv")
        );
    }

    #[test]
    fn test_storage_config_overrides() {
        let config = StorageEnvConfig::from_lookup(|key| {
            (key == "MODEL_DIR").then(|| "/var/lib/fraudscope".to_string())
        });
        assert_eq!(config.model_dir, PathBuf::from("/var/lib/fraudscope"));
    }
}
