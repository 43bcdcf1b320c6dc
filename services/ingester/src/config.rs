//! Ingester configuration.
//!
//! Loaded from YAML with `${VAR}` and `${VAR:-default}` substitution.
//! Every section is optional; missing values take the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use ingestion::{IngestOptions, QcPolicy};
use storage::CatalogOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngesterConfig {
    pub database: DatabaseConfig,
    pub ingestion: IngestionConfig,
    pub qc: QcPolicy,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/argo.db"),
            max_connections: 5,
            busy_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub max_concurrent_files: usize,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_files: 4,
            read_timeout_secs: 60,
            write_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `json` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl IngesterConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = shellexpand::env(content).context("Environment substitution failed")?;
        Ok(serde_yaml::from_str(&expanded)?)
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            max_connections: self.database.max_connections,
            busy_timeout: Duration::from_secs(self.database.busy_timeout_secs),
        }
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions::default()
            .with_max_concurrent_files(self.ingestion.max_concurrent_files)
            .with_read_timeout(Duration::from_secs(self.ingestion.read_timeout_secs))
            .with_write_timeout(Duration::from_secs(self.ingestion.write_timeout_secs))
            .with_qc_policy(self.qc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = IngesterConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.database.path, PathBuf::from("data/argo.db"));
        assert_eq!(config.ingestion.max_concurrent_files, 4);
        assert!(config.qc.reject_probably_bad);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_partial_sections() {
        let yaml = r#"
ingestion:
  max_concurrent_files: 8
qc:
  reject_probably_bad: false
"#;
        let config = IngesterConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.ingestion.max_concurrent_files, 8);
        assert_eq!(config.ingestion.read_timeout_secs, 60);
        assert!(!config.qc.reject_probably_bad);

        let options = config.ingest_options();
        assert_eq!(options.max_concurrent_files, 8);
        assert!(!options.qc_policy.reject_probably_bad);
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("ARGO_TEST_DB_DIR", "/srv/argo");
        let yaml = "database:\n  path: ${ARGO_TEST_DB_DIR}/catalog.db\n";
        let config = IngesterConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/srv/argo/catalog.db"));
    }

    #[test]
    fn test_env_default() {
        std::env::remove_var("ARGO_TEST_UNSET_LEVEL");
        let yaml = "logging:\n  level: ${ARGO_TEST_UNSET_LEVEL:-debug}\n";
        let config = IngesterConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_variable_is_error() {
        std::env::remove_var("ARGO_TEST_REQUIRED");
        assert!(IngesterConfig::from_yaml_str("database:\n  path: ${ARGO_TEST_REQUIRED}\n").is_err());
    }
}
