// ⚙️ Configuration - defaults, optional JSON file, CLI overrides on top

use crate::classification::{DomainClassifier, DomainLists};
use crate::data_quality::DataQualityEngine;
use crate::deduplication::DeduplicationEngine;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Picked up from the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "contact-dedup.json";
pub const DEFAULT_INPUT_DIR: &str = "input";
pub const DEFAULT_OUTPUT_PATH: &str = "output/contacts_master.xlsx";
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory scanned for *.csv exports
    pub input_dir: PathBuf,

    /// Workbook to write
    pub output_path: PathBuf,

    /// Daily-rotated log file directory; None disables file logging
    pub log_dir: Option<PathBuf>,

    pub domains: DomainLists,

    pub match_on_phone: bool,
    pub match_on_name_company: bool,

    /// Contacts below this completeness get a quality warning
    pub low_completeness_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            log_dir: Some(PathBuf::from(DEFAULT_LOG_DIR)),
            domains: DomainLists::default(),
            match_on_phone: true,
            match_on_name_company: true,
            low_completeness_threshold: 0.5,
        }
    }
}

impl Config {
    /// Load config from JSON file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Explicit path must exist; otherwise the default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Config::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Config::from_file(default)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn classifier(&self) -> DomainClassifier {
        DomainClassifier::from_lists(&self.domains)
    }

    pub fn dedup_engine(&self) -> DeduplicationEngine {
        let mut engine = DeduplicationEngine::new();
        engine.match_on_phone = self.match_on_phone;
        engine.match_on_name_company = self.match_on_name_company;
        engine
    }

    pub fn quality_engine(&self) -> DataQualityEngine {
        DataQualityEngine::with_threshold(self.low_completeness_threshold)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.input_dir, PathBuf::from("input"));
        assert_eq!(config.output_path, PathBuf::from("output/contacts_master.xlsx"));
        assert!(config.match_on_phone);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"input_dir": "exports", "match_on_phone": false, "domains": {"personal": ["family.org"]}}"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.input_dir, PathBuf::from("exports"));
        assert_eq!(config.output_path, PathBuf::from(DEFAULT_OUTPUT_PATH));
        assert!(!config.match_on_phone);
        assert!(!config.dedup_engine().match_on_phone);
        assert_eq!(config.domains.personal, vec!["family.org".to_string()]);
        assert!(!config.domains.flagged.is_empty());
    }

    #[test]
    fn test_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_explicit_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
