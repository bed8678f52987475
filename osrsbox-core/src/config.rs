//! Batch normalization settings.
//!
//! Supports TOML configuration files like:
//! ```toml
//! failure_policy = "partial"
//! pretty = false
//! failure_report = "/tmp/osrsbox-failures.csv"
//! ```

use crate::error::{OsrsboxError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// What the batch does with an entity that has hard-failed fields.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Discard the whole entity.
    #[default]
    Skip,
    /// Keep the record with the failed fields null.
    Partial,
}

impl FailurePolicy {
    /// Whether an entity with `failure_count` hard failures is written out.
    pub fn accepts(self, failure_count: usize) -> bool {
        failure_count == 0 || self == FailurePolicy::Partial
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeConfig {
    pub failure_policy: FailurePolicy,
    pub pretty: bool,
    pub failure_report: Option<PathBuf>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Skip,
            pretty: true,
            failure_report: None,
        }
    }
}

impl NormalizeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OsrsboxError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read normalize config from {:?}: {}", path, e),
            ))
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| OsrsboxError::Config(format!("Failed to parse normalize config TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = NormalizeConfig::from_str("").unwrap();
        assert_eq!(config, NormalizeConfig::default());
        assert!(config.pretty);
    }

    #[test]
    fn test_parses_policy_and_report() {
        let config = NormalizeConfig::from_str(
            "failure_policy = \"partial\"\nfailure_report = \"out/failures.csv\"\n",
        )
        .unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Partial);
        assert_eq!(config.failure_report, Some(PathBuf::from("out/failures.csv")));
    }

    #[test]
    fn test_rejects_unknown_keys_and_policies() {
        assert!(NormalizeConfig::from_str("colour = \"red\"").is_err());
        assert!(NormalizeConfig::from_str("failure_policy = \"panic\"").is_err());
    }

    #[test]
    fn test_policy_acceptance() {
        assert!(FailurePolicy::Skip.accepts(0));
        assert!(!FailurePolicy::Skip.accepts(2));
        assert!(FailurePolicy::Partial.accepts(2));
    }
}
