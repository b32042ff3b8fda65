use std::fs;
use std::path::{Path, PathBuf};

use alerthist_error::{HistoryError, Result};
use alerthist_store::InsertionPolicy;
use alerthist_types::ByteOrder;
use serde::Deserialize;

/// Default history file name, relative to the working directory.
pub const DEFAULT_HISTORY_FILE: &str = "alert_history";

/// Settings for a [`HistoryService`](crate::HistoryService).
///
/// Every field has a default, so a TOML table only needs the keys it
/// changes:
///
/// ```toml
/// history_file = "/var/log/snort/alert_history"
/// byte_order = "native"
/// insertion = "legacy"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    /// File the history is loaded from and rewritten to.
    pub history_file: PathBuf,
    /// Integer byte order of the file.
    pub byte_order: ByteOrder,
    /// How new occurrences are placed in an existing bucket.
    pub insertion: InsertionPolicy,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            history_file: PathBuf::from(DEFAULT_HISTORY_FILE),
            byte_order: ByteOrder::default(),
            insertion: InsertionPolicy::default(),
        }
    }
}

impl HistoryConfig {
    #[must_use]
    pub fn new(history_file: impl Into<PathBuf>) -> Self {
        Self {
            history_file: history_file.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    #[must_use]
    pub const fn with_insertion(mut self, insertion: InsertionPolicy) -> Self {
        self.insertion = insertion;
        self
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    /// `InvalidConfig` on syntax errors, unknown keys or bad values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| HistoryError::invalid_config(err.to_string()))
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    /// `CannotRead` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| HistoryError::CannotRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HistoryConfig::default();
        assert_eq!(config.history_file, PathBuf::from("alert_history"));
        assert_eq!(config.byte_order, ByteOrder::Little);
        assert_eq!(config.insertion, InsertionPolicy::Chronological);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = HistoryConfig::from_toml_str("").expect("empty document");
        assert_eq!(config, HistoryConfig::default());
    }

    #[test]
    fn test_full_toml() {
        let config = HistoryConfig::from_toml_str(
            r#"
            history_file = "/var/log/snort/alert_history"
            byte_order = "big"
            insertion = "legacy"
            "#,
        )
        .expect("valid document");
        assert_eq!(
            config,
            HistoryConfig::new("/var/log/snort/alert_history")
                .with_byte_order(ByteOrder::Big)
                .with_insertion(InsertionPolicy::Legacy)
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = HistoryConfig::from_toml_str("history_fil = \"x\"").expect_err("typo");
        assert!(matches!(err, HistoryError::InvalidConfig { .. }), "{err}");
    }

    #[test]
    fn test_bad_policy_rejected() {
        let err = HistoryConfig::from_toml_str("insertion = \"sorted\"").expect_err("bad value");
        assert!(matches!(err, HistoryError::InvalidConfig { .. }), "{err}");
    }

    #[test]
    fn test_missing_config_file() {
        let err = HistoryConfig::from_toml_file(Path::new("/nonexistent/alerthist.toml"))
            .expect_err("missing file");
        assert!(matches!(err, HistoryError::CannotRead { .. }), "{err}");
    }
}
