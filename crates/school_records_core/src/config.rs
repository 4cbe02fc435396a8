//! Runtime configuration for the records core.
//!
//! Hosts deserialize [`CoreConfig`] from whatever format they use; every
//! field has a default so an empty document is valid.

use crate::db::DEFAULT_BUSY_TIMEOUT_MS;
use crate::logging::{default_log_level, normalize_level};
use crate::model::notification::MAX_RECIPIENT_CHARS;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. `None` opens an in-memory database.
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`, case-insensitive.
    pub level: String,
    /// Absolute directory for rolling log files. `None` disables file logs.
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// Identifiers of the administrative users notified of new reports.
    pub admin_recipients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel(String),
    RelativeLogDir(String),
    ZeroBusyTimeout,
    BlankRecipient { index: usize },
    RecipientTooLong { index: usize, max_chars: usize },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
            Self::RelativeLogDir(dir) => {
                write!(f, "logging.dir must be an absolute path, got `{dir}`")
            }
            Self::ZeroBusyTimeout => write!(f, "database.busy_timeout_ms must be positive"),
            Self::BlankRecipient { index } => {
                write!(f, "admin_recipients[{index}] must not be blank")
            }
            Self::RecipientTooLong { index, max_chars } => write!(
                f,
                "admin_recipients[{index}] allows at most {max_chars} characters"
            ),
        }
    }
}

impl Error for ConfigError {}

impl CoreConfig {
    /// Checks every field without touching the file system.
    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.logging.level).map_err(ConfigError::InvalidLogLevel)?;
        if let Some(dir) = self.logging.dir.as_deref() {
            if !Path::new(dir.trim()).is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.to_string()));
            }
        }
        if self.database.busy_timeout_ms == 0 {
            return Err(ConfigError::ZeroBusyTimeout);
        }
        if let Some(index) = self
            .admin_recipients
            .iter()
            .position(|recipient| recipient.trim().is_empty())
        {
            return Err(ConfigError::BlankRecipient { index });
        }
        if let Some(index) = self
            .admin_recipients
            .iter()
            .position(|recipient| recipient.trim().chars().count() > MAX_RECIPIENT_CHARS)
        {
            return Err(ConfigError::RecipientTooLong {
                index,
                max_chars: MAX_RECIPIENT_CHARS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};

    #[test]
    fn empty_document_uses_defaults() {
        let config: CoreConfig = serde_json::from_str("{}").expect("empty config parses");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert!(config.database.path.is_none());
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = CoreConfig::default();
        config.logging.level = "loud".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel(_))
        ));

        let mut config = CoreConfig::default();
        config.logging.dir = Some("logs".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RelativeLogDir(_))
        ));

        let mut config = CoreConfig::default();
        config.database.busy_timeout_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroBusyTimeout));

        let mut config = CoreConfig::default();
        config.admin_recipients = vec!["admin".to_string(), "  ".to_string()];
        assert_eq!(
            config.validate(),
            Err(ConfigError::BlankRecipient { index: 1 })
        );

        let mut config = CoreConfig::default();
        config.admin_recipients = vec!["x".repeat(151), "admin".to_string()];
        assert_eq!(
            config.validate(),
            Err(ConfigError::RecipientTooLong {
                index: 0,
                max_chars: 150,
            })
        );
    }

    #[test]
    fn recipient_at_length_limit_is_valid() {
        let mut config = CoreConfig::default();
        config.admin_recipients = vec!["x".repeat(150)];
        config.validate().expect("150 characters are allowed");
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config: CoreConfig = serde_json::from_str(
            r#"{"logging": {"level": "WARN"}, "admin_recipients": ["director"]}"#,
        )
        .expect("partial config parses");
        assert_eq!(config.logging.level, "WARN");
        assert!(config.logging.dir.is_none());
        assert_eq!(config.admin_recipients, vec!["director".to_string()]);
        config.validate().expect("partial config is valid");
    }
}
