//! Session settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Dialect and execution settings shared by every operation of a session.
///
/// Missing keys take their defaults when deserialized:
///
/// ```ignore
/// let setting: DbSetting = serde_json::from_str(r#"{ "parameter_prefix": "$" }"#)?;
/// assert_eq!(setting.max_parameters, 2100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbSetting {
    /// Placeholder prefix for named parameters.
    pub parameter_prefix: String,
    /// Opening identifier quote.
    pub opening_quote: String,
    /// Closing identifier quote.
    pub closing_quote: String,
    /// Maximum number of parameters one command may bind.
    pub max_parameters: usize,
    /// Batch size used when an operation does not request one.
    pub default_batch_size: usize,
    /// Whether the driver executes several statements in one command.
    /// When false every batch operation runs row by row.
    pub multi_statement_executable: bool,
    /// Default command timeout in seconds.
    pub command_timeout_secs: Option<u64>,
    /// Default result-cache expiration in seconds.
    pub cache_expiration_secs: u64,
}

impl DbSetting {
    /// Default command timeout.
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Default result-cache expiration.
    pub fn cache_expiration(&self) -> Duration {
        Duration::from_secs(self.cache_expiration_secs)
    }
}

impl Default for DbSetting {
    fn default() -> Self {
        Self {
            parameter_prefix: "@".to_string(),
            opening_quote: "\"".to_string(),
            closing_quote: "\"".to_string(),
            max_parameters: 2100,
            default_batch_size: 10,
            multi_statement_executable: true,
            command_timeout_secs: None,
            cache_expiration_secs: 180 * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let setting = DbSetting::default();
        assert_eq!(setting.parameter_prefix, "@");
        assert_eq!(setting.max_parameters, 2100);
        assert_eq!(setting.command_timeout(), None);
        assert_eq!(setting.cache_expiration(), Duration::from_secs(10800));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let setting: DbSetting = serde_json::from_str(
            r#"{ "parameter_prefix": "$", "max_parameters": 999, "command_timeout_secs": 30 }"#,
        )
        .unwrap();
        assert_eq!(setting.parameter_prefix, "$");
        assert_eq!(setting.max_parameters, 999);
        assert_eq!(setting.command_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(setting.default_batch_size, 10);
        assert!(setting.multi_statement_executable);
    }
}
