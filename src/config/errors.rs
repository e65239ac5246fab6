//! Configuration error types
//!
//! Configuration errors are fatal to coordinator construction: a
//! coordinator is never built from a config that failed validation.

use std::fmt;
use std::io;

use crate::observability::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// Configuration file could not be read
    CanopyConfigReadFailed,
    /// Configuration content is malformed or out of range
    CanopyConfigInvalid,
}

impl ConfigErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigErrorCode::CanopyConfigReadFailed => "CANOPY_CONFIG_READ_FAILED",
            ConfigErrorCode::CanopyConfigInvalid => "CANOPY_CONFIG_INVALID",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for ConfigErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl ConfigError {
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: ConfigErrorCode::CanopyConfigReadFailed,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            code: ConfigErrorCode::CanopyConfigInvalid,
            message: message.into(),
            source: None,
        }
    }

    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = ConfigError::invalid("maximum_backoff_ms must be > 0");
        let display = err.to_string();
        assert!(display.contains("CANOPY_CONFIG_INVALID"));
        assert!(display.contains("maximum_backoff_ms"));
    }

    #[test]
    fn test_read_failed_keeps_source() {
        use std::error::Error;
        let err = ConfigError::read_failed(
            "Failed to read config",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.code(), ConfigErrorCode::CanopyConfigReadFailed);
        assert!(err.source().is_some());
    }
}
