use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("No API keys found in {path}")]
    EmptyKeyPool { path: String },

    #[error("All API keys exhausted after {attempts} attempts: {last_error}")]
    KeyPoolExhausted { attempts: usize, last_error: String },

    #[error("Remote service rejected the request: {message}")]
    RemoteRejected { message: String },

    #[error("Persistence error: {message}")]
    PersistenceError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    Credentials,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ScoutError {
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::RemoteRejected { .. } => ErrorCategory::Network,
            Self::CsvError(_) | Self::SerializationError(_) | Self::ProcessingError { .. } => {
                ErrorCategory::Data
            }
            Self::ConfigValidationError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::EmptyKeyPool { .. } | Self::KeyPoolExhausted { .. } => {
                ErrorCategory::Credentials
            }
            Self::IoError(_) | Self::DatabaseError(_) | Self::PersistenceError { .. } => {
                ErrorCategory::Storage
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ProcessingError { .. } => ErrorSeverity::Low,
            Self::ApiError(_) | Self::RemoteRejected { .. } | Self::KeyPoolExhausted { .. } => {
                ErrorSeverity::Medium
            }
            Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::DatabaseError(_)
            | Self::PersistenceError { .. } => ErrorSeverity::High,
            Self::IoError(_)
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::EmptyKeyPool { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and the API base URL, then retry",
            ErrorCategory::Data => "Inspect the input CSV for malformed rows or unexpected headers",
            ErrorCategory::Configuration => "Review jobscout.toml and the command line flags",
            ErrorCategory::Credentials => {
                "Add fresh API keys to the key file or wait for the quota window to reset"
            }
            ErrorCategory::Storage => "Check that the output and store directories are writable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::EmptyKeyPool { path } => {
                format!("The key file '{}' has no usable API keys", path)
            }
            Self::KeyPoolExhausted { attempts, .. } => {
                format!("Every API key was rejected ({} attempts)", attempts)
            }
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_are_medium_severity() {
        let err = ScoutError::KeyPoolExhausted {
            attempts: 3,
            last_error: "quota exceeded".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Credentials);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("3 attempts"));
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = ScoutError::ConfigValidationError {
            field: "api.key_file".into(),
            message: "path cannot be empty".into(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
