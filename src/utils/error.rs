use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenizeError {
    #[error("Missing required configuration: {}", .fields.join(", "))]
    ConfigurationMissing { fields: Vec<String> },

    #[error("Invalid field selection: {message}")]
    InvalidFieldSelection { message: String },

    #[error("Wrapped key could not be decoded: {message}")]
    InvalidKeyMaterial { message: String },

    #[error("Record schema mismatch: {message}")]
    SchemaMismatch { message: String },

    #[error("Row count mismatch: {message}")]
    RowCountMismatch { message: String },

    #[error("Remote transformation failed{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    RemoteServiceFailure { status: Option<u16>, message: String },

    #[error("Document store error: {message}")]
    StoreError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },
}

impl From<reqwest::Error> for TokenizeError {
    fn from(err: reqwest::Error) -> Self {
        TokenizeError::RemoteServiceFailure {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Remote,
    Storage,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TokenizeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TokenizeError::ConfigurationMissing { .. }
            | TokenizeError::InvalidKeyMaterial { .. }
            | TokenizeError::ConfigValidationError { .. }
            | TokenizeError::InvalidConfigValueError { .. }
            | TokenizeError::MissingConfigError { .. } => ErrorCategory::Configuration,
            TokenizeError::InvalidFieldSelection { .. }
            | TokenizeError::SchemaMismatch { .. }
            | TokenizeError::CsvError(_)
            | TokenizeError::SerializationError(_) => ErrorCategory::Input,
            TokenizeError::RemoteServiceFailure { .. } => ErrorCategory::Remote,
            TokenizeError::StoreError { .. } | TokenizeError::IoError(_) => ErrorCategory::Storage,
            TokenizeError::RowCountMismatch { .. } => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TokenizeError::RemoteServiceFailure { status, .. } => match status {
                Some(429) | Some(500..=599) | None => ErrorSeverity::Medium,
                Some(_) => ErrorSeverity::High,
            },
            TokenizeError::RowCountMismatch { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// Errors the facade may swallow when running with the pass-through policy.
    pub fn is_recoverable_by_pass_through(&self) -> bool {
        matches!(
            self,
            TokenizeError::ConfigurationMissing { .. }
                | TokenizeError::InvalidFieldSelection { .. }
                | TokenizeError::InvalidKeyMaterial { .. }
        )
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            TokenizeError::ConfigurationMissing { fields } => format!(
                "Set {} in the environment or in the [dlp] section of the config file",
                fields.join(", ")
            ),
            TokenizeError::InvalidFieldSelection { .. } => {
                "Pass at least one field name with --fields or configure default_fields".to_string()
            }
            TokenizeError::InvalidKeyMaterial { .. } => {
                "WRAPPED_KEY must be the base64 encoding of the KMS-wrapped key".to_string()
            }
            TokenizeError::SchemaMismatch { .. } => {
                "Make sure every record in the batch has the same fields in the same order".to_string()
            }
            TokenizeError::RowCountMismatch { .. } => {
                "The service returned a table that does not match the request; retry and report it if it persists".to_string()
            }
            TokenizeError::RemoteServiceFailure { status, .. } => match status {
                Some(401) | Some(403) => {
                    "Check GOOGLE_OAUTH_ACCESS_TOKEN and the IAM permissions on the project and key".to_string()
                }
                Some(400) => "Check the field names, alphabet and template name".to_string(),
                Some(429) => "Quota exceeded, wait before retrying".to_string(),
                _ => "Check network connectivity and DLP_API_ENDPOINT".to_string(),
            },
            TokenizeError::StoreError { .. } | TokenizeError::IoError(_) => {
                "Check DATABASE_URL and that the store directory is writable".to_string()
            }
            TokenizeError::CsvError(_) | TokenizeError::SerializationError(_) => {
                "Input must be a JSON array of string objects or a CSV file with a header row".to_string()
            }
            TokenizeError::ConfigValidationError { .. }
            | TokenizeError::InvalidConfigValueError { .. }
            | TokenizeError::MissingConfigError { .. } => {
                "Fix the configuration file and run again".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Input problem: {}", self),
            ErrorCategory::Remote => format!("DLP service problem: {}", self),
            ErrorCategory::Storage => format!("Storage problem: {}", self),
            ErrorCategory::Internal => format!("Internal error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, TokenizeError>;
