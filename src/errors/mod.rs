use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration Error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP Error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Config Serialization Error: {0}")]
    TomlError(#[from] toml::ser::Error),
}

/// Failure while normalizing a single accounting line. Never aborts a run:
/// the offending line is skipped and the reason aggregated.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("expected {expected} fields, got {got}")]
    FieldCount { expected: usize, got: usize },

    #[error("unparseable timestamp: {value}")]
    Timestamp { value: String },

    #[error("non-numeric {field}: {value}")]
    Number { field: &'static str, value: String },

    #[error("malformed node range: {token}")]
    NodeRange { token: String },
}

// Result type alias for convenience
pub type SyncResult<T> = Result<T, SyncError>;
