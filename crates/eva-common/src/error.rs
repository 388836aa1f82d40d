//! Error types shared by the EVA tools

use thiserror::Error;

/// Result type alias for shared EVA operations
pub type Result<T> = std::result::Result<T, EvaError>;

/// Main error type for shared EVA utilities
#[derive(Error, Debug)]
pub enum EvaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse Maven settings: {0}")]
    Xml(#[from] quick_xml::de::DeError),

    #[error("Profile '{profile}' not found in Maven settings {file}")]
    ProfileNotFound { profile: String, file: String },

    #[error("Property '{key}' missing from Maven profile '{profile}'")]
    MissingProperty { profile: String, key: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl EvaError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}
