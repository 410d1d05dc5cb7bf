use thiserror::Error;

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A field of the input document is missing, mistyped, or out of range.
    #[error("Invalid input at `{field}`: {message}")]
    InvalidInput { field: String, message: String },

    /// A command-line argument is out of its accepted range.
    #[error("Invalid argument `{name}`: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AnalyticsError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for AnalyticsError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
