//! Error types for loss resolution

use thiserror::Error;

/// Main error type for loss registry operations
#[derive(Error, Debug)]
pub enum Error {
    /// A name that matches neither the registry nor the custom objects
    #[error("Unknown loss identifier: '{0}'")]
    UnknownIdentifier(String),

    /// An identifier that could not be turned into an invocable loss
    #[error("Could not interpret loss identifier: {0}")]
    InvalidIdentifier(String),

    /// A configuration mapping rejected by the class it names
    #[error("Invalid configuration for '{class_name}': {message}")]
    InvalidConfig {
        /// Class the configuration was meant for
        class_name: String,
        /// What was wrong with it
        message: String,
    },

    /// Tensor shapes that a loss cannot combine
    #[error("Shape mismatch: {0}")]
    Shape(String),

    /// Tensor values outside the domain of a loss
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for loss registry operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an unknown identifier error
    pub fn unknown_identifier(name: impl Into<String>) -> Self {
        Self::UnknownIdentifier(name.into())
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(identifier: impl std::fmt::Display) -> Self {
        Self::InvalidIdentifier(identifier.to_string())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            class_name: class_name.into(),
            message: message.into(),
        }
    }

    /// Create a shape error
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error reports a name missing from every namespace
    pub fn is_unknown_identifier(&self) -> bool {
        matches!(self, Self::UnknownIdentifier(_))
    }
}
