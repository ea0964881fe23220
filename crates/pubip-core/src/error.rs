//! Error types for pubip
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for pubip operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (always fatal)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Address resolution errors (spawn failure, undecodable output)
    #[error("Address source error: {0}")]
    AddressSource(String),

    /// Broker connection or publish errors
    #[error("Publish error: {0}")]
    Publish(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an address source error
    pub fn address_source(msg: impl Into<String>) -> Self {
        Self::AddressSource(msg.into())
    }

    /// Create a publish error
    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }
}

/// Failures while loading the INI configuration
///
/// The display strings are user facing; they are printed verbatim to
/// standard error before the process exits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file does not exist or cannot be opened
    #[error("The ini file {path} was not found.")]
    NotFound {
        /// Path as given on the command line
        path: String,
    },

    /// The file exists but is not valid INI
    #[error("The ini file {path} cannot be parsed: {message}")]
    Parse {
        /// Path as given on the command line
        path: String,
        /// Parser message
        message: String,
    },

    /// A required key is absent (or empty) in its section
    #[error("Parameter '{parameter}' is missing in section '{section}'")]
    MissingParameter {
        /// Section name, e.g. `mqtt`
        section: String,
        /// Key name, e.g. `pw`
        parameter: String,
    },

    /// `mqtt.port` is not an integer in the TCP port range
    #[error("The port {value} cannot be parsed as integer.")]
    InvalidPort {
        /// Raw value from the file
        value: String,
    },

    /// Unsupported log level in the environment
    #[error("PUBIP_LOG_LEVEL '{value}' is not valid. Valid levels: trace, debug, info, warn, error")]
    InvalidLogLevel {
        /// Raw value from the environment
        value: String,
    },
}
