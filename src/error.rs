//! # Error Types
//!
//! Custom error types for the TNC core using `thiserror`.

use thiserror::Error;

/// Main error type for the TNC core
#[derive(Debug, Error)]
pub enum TncError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Hardware profile errors (bad port table, conflicting pins)
    #[error("Hardware profile error: {0}")]
    Profile(String),

    /// GPIO configuration or actuation errors
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// Sample acquisition errors from the analog front end
    #[error("Sample acquisition error: {0}")]
    Acquisition(String),

    /// Filter design errors
    #[error("Filter error: {0}")]
    Filter(String),

    /// HDLC / KISS framing errors
    #[error("HDLC error: {0}")]
    Hdlc(String),

    /// Transmit queue consumer has gone away
    #[error("Transmit queue for port {0} is closed")]
    QueueClosed(usize),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the TNC core
pub type Result<T> = std::result::Result<T, TncError>;
