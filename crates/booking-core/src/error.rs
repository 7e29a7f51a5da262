//! Error types for the booking system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for booking operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the booking system
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing input (the client's fault, never retried)
    #[error("Validation error: {0}")]
    Validation(String),

    /// No booking exists with the requested id
    #[error("Booking not found: {0}")]
    NotFound(String),

    /// Booking store-related errors
    #[error("Booking store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Mail relay unreachable under all fallback tiers.
    ///
    /// Fatal for the process's cached transport handle: once resolution
    /// fails, every later send fails with the same error until restart.
    #[error("Transport resolution failed: {0}")]
    TransportResolution(String),

    /// Booking data insufficient to notify, caught before any network I/O
    #[error("Invalid notification input: {0}")]
    InvalidNotificationInput(String),

    /// Relay reachable but the send was rejected
    #[error("Delivery failed ({}): {message}", .code.map(|c| c.to_string()).unwrap_or_else(|| "no status".to_string()))]
    Delivery {
        /// SMTP status code, when the relay supplied one
        code: Option<u16>,
        /// Relay response text
        message: String,
    },

    /// Notification failure surfaced to the lifecycle caller.
    ///
    /// Wraps a transport-resolution, invalid-input, or delivery failure.
    /// The booking itself has already been confirmed when this is returned.
    #[error("Notification failed: {0}")]
    Notification(#[source] Box<Error>),

    /// I/O errors (file store)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a booking store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a transport resolution error
    pub fn transport_resolution(msg: impl Into<String>) -> Self {
        Self::TransportResolution(msg.into())
    }

    /// Create an invalid notification input error
    pub fn invalid_notification_input(msg: impl Into<String>) -> Self {
        Self::InvalidNotificationInput(msg.into())
    }

    /// Create a delivery error
    pub fn delivery(code: Option<u16>, message: impl Into<String>) -> Self {
        Self::Delivery {
            code,
            message: message.into(),
        }
    }

    /// Wrap a dispatcher failure into the umbrella surfaced by confirmation
    pub fn notification(cause: Error) -> Self {
        Self::Notification(Box::new(cause))
    }

    /// Whether this error came out of the notification path.
    ///
    /// Boundary layers map these to a "booking confirmed, notification
    /// failed" response rather than a client error.
    pub fn is_notification_failure(&self) -> bool {
        matches!(self, Self::Notification(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
