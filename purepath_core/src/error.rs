//! Error types for the purepath_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for purepath_core operations
///
/// None of these are fatal: callers turn them into user-visible messages
/// (see [`crate::checkin::CheckInReport`]).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The profile document for the user does not exist
    #[error("User not found")]
    UserNotFound,

    /// A write was rejected or the store could not be reached.
    /// The message is the underlying cause.
    #[error("{0}")]
    Persistence(String),

    /// A conditional write found the profile changed since it was read
    #[error("Profile changed since it was read: {0}")]
    Conflict(String),

    /// Malformed input (email, password, display name, coordinates)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Authentication failed
    #[error("{0}")]
    Auth(String),

    /// An operation needed a session but none is active
    #[error("Not signed in")]
    NotSignedIn,

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Fold infrastructure failures (IO, JSON) into `Persistence`.
    ///
    /// Domain errors pass through unchanged so `UserNotFound` and
    /// `Conflict` keep their meaning at the gateway boundary.
    pub fn into_persistence(self) -> Self {
        match self {
            Error::Io(e) => Error::Persistence(e.to_string()),
            Error::Json(e) => Error::Persistence(e.to_string()),
            Error::Toml(e) => Error::Persistence(e.to_string()),
            other => other,
        }
    }
}
