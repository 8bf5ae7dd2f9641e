//! Error types for rtdb-rx.
//!
//! All errors are strongly typed using thiserror. The decode taxonomy is a
//! closed enum so "no value present" can be told apart from every other
//! decode failure by pattern matching alone.

use thiserror::Error;

/// Errors produced while turning raw stored data into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Nothing is stored at the location (the raw value is null).
    #[error("No value present")]
    NoValuePresent,

    /// The stored data does not have the shape of the requested type.
    #[error("Type mismatch: {message}")]
    TypeMismatch {
        message: String,
    },

    /// The raw input is not valid structured data.
    #[error("Malformed data: {message}")]
    Malformed {
        message: String,
    },
}

impl DecodeError {
    /// Returns true for the distinguished "no value present" case.
    #[must_use]
    pub const fn is_no_value_present(&self) -> bool {
        matches!(self, Self::NoValuePresent)
    }
}

/// Errors produced while turning a typed value into raw structured data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("Failed to serialize value: {message}")]
    Serialization {
        message: String,
    },

    #[error("Cannot encode non-conforming float {value}")]
    NonConformingFloat {
        value: f64,
    },
}

/// Client-level failures surfaced from the database collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Client is offline")]
    Offline,

    #[error("Listener at '{path}' was dropped by the client")]
    Disconnected {
        path: String,
    },

    #[error("Permission denied at '{path}'")]
    PermissionDenied {
        path: String,
    },

    #[error("Write failed: {message}")]
    WriteFailed {
        message: String,
    },
}

/// Validation errors for path construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Path key cannot be empty")]
    EmptyKey,

    #[error("Path key '{key}' contains forbidden character {found:?}")]
    InvalidKey {
        key: String,
        found: char,
    },

    #[error("Path key exceeds maximum length of {max_length} bytes")]
    KeyTooLong {
        max_length: usize,
    },
}

/// Errors raised while loading codec configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse codec config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read codec config: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error type for rtdb-rx.
#[derive(Debug, Error)]
pub enum RxError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl RxError {
    /// Returns true if this is a decode error.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// Returns true if this is an encode error.
    #[must_use]
    pub const fn is_encode(&self) -> bool {
        matches!(self, Self::Encode(_))
    }

    /// Returns true if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if nothing was stored at the requested location.
    #[must_use]
    pub const fn is_no_value_present(&self) -> bool {
        matches!(self, Self::Decode(DecodeError::NoValuePresent))
    }
}

/// Result type alias for rtdb-rx operations.
pub type RxResult<T> = Result<T, RxError>;
