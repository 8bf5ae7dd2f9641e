//! Named codec strategies and their configuration.

use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How `DateTime<Utc>` fields annotated with [`codec::date`](super::date) are stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "format", rename_all = "snake_case")]
pub enum DateStrategy {
    /// RFC 3339 string, UTC with a `Z` suffix.
    #[default]
    Rfc3339,
    /// Floating-point seconds since the Unix epoch.
    #[serde(rename = "seconds_since_1970")]
    SecondsSince1970,
    /// Integer milliseconds since the Unix epoch.
    #[serde(rename = "milliseconds_since_1970")]
    MillisecondsSince1970,
    /// A chrono `strftime`-style format string, interpreted as UTC.
    Formatted(String),
}

/// How binary fields annotated with [`codec::bytes`](super::bytes) are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStrategy {
    /// Standard-alphabet base64 string.
    #[default]
    Base64,
    /// Lowercase hex string.
    Hex,
    /// Array of byte values.
    Raw,
}

/// How object keys are cased in stored data.
///
/// Only identifier-like keys are converted. Opaque keys such as generated
/// child ids pass through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Keys are stored exactly as serde produces them.
    #[default]
    UseDefaultKeys,
    /// Stored keys are camelCase; Rust-side keys are snake_case.
    CamelCase,
    /// Stored keys are snake_case; Rust-side keys are camelCase.
    SnakeCase,
}

/// How non-finite floats annotated with [`codec::float`](super::float) are stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NonConformingFloatStrategy {
    /// Fail encoding and decoding of non-finite values.
    #[default]
    Reject,
    /// Store non-finite values as the given marker strings.
    ConvertToString {
        positive_infinity: String,
        negative_infinity: String,
        nan: String,
    },
}

impl NonConformingFloatStrategy {
    /// The common `"Infinity"`, `"-Infinity"`, `"NaN"` markers.
    #[must_use]
    pub fn javascript_markers() -> Self {
        Self::ConvertToString {
            positive_infinity: "Infinity".to_string(),
            negative_infinity: "-Infinity".to_string(),
            nan: "NaN".to_string(),
        }
    }
}

/// Full set of strategies shared by an encoder/decoder pair.
///
/// Missing fields take their defaults when loaded from JSON.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub date: DateStrategy,
    pub data: DataStrategy,
    pub keys: KeyStrategy,
    pub non_conforming_floats: NonConformingFloatStrategy,
}

impl CodecConfig {
    /// Parse a configuration from JSON text.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] if the text is not a valid configuration.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not a valid configuration.
    pub fn load(path: impl AsRef<FsPath>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
