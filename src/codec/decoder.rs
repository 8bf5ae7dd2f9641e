use serde::de::DeserializeOwned;
use serde_json::error::Category;
use serde_json::Value;

use crate::error::DecodeError;

use super::context;
use super::keys;
use super::strategy::{CodecConfig, DataStrategy, DateStrategy, KeyStrategy, NonConformingFloatStrategy};

/// Outcome of decoding raw structured data into a `T`.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Turns raw structured data into typed values.
#[derive(Debug, Clone, Default)]
pub struct StructureDecoder {
    config: CodecConfig,
}

impl StructureDecoder {
    /// A decoder with default strategies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A decoder using the given strategies.
    #[must_use]
    pub const fn with_config(config: CodecConfig) -> Self {
        Self { config }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn date_strategy(mut self, strategy: DateStrategy) -> Self {
        self.config.date = strategy;
        self
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn data_strategy(mut self, strategy: DataStrategy) -> Self {
        self.config.data = strategy;
        self
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.config.keys = strategy;
        self
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn non_conforming_float_strategy(mut self, strategy: NonConformingFloatStrategy) -> Self {
        self.config.non_conforming_floats = strategy;
        self
    }

    /// The strategies this decoder applies.
    #[must_use]
    pub const fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Decode raw structured data into a `T`.
    ///
    /// A `null` input means nothing is stored at the location and yields
    /// [`DecodeError::NoValuePresent`], whatever `T` is.
    ///
    /// # Errors
    /// Returns [`DecodeError::NoValuePresent`] for `null`, and
    /// [`DecodeError::TypeMismatch`] when the data does not fit `T`.
    pub fn decode<T: DeserializeOwned>(&self, value: Value) -> DecodeResult<T> {
        if value.is_null() {
            return Err(DecodeError::NoValuePresent);
        }
        let value = keys::decode_keys(value, self.config.keys);
        let _scope = context::enter(&self.config);
        serde_json::from_value(value).map_err(classify)
    }

    /// Decode JSON text into a `T`.
    ///
    /// # Errors
    /// Returns [`DecodeError::Malformed`] if `text` is not valid JSON, and
    /// otherwise behaves like [`decode`](Self::decode).
    pub fn decode_str<T: DeserializeOwned>(&self, text: &str) -> DecodeResult<T> {
        let value: Value = serde_json::from_str(text).map_err(classify)?;
        self.decode(value)
    }
}

fn classify(err: serde_json::Error) -> DecodeError {
    match err.classify() {
        Category::Data => DecodeError::TypeMismatch {
            message: err.to_string(),
        },
        Category::Syntax | Category::Eof | Category::Io => DecodeError::Malformed {
            message: err.to_string(),
        },
    }
}
