use serde::Serialize;
use serde_json::Value;

use crate::error::EncodeError;

use super::context;
use super::keys;
use super::strategy::{CodecConfig, DataStrategy, DateStrategy, KeyStrategy, NonConformingFloatStrategy};

/// Turns typed values into raw structured data.
#[derive(Debug, Clone, Default)]
pub struct StructureEncoder {
    config: CodecConfig,
}

impl StructureEncoder {
    /// An encoder with default strategies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An encoder using the given strategies.
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

    /// The strategies this encoder applies.
    #[must_use]
    pub const fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode `value` into raw structured data.
    ///
    /// # Errors
    /// Returns [`EncodeError::NonConformingFloat`] when a float field rejects a
    /// non-finite value, or [`EncodeError::Serialization`] for any other
    /// serializer failure (for example a map with non-string keys).
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, EncodeError> {
        let encoded = {
            let _scope = context::enter(&self.config);
            serde_json::to_value(value)
        };
        match encoded {
            Ok(raw) => Ok(keys::encode_keys(raw, self.config.keys)),
            Err(e) => Err(context::take_encode_failure().unwrap_or_else(|| {
                EncodeError::Serialization {
                    message: e.to_string(),
                }
            })),
        }
    }
}
