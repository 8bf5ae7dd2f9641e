//! serde helper for binary fields, driven by [`DataStrategy`].
//!
//! Works on any field that is `AsRef<[u8]>` when serializing and decodes
//! into `Vec<u8>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

use super::context;
use super::strategy::DataStrategy;

#[derive(Deserialize)]
#[serde(untagged)]
enum Stored {
    Text(String),
    Bytes(Vec<u8>),
}

/// Serialize bytes with the active data strategy.
///
/// # Errors
/// Propagates serializer errors only.
pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]> + ?Sized,
    S: Serializer,
{
    let bytes = value.as_ref();
    match context::with_active(|c| c.data) {
        DataStrategy::Base64 => serializer.serialize_str(&STANDARD.encode(bytes)),
        DataStrategy::Hex => serializer.serialize_str(&hex::encode(bytes)),
        DataStrategy::Raw => serializer.collect_seq(bytes),
    }
}

/// Deserialize bytes stored with the active data strategy.
///
/// # Errors
/// Fails if the stored value does not match the active strategy.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let stored = Stored::deserialize(deserializer)?;
    match (context::with_active(|c| c.data), stored) {
        (DataStrategy::Base64, Stored::Text(text)) => STANDARD
            .decode(text.as_bytes())
            .map_err(|e| D::Error::custom(format!("invalid base64 data: {e}"))),
        (DataStrategy::Hex, Stored::Text(text)) => {
            hex::decode(&text).map_err(|e| D::Error::custom(format!("invalid hex data: {e}")))
        }
        (DataStrategy::Raw, Stored::Bytes(bytes)) => Ok(bytes),
        (strategy, _) => Err(D::Error::custom(format!(
            "binary data does not match {strategy:?} strategy"
        ))),
    }
}
