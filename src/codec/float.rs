//! serde helper for `f64` fields that may hold non-finite values.
//!
//! Plain `f64` fields holding infinities or NaN encode as `null`, because
//! structured data has no representation for them. Annotating the field with
//! `#[serde(with = "rtdb_rx::codec::float")]` applies the active
//! [`NonConformingFloatStrategy`] instead.

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

use crate::error::EncodeError;

use super::context;
use super::strategy::NonConformingFloatStrategy;

#[derive(Deserialize)]
#[serde(untagged)]
enum Stored {
    Number(f64),
    Text(String),
}

/// Serialize a float with the active non-conforming float strategy.
///
/// # Errors
/// Fails on non-finite values under [`NonConformingFloatStrategy::Reject`].
#[allow(clippy::trivially_copy_pass_by_ref)]
pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    let value = *value;
    if value.is_finite() {
        return serializer.serialize_f64(value);
    }
    match context::with_active(|c| c.non_conforming_floats.clone()) {
        NonConformingFloatStrategy::Reject => {
            context::record_encode_failure(EncodeError::NonConformingFloat { value });
            Err(S::Error::custom(format!("cannot encode non-conforming float {value}")))
        }
        NonConformingFloatStrategy::ConvertToString {
            positive_infinity,
            negative_infinity,
            nan,
        } => {
            let marker = if value.is_nan() {
                nan
            } else if value.is_sign_positive() {
                positive_infinity
            } else {
                negative_infinity
            };
            serializer.serialize_str(&marker)
        }
    }
}

/// Deserialize a float, accepting the active strategy's string markers.
///
/// # Errors
/// Fails on strings that are not one of the configured markers.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let text = match Stored::deserialize(deserializer)? {
        Stored::Number(n) => return Ok(n),
        Stored::Text(text) => text,
    };
    match context::with_active(|c| c.non_conforming_floats.clone()) {
        NonConformingFloatStrategy::ConvertToString {
            positive_infinity,
            negative_infinity,
            nan,
        } => {
            if text == positive_infinity {
                Ok(f64::INFINITY)
            } else if text == negative_infinity {
                Ok(f64::NEG_INFINITY)
            } else if text == nan {
                Ok(f64::NAN)
            } else {
                Err(D::Error::custom(format!("'{text}' is not a float marker")))
            }
        }
        NonConformingFloatStrategy::Reject => {
            Err(D::Error::custom(format!("expected a number, found string '{text}'")))
        }
    }
}
