//! Structured codec between typed values and raw database data.
//!
//! Raw data is a `serde_json::Value` tree, the shape a realtime database
//! delivers in snapshots. Encoding and decoding go through serde, with a
//! [`CodecConfig`] selecting named strategies for dates, binary data, key
//! casing and non-finite floats. Key casing applies to every object key;
//! the other strategies apply to fields opted in through the
//! [`date`], [`bytes`] and [`float`] helper modules.

/// serde helper for binary fields.
pub mod bytes;
/// serde helper for timestamp fields.
pub mod date;
/// serde helper for non-finite float fields.
pub mod float;
/// Key casing conversion.
pub mod keys;

mod context;
mod decoder;
mod encoder;
mod strategy;

pub use decoder::{DecodeResult, StructureDecoder};
pub use encoder::StructureEncoder;
pub use strategy::{CodecConfig, DataStrategy, DateStrategy, KeyStrategy, NonConformingFloatStrategy};
