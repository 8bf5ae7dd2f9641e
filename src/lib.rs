//! # rtdb-rx - Reactive streams over a realtime database client
//!
//! A realtime database client reports data through callbacks: register a
//! listener at a location, get called for every change, remove the listener
//! by handle. This crate turns that model into `futures` primitives and adds
//! typed paths plus a configurable codec on top.
//!
//! ## Core Concepts
//!
//! - **Path**: A typed location; `Path<T>` holds a `T`, `CollectionPath<T>` holds keyed `T`s
//! - **Query / Reference**: The client seam, implemented by real clients and by [`MemoryDatabase`]
//! - **Observe / Subscription**: A cold observable and one live listener registration
//! - **`DecodeResult`**: Per-element decode outcome; failures never end a stream
//! - **Codec**: Date, data, key and float strategies applied on every read and write
//!
//! ## Usage
//!
//! ```rust
//! use futures::executor::block_on;
//! use futures::StreamExt;
//! use rtdb_rx::{DatabaseService, DecodeResultStreamExt, MemoryDatabase, Path};
//!
//! let db = MemoryDatabase::new();
//! let service = DatabaseService::new(db.reference());
//! let counter: Path<u32> = Path::parse("counters/visits").unwrap();
//!
//! // The first element reflects the current state: nothing stored yet.
//! let mut visits = service.observe(&counter).subscribe().if_present().boxed();
//! assert_eq!(block_on(visits.next()), Some(None));
//!
//! service.set_value(&counter, &1).unwrap();
//! assert_eq!(block_on(visits.next()), Some(Some(1)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Client seam and typed locations
pub mod client;
pub mod error;
pub mod event;
pub mod path;

// Encoding and decoding
pub mod codec;

// Reactive layer
pub mod combinators;
pub mod service;
pub mod stream;

// Reference backend
pub mod memory;

// Re-export primary types at crate root for convenience
pub use client::{DataSnapshot, ObserverFn, ObserverHandle, Query, Reference, SingleEventFn};
pub use codec::{
    CodecConfig, DataStrategy, DateStrategy, DecodeResult, KeyStrategy, NonConformingFloatStrategy,
    StructureDecoder, StructureEncoder,
};
pub use combinators::DecodeResultStreamExt;
pub use error::{
    ConfigError, DecodeError, EncodeError, RxError, RxResult, TransportError, ValidationError,
};
pub use event::{CollectionEventType, DataEventType};
pub use memory::{MemoryDatabase, MemoryReference};
pub use path::{CollectionPath, Path};
pub use service::DatabaseService;
pub use stream::{Observe, QueryStreamExt, Subscription};
