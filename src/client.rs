//! Contract for the wrapped database client.
//!
//! These traits describe the callback-style surface the stream adapter
//! consumes. Any realtime database client can be plugged in by
//! implementing them:
//! - [`Query`]: observation of a location
//! - [`Reference`]: a location that can also be navigated and written
//!
//! The in-memory [`MemoryDatabase`](crate::memory::MemoryDatabase) is the
//! reference implementation.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec::{DecodeResult, StructureDecoder};
use crate::error::TransportError;
use crate::event::DataEventType;

/// Raw data delivered to a listener.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSnapshot {
    /// Key of the location the data belongs to; `None` at the root.
    pub key: Option<String>,
    /// Stored data; `Null` when nothing is stored.
    pub value: Value,
}

impl DataSnapshot {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(key: Option<String>, value: Value) -> Self {
        Self { key, value }
    }

    /// Whether anything is stored at the location.
    #[must_use]
    pub fn exists(&self) -> bool {
        !self.value.is_null()
    }

    /// Decode the snapshot's data with `decoder`.
    ///
    /// # Errors
    /// See [`StructureDecoder::decode`].
    pub fn decode<T: DeserializeOwned>(self, decoder: &StructureDecoder) -> DecodeResult<T> {
        decoder.decode(self.value)
    }
}

/// Token identifying one continuous listener registration.
///
/// Handles are neither `Clone` nor `Copy`, and
/// [`Query::remove_observer`] consumes them, so a handle returned by
/// [`Query::observe`] can be released at most once.
#[derive(PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

impl ObserverHandle {
    /// Wrap a client-assigned listener id.
    ///
    /// For [`Query`] implementers minting the handle returned from
    /// [`Query::observe`]. Consumers never need it: a handle built here for a
    /// live listener would release that listener from outside its owner.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// The client-assigned listener id.
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObserverHandle({})", self.0)
    }
}

/// Callback for continuous listeners.
pub type ObserverFn = Box<dyn FnMut(DataSnapshot) + Send>;

/// Callback for one-shot listeners.
pub type SingleEventFn = Box<dyn FnOnce(DataSnapshot) + Send>;

/// A location (or query over a location) that can be observed.
pub trait Query: Send + Sync {
    /// Register a continuous listener. The callback may fire any number of
    /// times until the returned handle is passed to
    /// [`remove_observer`](Self::remove_observer).
    fn observe(&self, event: DataEventType, callback: ObserverFn) -> ObserverHandle;

    /// Register a one-shot listener. The callback fires at most once and the
    /// registration removes itself.
    fn observe_single_event(&self, event: DataEventType, callback: SingleEventFn);

    /// Stop a continuous listener.
    fn remove_observer(&self, handle: ObserverHandle);

    /// Human-readable location, used in logs and errors.
    fn location(&self) -> String;
}

/// A navigable, writable location.
///
/// References are cheap handles: cloning one never clones data.
pub trait Reference: Query + Clone + 'static {
    /// Key of this location; `None` at the root.
    fn key(&self) -> Option<String>;

    /// The root of the database this reference belongs to.
    #[must_use]
    fn root(&self) -> Self;

    /// A descendant location. `path` may contain `/` separators; an empty
    /// path refers to this location.
    #[must_use]
    fn child(&self, path: &str) -> Self;

    /// A new child location under a freshly generated unique key.
    #[must_use]
    fn child_by_auto_id(&self) -> Self;

    /// Overwrite the data at this location. Writing `Null` deletes it.
    ///
    /// # Errors
    /// Returns a [`TransportError`] if the client rejects the write.
    fn set_value(&self, value: Value) -> Result<(), TransportError>;
}
