//! Callback-to-stream adapter.
//!
//! Bridges the client's callback registrations into `futures` primitives:
//! a one-shot fetch becomes a future resolving exactly once, a continuous
//! listener becomes an [`Observe`] whose every subscription is an
//! independent [`Subscription`] stream.

mod fetch;
mod subscription;

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;

use crate::client::Query;
use crate::codec::StructureDecoder;
use crate::error::RxResult;
use crate::event::DataEventType;

pub use subscription::{Observe, Subscription};

pub(crate) use fetch::fetch_once;

/// Stream and future constructors over any [`Query`].
///
/// ```
/// use futures::executor::block_on;
/// use rtdb_rx::{DataEventType, MemoryDatabase, QueryStreamExt, Reference, StructureDecoder};
///
/// let db = MemoryDatabase::new();
/// let score = db.reference().child("scores/ada");
/// score.set_value(serde_json::json!(42)).unwrap();
///
/// let value: u32 = block_on(score.fetch_once(DataEventType::Value, &StructureDecoder::new())).unwrap();
/// assert_eq!(value, 42);
/// ```
pub trait QueryStreamExt: Query + Clone + Sized + 'static {
    /// Fetch the next `event` once and decode it.
    ///
    /// Decode failures, including "no value present", fail the future.
    fn fetch_once<T>(&self, event: DataEventType, decoder: &StructureDecoder) -> BoxFuture<'static, RxResult<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        fetch_once(Arc::new(self.clone()), event, decoder.clone())
    }

    /// A cold observable of decoded `event` snapshots.
    fn observe_stream<T>(&self, event: DataEventType, decoder: &StructureDecoder) -> Observe<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        Observe::new(Arc::new(self.clone()), event, decoder.clone())
    }
}

impl<Q: Query + Clone + 'static> QueryStreamExt for Q {}
