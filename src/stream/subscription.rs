use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::mpsc::{self, UnboundedReceiver};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::client::{DataSnapshot, Query};
use crate::codec::{DecodeResult, StructureDecoder};
use crate::event::DataEventType;

type Release = Box<dyn FnOnce() + Send>;

/// A cold observable over one location and event kind.
///
/// Nothing is registered until [`subscribe`](Self::subscribe) is called,
/// and every call registers its own listener with the client. Listeners
/// are never shared between subscriptions.
pub struct Observe<T> {
    query: Arc<dyn Query>,
    event: DataEventType,
    decoder: StructureDecoder,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Observe<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(query: Arc<dyn Query>, event: DataEventType, decoder: StructureDecoder) -> Self {
        Self {
            query,
            event,
            decoder,
            _marker: PhantomData,
        }
    }

    /// The event kind this observable listens for.
    #[must_use]
    pub const fn event(&self) -> DataEventType {
        self.event
    }

    /// Register a listener and return the stream of its decoded snapshots.
    ///
    /// Decode failures are delivered as `Err` elements; they never end the
    /// stream. Dropping or cancelling the subscription removes the listener.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded::<DecodeResult<T>>();
        let decoder = self.decoder.clone();
        let location = self.query.location();
        let event = self.event;

        let callback_location = location.clone();
        let handle = self.query.observe(
            event,
            Box::new(move |snapshot: DataSnapshot| {
                let result = snapshot.decode::<T>(&decoder);
                trace!(location = %callback_location, %event, ok = result.is_ok(), "snapshot delivered");
                // The receiver only goes away after the listener is removed.
                let _ = tx.unbounded_send(result);
            }),
        );
        debug!(%location, %event, handle = handle.raw(), "listener registered");

        let query = Arc::clone(&self.query);
        let release: Release = Box::new(move || {
            let raw = handle.raw();
            query.remove_observer(handle);
            debug!(handle = raw, "listener removed");
        });

        Subscription {
            location,
            event,
            rx,
            release: Some(release),
        }
    }
}

impl<T> Clone for Observe<T> {
    fn clone(&self) -> Self {
        Self {
            query: Arc::clone(&self.query),
            event: self.event,
            decoder: self.decoder.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Observe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observe")
            .field("location", &self.query.location())
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

/// One active listener registration, exposed as a stream of decode results.
///
/// The registration is removed exactly once: on [`cancel`](Self::cancel) or
/// on drop, whichever comes first. Removal is synchronous.
pub struct Subscription<T> {
    location: String,
    event: DataEventType,
    rx: UnboundedReceiver<DecodeResult<T>>,
    release: Option<Release>,
}

impl<T> Subscription<T> {
    /// Location of the observed data.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The event kind this subscription listens for.
    #[must_use]
    pub const fn event(&self) -> DataEventType {
        self.event
    }

    /// Whether the listener is still registered with the client.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Remove the listener now.
    pub fn cancel(mut self) {
        self.unregister();
    }

    /// Take the next already-delivered element without waiting.
    pub fn try_next(&mut self) -> Option<DecodeResult<T>> {
        self.rx.try_recv().ok()
    }

    fn unregister(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = DecodeResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_next_unpin(cx)
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("location", &self.location)
            .field("event", &self.event)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unregister();
    }
}
