use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::client::{DataSnapshot, Query};
use crate::codec::StructureDecoder;
use crate::error::{RxResult, TransportError};
use crate::event::DataEventType;

/// Build a future that resolves with the next `event` at `query`, decoded.
///
/// The one-shot listener is registered on first poll, not on creation.
/// There is no timeout: if the client never calls back the future stays
/// pending.
pub(crate) fn fetch_once<T>(
    query: Arc<dyn Query>,
    event: DataEventType,
    decoder: StructureDecoder,
) -> BoxFuture<'static, RxResult<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    async move {
        let (tx, rx) = oneshot::channel();
        let location = query.location();
        query.observe_single_event(
            event,
            Box::new(move |snapshot: DataSnapshot| {
                let _ = tx.send(snapshot.decode::<T>(&decoder));
            }),
        );
        debug!(%location, %event, "single event registered");

        match rx.await {
            Ok(result) => Ok(result?),
            Err(oneshot::Canceled) => {
                warn!(%location, %event, "client dropped single event callback");
                Err(TransportError::Disconnected { path: location }.into())
            }
        }
    }
    .boxed()
}
