//! Path-typed facade over a database reference.
//!
//! [`DatabaseService`] resolves typed [`Path`]s against a root reference and
//! applies one shared codec configuration to every read and write.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::client::Reference;
use crate::codec::{CodecConfig, StructureDecoder, StructureEncoder};
use crate::error::{RxResult, TransportError};
use crate::event::{CollectionEventType, DataEventType};
use crate::path::{CollectionPath, Path};
use crate::stream::{fetch_once, Observe};

/// Typed reads, streams and writes rooted at one database reference.
///
/// ```
/// use futures::executor::block_on;
/// use rtdb_rx::{DatabaseService, MemoryDatabase, Path};
///
/// let db = MemoryDatabase::new();
/// let service = DatabaseService::new(db.reference());
/// let path: Path<String> = Path::parse("users/ada/name").unwrap();
///
/// service.set_value(&path, &"Ada".to_string()).unwrap();
/// assert_eq!(block_on(service.fetch_once(&path)).unwrap(), "Ada");
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService<R: Reference> {
    root: R,
    encoder: StructureEncoder,
    decoder: StructureDecoder,
}

impl<R: Reference> DatabaseService<R> {
    /// A service with default codec strategies.
    ///
    /// Any reference works; the service always resolves paths from its root.
    #[must_use]
    pub fn new(reference: R) -> Self {
        Self::with_config(reference, CodecConfig::default())
    }

    /// A service whose encoder and decoder share `config`.
    #[must_use]
    pub fn with_config(reference: R, config: CodecConfig) -> Self {
        Self {
            root: reference.root(),
            encoder: StructureEncoder::with_config(config.clone()),
            decoder: StructureDecoder::with_config(config),
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn encoder(&self) -> &StructureEncoder {
        &self.encoder
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn decoder(&self) -> &StructureDecoder {
        &self.decoder
    }

    /// The client reference for `path`.
    #[must_use]
    pub fn reference<T>(&self, path: &Path<T>) -> R {
        self.resolve(&path.as_child_path())
    }

    /// Current value at `path`.
    ///
    /// Absent data fails with [`DecodeError::NoValuePresent`](crate::DecodeError::NoValuePresent).
    pub fn fetch_once<T>(&self, path: &Path<T>) -> BoxFuture<'static, RxResult<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        fetch_once(
            Arc::new(self.reference(path)),
            DataEventType::Value,
            self.decoder.clone(),
        )
    }

    /// Every value of `path`, starting with the current one.
    #[must_use]
    pub fn observe<T>(&self, path: &Path<T>) -> Observe<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        Observe::new(
            Arc::new(self.reference(path)),
            DataEventType::Value,
            self.decoder.clone(),
        )
    }

    /// The next `event` among the children of `path`.
    pub fn fetch_once_in<T>(
        &self,
        event: CollectionEventType,
        path: &CollectionPath<T>,
    ) -> BoxFuture<'static, RxResult<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        fetch_once(
            Arc::new(self.resolve(&path.as_child_path())),
            event.into(),
            self.decoder.clone(),
        )
    }

    /// Every `event` among the children of `path`, one element per child.
    #[must_use]
    pub fn observe_collection<T>(&self, event: CollectionEventType, path: &CollectionPath<T>) -> Observe<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        Observe::new(
            Arc::new(self.resolve(&path.as_child_path())),
            event.into(),
            self.decoder.clone(),
        )
    }

    /// Encode `value` and write it at `path`, replacing what was there.
    ///
    /// # Errors
    ///
    /// Returns an encode error if `value` cannot be represented, or a
    /// transport error if the client rejects the write.
    pub fn set_value<T>(&self, path: &Path<T>, value: &T) -> RxResult<()>
    where
        T: Serialize,
    {
        let encoded = self.encoder.encode(value)?;
        let reference = self.reference(path);
        reference.set_value(encoded)?;
        debug!(location = %reference.location(), "value written");
        Ok(())
    }

    /// Encode `value` and write it under a new auto-generated key of `path`.
    ///
    /// Keys generated by one client sort in creation order.
    ///
    /// # Errors
    ///
    /// Same as [`set_value`](Self::set_value).
    pub fn add_value<T>(&self, path: &CollectionPath<T>, value: &T) -> RxResult<String>
    where
        T: Serialize,
    {
        let encoded = self.encoder.encode(value)?;
        let reference = self.resolve(&path.as_child_path()).child_by_auto_id();
        let key = reference.key().ok_or_else(|| TransportError::WriteFailed {
            message: format!("no key generated under {}", reference.location()),
        })?;
        reference.set_value(encoded)?;
        debug!(location = %reference.location(), "value added");
        Ok(key)
    }

    fn resolve(&self, child_path: &str) -> R {
        if child_path.is_empty() {
            self.root.clone()
        } else {
            self.root.child(child_path)
        }
    }
}
