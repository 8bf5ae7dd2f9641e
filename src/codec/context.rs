//! Thread-scoped strategy context.
//!
//! serde gives field helpers no access to the encoder that drives them, so
//! the active encoder/decoder installs its configuration here for the
//! duration of one call. Helpers outside any scope see the defaults.

use std::cell::RefCell;

use crate::error::EncodeError;

use super::strategy::CodecConfig;

thread_local! {
    static ACTIVE: RefCell<Option<CodecConfig>> = const { RefCell::new(None) };
    static ENCODE_FAILURE: RefCell<Option<EncodeError>> = const { RefCell::new(None) };
}

/// Restores the previously active configuration on drop.
pub(crate) struct Scope {
    previous: Option<CodecConfig>,
}

impl Drop for Scope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|active| *active.borrow_mut() = previous);
    }
}

/// Make `config` the active configuration until the returned scope drops.
pub(crate) fn enter(config: &CodecConfig) -> Scope {
    ENCODE_FAILURE.with(|failure| failure.borrow_mut().take());
    let previous = ACTIVE.with(|active| active.borrow_mut().replace(config.clone()));
    Scope { previous }
}

/// Run `f` against the active configuration, or the defaults.
pub(crate) fn with_active<R>(f: impl FnOnce(&CodecConfig) -> R) -> R {
    ACTIVE.with(|active| match active.borrow().as_ref() {
        Some(config) => f(config),
        None => f(&CodecConfig::default()),
    })
}

/// Remember a structured encode failure that serde can only carry as text.
pub(crate) fn record_encode_failure(err: EncodeError) {
    ENCODE_FAILURE.with(|failure| *failure.borrow_mut() = Some(err));
}

pub(crate) fn take_encode_failure() -> Option<EncodeError> {
    ENCODE_FAILURE.with(|failure| failure.borrow_mut().take())
}
