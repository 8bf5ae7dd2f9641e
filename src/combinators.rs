//! Combinators over streams of decode results.
//!
//! A continuous subscription delivers decode failures as values so one bad
//! snapshot does not end it. These combinators decide, per element, what a
//! failure means to the consumer:
//!
//! | element                       | `if_present` | `successes` |
//! |-------------------------------|--------------|-------------|
//! | `Ok(v)`                       | `Some(v)`    | `v`         |
//! | `Err(NoValuePresent)`         | `None`       | dropped     |
//! | any other `Err`               | dropped      | dropped     |

use futures::future;
use futures::{Stream, StreamExt};

use crate::codec::DecodeResult;
use crate::error::DecodeError;

fn presence<T>(result: DecodeResult<T>) -> Option<Option<T>> {
    match result {
        Ok(value) => Some(Some(value)),
        Err(DecodeError::NoValuePresent) => Some(None),
        Err(_) => None,
    }
}

/// Filtering adapters for any stream of [`DecodeResult`]s.
pub trait DecodeResultStreamExt<T>: Stream<Item = DecodeResult<T>> + Sized {
    /// Treat "no value present" as `None` and drop every other failure.
    fn if_present(self) -> impl Stream<Item = Option<T>> {
        self.filter_map(|result| future::ready(presence(result)))
    }

    /// Like [`if_present`](Self::if_present), but first hands every failure
    /// other than "no value present" to `handler`.
    fn if_present_handling_errors<H>(self, mut handler: H) -> impl Stream<Item = Option<T>>
    where
        H: FnMut(&DecodeError),
    {
        self.inspect(move |result| match result {
            Err(DecodeError::NoValuePresent) | Ok(_) => {}
            Err(err) => handler(err),
        })
        .if_present()
    }

    /// Keep only successful elements.
    fn successes(self) -> impl Stream<Item = T> {
        self.filter_map(|result| future::ready(result.ok()))
    }

    /// Like [`successes`](Self::successes), but first hands every failure,
    /// including "no value present", to `handler`.
    fn successes_handling_errors<H>(self, mut handler: H) -> impl Stream<Item = T>
    where
        H: FnMut(&DecodeError),
    {
        self.inspect(move |result| {
            if let Err(err) = result {
                handler(err);
            }
        })
        .successes()
    }
}

impl<T, S> DecodeResultStreamExt<T> for S where S: Stream<Item = DecodeResult<T>> {}
