//! Typed paths into the database hierarchy.
//!
//! A [`Path<T>`] is a pure value: an ordered list of validated keys plus a
//! phantom marker for the type stored at that location. It owns no
//! connection and is resolved against a client reference at call time.
//!
//! ```
//! use rtdb_rx::{CollectionPath, Path};
//!
//! struct Message;
//!
//! let room: Path<()> = Path::new(["chatrooms", "general"]).unwrap();
//! let messages: CollectionPath<Message> = room.collection("messages").unwrap();
//! let first: Path<Message> = messages.child("m1").unwrap();
//!
//! assert_eq!(first.to_string(), "chatrooms/general/messages/m1");
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::error::ValidationError;

/// Maximum key length in bytes accepted by realtime database backends.
pub const MAX_KEY_BYTES: usize = 768;

const FORBIDDEN_KEY_CHARS: [char; 6] = ['.', '#', '$', '[', ']', '/'];

/// Validate a single path key.
///
/// # Errors
/// Returns a [`ValidationError`] if the key is empty, too long, or contains
/// a forbidden or control character.
pub fn validate_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::EmptyKey);
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(ValidationError::KeyTooLong {
            max_length: MAX_KEY_BYTES,
        });
    }
    if let Some(found) = key
        .chars()
        .find(|c| FORBIDDEN_KEY_CHARS.contains(c) || c.is_ascii_control())
    {
        return Err(ValidationError::InvalidKey {
            key: key.to_string(),
            found,
        });
    }
    Ok(())
}

fn validated<I, S>(segments: I) -> Result<Vec<String>, ValidationError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    segments
        .into_iter()
        .map(|s| {
            let s = s.into();
            validate_key(&s).map(|()| s)
        })
        .collect()
}

fn write_segments(f: &mut fmt::Formatter<'_>, segments: &[String]) -> fmt::Result {
    if segments.is_empty() {
        return f.write_str("/");
    }
    f.write_str(&segments.join("/"))
}

/// A typed, immutable address of a single value of type `T`.
pub struct Path<T> {
    segments: Vec<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Path<T> {
    /// The root of the database.
    #[must_use]
    pub fn root() -> Self {
        Self::from_validated(Vec::new())
    }

    /// Build a path from individual keys.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for the first invalid key.
    pub fn new<I, S>(segments: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        validated(segments).map(Self::from_validated)
    }

    /// Parse a slash-separated path. Leading, trailing and repeated slashes
    /// are ignored.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for the first invalid key.
    pub fn parse(path: &str) -> Result<Self, ValidationError> {
        Self::new(path.split('/').filter(|s| !s.is_empty()))
    }

    fn from_validated(segments: Vec<String>) -> Self {
        Self {
            segments,
            _marker: PhantomData,
        }
    }

    /// A child location holding a `U`.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if `key` is not a valid key.
    pub fn child<U>(&self, key: impl Into<String>) -> Result<Path<U>, ValidationError> {
        let key = key.into();
        validate_key(&key)?;
        let mut segments = self.segments.clone();
        segments.push(key);
        Ok(Path::from_validated(segments))
    }

    /// A child location holding a collection of `U` values.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if `key` is not a valid key.
    pub fn collection<U>(&self, key: impl Into<String>) -> Result<CollectionPath<U>, ValidationError> {
        self.child::<U>(key).map(|p| CollectionPath { path: p })
    }

    /// The keys making up this path, from the root down.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last key, or `None` at the root.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Whether this path addresses the root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Slash-joined form suitable for `Reference::child`.
    #[must_use]
    pub fn as_child_path(&self) -> String {
        self.segments.join("/")
    }
}

impl<T> Clone for Path<T> {
    fn clone(&self) -> Self {
        Self::from_validated(self.segments.clone())
    }
}

impl<T> PartialEq for Path<T> {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl<T> Eq for Path<T> {}

impl<T> Hash for Path<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl<T> fmt::Debug for Path<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Path").field(&self.segments).finish()
    }
}

impl<T> fmt::Display for Path<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_segments(f, &self.segments)
    }
}

/// A typed address of a set of children, each holding a `T`.
///
/// Collections are observed child by child, never as one composite value,
/// so the only way to read one is through a
/// [`CollectionEventType`](crate::event::CollectionEventType).
pub struct CollectionPath<T> {
    path: Path<T>,
}

impl<T> CollectionPath<T> {
    /// Build a collection path from individual keys.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for the first invalid key.
    pub fn new<I, S>(segments: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Path::new(segments).map(|path| Self { path })
    }

    /// The element at `key` within this collection.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if `key` is not a valid key.
    pub fn child(&self, key: impl Into<String>) -> Result<Path<T>, ValidationError> {
        self.path.child(key)
    }

    /// The keys making up this path, from the root down.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        self.path.segments()
    }

    /// Slash-joined form suitable for `Reference::child`.
    #[must_use]
    pub fn as_child_path(&self) -> String {
        self.path.as_child_path()
    }
}

impl<T> Clone for CollectionPath<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
        }
    }
}

impl<T> PartialEq for CollectionPath<T> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl<T> Eq for CollectionPath<T> {}

impl<T> fmt::Debug for CollectionPath<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CollectionPath").field(&self.path.segments).finish()
    }
}

impl<T> fmt::Display for CollectionPath<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_segments(f, self.path.segments())
    }
}
