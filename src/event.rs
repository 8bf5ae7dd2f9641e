//! Event kinds a listener can be registered for.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What kind of change triggers a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataEventType {
    /// The whole value at the location.
    Value,
    /// A child was added under the location.
    ChildAdded,
    /// A direct child changed.
    ChildChanged,
    /// A child was removed.
    ChildRemoved,
}

impl DataEventType {
    /// All event kinds.
    pub const ALL: [Self; 4] = [
        Self::Value,
        Self::ChildAdded,
        Self::ChildChanged,
        Self::ChildRemoved,
    ];

    /// Returns true for the child-mutation kinds.
    #[must_use]
    pub const fn is_child_event(self) -> bool {
        !matches!(self, Self::Value)
    }
}

impl fmt::Display for DataEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Value => "value",
            Self::ChildAdded => "child_added",
            Self::ChildChanged => "child_changed",
            Self::ChildRemoved => "child_removed",
        };
        f.write_str(s)
    }
}

/// Event kinds allowed on a collection.
///
/// Collections are observed element-wise, so there is no `Value` case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionEventType {
    #[allow(missing_docs)]
    ChildAdded,
    #[allow(missing_docs)]
    ChildChanged,
    #[allow(missing_docs)]
    ChildRemoved,
}

impl CollectionEventType {
    /// All collection event kinds.
    pub const ALL: [Self; 3] = [Self::ChildAdded, Self::ChildChanged, Self::ChildRemoved];

    /// The client-level event kind for this collection event.
    #[must_use]
    pub const fn data_event_type(self) -> DataEventType {
        match self {
            Self::ChildAdded => DataEventType::ChildAdded,
            Self::ChildChanged => DataEventType::ChildChanged,
            Self::ChildRemoved => DataEventType::ChildRemoved,
        }
    }
}

impl From<CollectionEventType> for DataEventType {
    fn from(value: CollectionEventType) -> Self {
        value.data_event_type()
    }
}
