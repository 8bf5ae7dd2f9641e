//! In-memory database client.
//!
//! This module provides a thread-safe in-memory implementation of the client
//! traits with realtime database event semantics. It is intended for embedded
//! usage, tests, and as a reference implementation of the client contract.
//!
//! Events are delivered synchronously through a single dispatch queue:
//! - the state lock is never held while a callback runs, so callbacks may
//!   register, remove listeners, or write
//! - events raised from inside a callback are queued and delivered after it
//!   returns, in order
//! - a listener removed before its queued event is delivered never sees it

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::client::{DataSnapshot, ObserverFn, ObserverHandle, Query, Reference, SingleEventFn};
use crate::error::TransportError;
use crate::event::DataEventType;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_path(path: &[String]) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.join("/")
    }
}

/// Generator for 20-character keys that sort in creation order.
///
/// The first 8 characters encode the creation time in milliseconds; the
/// remaining 12 are random, and are incremented instead of regenerated when
/// two keys share a millisecond.
#[derive(Debug, Default)]
struct PushIdGenerator {
    last_time: i64,
    last_random: [u8; 12],
}

impl PushIdGenerator {
    fn generate(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        if now == self.last_time {
            for slot in self.last_random.iter_mut().rev() {
                if *slot < 63 {
                    *slot += 1;
                    break;
                }
                *slot = 0;
            }
        } else {
            let bytes = Uuid::new_v4().into_bytes();
            for (slot, b) in self.last_random.iter_mut().zip(bytes.iter()) {
                *slot = b % 64;
            }
        }
        self.last_time = now;

        let mut id = [0u8; 20];
        let mut t = now;
        for c in id[..8].iter_mut().rev() {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let idx = (t % 64) as usize;
            *c = PUSH_CHARS[idx];
            t /= 64;
        }
        for (c, &r) in id[8..].iter_mut().zip(self.last_random.iter()) {
            *c = PUSH_CHARS[usize::from(r)];
        }
        id.iter().map(|&b| char::from(b)).collect()
    }
}

fn get_at<'a>(node: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = node;
    for key in path {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn value_at(node: &Value, path: &[String]) -> Value {
    get_at(node, path).cloned().unwrap_or(Value::Null)
}

fn children(node: &Value) -> BTreeMap<String, Value> {
    match node {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Drop nulls and prune containers left empty.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let out: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if out.is_empty() {
                Value::Null
            } else {
                Value::Object(out)
            }
        }
        Value::Array(items) if items.is_empty() => Value::Null,
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}

fn write_at(node: &mut Value, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        // Arrays are stored as index-keyed objects once written into.
        let converted: Map<String, Value> = children(node).into_iter().collect();
        *node = Value::Object(converted);
    }
    if let Value::Object(map) = node {
        let child = map.entry(first.clone()).or_insert(Value::Null);
        write_at(child, rest, value);
    }
}

enum Callback {
    Continuous(Arc<Mutex<ObserverFn>>),
    Once(SingleEventFn),
}

struct Listener {
    path: Vec<String>,
    event: DataEventType,
    callback: Callback,
}

struct Pending {
    listener: u64,
    snapshot: DataSnapshot,
}

#[derive(Default)]
struct State {
    root: Value,
    listeners: BTreeMap<u64, Listener>,
    next_id: u64,
    registrations: u64,
    removed: Vec<u64>,
    queue: VecDeque<Pending>,
    dispatching: bool,
    offline: bool,
    protected: Vec<Vec<String>>,
    push_ids: PushIdGenerator,
}

impl State {
    fn initial_events(&self, id: u64, listener: &Listener) -> Vec<Pending> {
        let current = value_at(&self.root, &listener.path);
        match listener.event {
            DataEventType::Value => vec![Pending {
                listener: id,
                snapshot: DataSnapshot::new(listener.path.last().cloned(), current),
            }],
            DataEventType::ChildAdded => children(&current)
                .into_iter()
                .map(|(k, v)| Pending {
                    listener: id,
                    snapshot: DataSnapshot::new(Some(k), v),
                })
                .collect(),
            DataEventType::ChildChanged | DataEventType::ChildRemoved => Vec::new(),
        }
    }

    fn change_events(&self, old_root: &Value) -> Vec<Pending> {
        let mut out = Vec::new();
        for (&id, listener) in &self.listeners {
            let old = value_at(old_root, &listener.path);
            let new = value_at(&self.root, &listener.path);
            if old == new {
                continue;
            }
            let pending = |snapshot| Pending { listener: id, snapshot };
            match listener.event {
                DataEventType::Value => {
                    out.push(pending(DataSnapshot::new(listener.path.last().cloned(), new)));
                }
                DataEventType::ChildAdded => {
                    let before = children(&old);
                    out.extend(
                        children(&new)
                            .into_iter()
                            .filter(|(k, _)| !before.contains_key(k))
                            .map(|(k, v)| pending(DataSnapshot::new(Some(k), v))),
                    );
                }
                DataEventType::ChildChanged => {
                    let before = children(&old);
                    out.extend(
                        children(&new)
                            .into_iter()
                            .filter(|(k, v)| before.get(k).is_some_and(|prev| prev != v))
                            .map(|(k, v)| pending(DataSnapshot::new(Some(k), v))),
                    );
                }
                DataEventType::ChildRemoved => {
                    let after = children(&new);
                    out.extend(
                        children(&old)
                            .into_iter()
                            .filter(|(k, _)| !after.contains_key(k))
                            .map(|(k, v)| pending(DataSnapshot::new(Some(k), v))),
                    );
                }
            }
        }
        out
    }
}

enum Delivery {
    Continuous(Arc<Mutex<ObserverFn>>, DataSnapshot),
    Once(SingleEventFn, DataSnapshot),
}

struct Shared {
    state: Mutex<State>,
}

/// Resets the dispatch flag if a callback panics mid-delivery.
struct DispatchGuard<'a>(&'a Shared);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut state = self.0.state.lock();
            state.dispatching = false;
            state.queue.clear();
        }
    }
}

impl Shared {
    fn register(&self, path: &[String], event: DataEventType, callback: Callback) -> u64 {
        let mut state = self.state.lock();
        state.next_id += 1;
        state.registrations += 1;
        let id = state.next_id;
        let listener = Listener {
            path: path.to_vec(),
            event,
            callback,
        };
        let initial = state.initial_events(id, &listener);
        state.listeners.insert(id, listener);
        self.enqueue(state, initial);
        id
    }

    fn remove(&self, id: u64) {
        // Dropped after unlocking: callbacks may own subscriptions whose drop
        // re-enters the lock.
        let removed = {
            let mut state = self.state.lock();
            let removed = state.listeners.remove(&id);
            if removed.is_some() {
                state.removed.push(id);
            }
            removed
        };
        if removed.is_none() {
            debug!(id, "remove for unknown listener ignored");
        }
    }

    fn write(&self, path: &[String], value: Value) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.offline {
            return Err(TransportError::Offline);
        }
        if let Some(prefix) = state.protected.iter().find(|p| path.starts_with(p)) {
            return Err(TransportError::PermissionDenied {
                path: join_path(prefix),
            });
        }

        let old_root = state.root.clone();
        write_at(&mut state.root, path, normalize(value));
        let root = std::mem::take(&mut state.root);
        state.root = normalize(root);

        let events = state.change_events(&old_root);
        debug!(path = %join_path(path), events = events.len(), "value written");
        self.enqueue(state, events);
        Ok(())
    }

    fn enqueue(&self, mut state: parking_lot::MutexGuard<'_, State>, events: Vec<Pending>) {
        state.queue.extend(events);
        if state.dispatching || state.queue.is_empty() {
            return;
        }
        state.dispatching = true;
        drop(state);
        self.drain();
    }

    fn drain(&self) {
        let _guard = DispatchGuard(self);
        loop {
            let delivery = {
                let mut state = self.state.lock();
                let Some(Pending { listener, snapshot }) = state.queue.pop_front() else {
                    state.dispatching = false;
                    return;
                };
                let continuous = match state.listeners.get(&listener) {
                    None => continue,
                    Some(Listener {
                        callback: Callback::Continuous(cb),
                        ..
                    }) => Some(Arc::clone(cb)),
                    Some(_) => None,
                };
                match continuous {
                    Some(cb) => Delivery::Continuous(cb, snapshot),
                    None => match state.listeners.remove(&listener) {
                        Some(Listener {
                            callback: Callback::Once(cb),
                            ..
                        }) => Delivery::Once(cb, snapshot),
                        _ => continue,
                    },
                }
            };
            match delivery {
                Delivery::Continuous(cb, snapshot) => {
                    let mut callback = cb.lock();
                    (*callback)(snapshot);
                }
                Delivery::Once(cb, snapshot) => cb(snapshot),
            }
        }
    }
}

/// An in-memory realtime database.
///
/// Cloning yields another handle to the same data.
#[derive(Clone)]
pub struct MemoryDatabase {
    shared: Arc<Shared>,
}

impl MemoryDatabase {
    /// An empty database.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// A reference to the root.
    #[must_use]
    pub fn reference(&self) -> MemoryReference {
        MemoryReference {
            shared: Arc::clone(&self.shared),
            path: Vec::new(),
        }
    }

    /// A reference to a slash-separated path.
    #[must_use]
    pub fn reference_at(&self, path: &str) -> MemoryReference {
        MemoryReference {
            shared: Arc::clone(&self.shared),
            path: split_path(path),
        }
    }

    /// Current data at a slash-separated path; `Null` if nothing is stored.
    #[must_use]
    pub fn value_at(&self, path: &str) -> Value {
        value_at(&self.shared.state.lock().root, &split_path(path))
    }

    /// While offline every write fails with [`TransportError::Offline`].
    pub fn set_offline(&self, offline: bool) {
        self.shared.state.lock().offline = offline;
    }

    #[must_use]
    #[allow(missing_docs)]
    pub fn is_offline(&self) -> bool {
        self.shared.state.lock().offline
    }

    /// Reject writes at or below `path` with [`TransportError::PermissionDenied`].
    pub fn protect(&self, path: &str) {
        self.shared.state.lock().protected.push(split_path(path));
    }

    /// Number of listeners currently registered, one-shot ones included.
    #[must_use]
    pub fn active_observers(&self) -> usize {
        self.shared.state.lock().listeners.len()
    }

    /// Total listener registrations since creation.
    #[must_use]
    pub fn registrations(&self) -> u64 {
        self.shared.state.lock().registrations
    }

    /// Raw ids of removed continuous listeners, in removal order.
    #[must_use]
    pub fn removed_observers(&self) -> Vec<u64> {
        self.shared.state.lock().removed.clone()
    }

    /// Drop every listener without calling it, as a client does on shutdown.
    ///
    /// Pending one-shot fetches fail with [`TransportError::Disconnected`];
    /// continuous streams end.
    pub fn shutdown_listeners(&self) {
        let dropped = {
            let mut state = self.shared.state.lock();
            state.queue.clear();
            std::mem::take(&mut state.listeners)
        };
        debug!(count = dropped.len(), "listeners dropped");
        drop(dropped);
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDatabase")
            .field("active_observers", &self.active_observers())
            .finish_non_exhaustive()
    }
}

/// A location in a [`MemoryDatabase`].
#[derive(Clone)]
pub struct MemoryReference {
    shared: Arc<Shared>,
    path: Vec<String>,
}

impl std::fmt::Debug for MemoryReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MemoryReference").field(&join_path(&self.path)).finish()
    }
}

impl Query for MemoryReference {
    fn observe(&self, event: DataEventType, callback: ObserverFn) -> ObserverHandle {
        let callback = Callback::Continuous(Arc::new(Mutex::new(callback)));
        ObserverHandle::from_raw(self.shared.register(&self.path, event, callback))
    }

    fn observe_single_event(&self, event: DataEventType, callback: SingleEventFn) {
        self.shared.register(&self.path, event, Callback::Once(callback));
    }

    fn remove_observer(&self, handle: ObserverHandle) {
        self.shared.remove(handle.raw());
    }

    fn location(&self) -> String {
        join_path(&self.path)
    }
}

impl Reference for MemoryReference {
    fn key(&self) -> Option<String> {
        self.path.last().cloned()
    }

    fn root(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            path: Vec::new(),
        }
    }

    fn child(&self, path: &str) -> Self {
        let mut full = self.path.clone();
        full.extend(split_path(path));
        Self {
            shared: Arc::clone(&self.shared),
            path: full,
        }
    }

    fn child_by_auto_id(&self) -> Self {
        let key = self.shared.state.lock().push_ids.generate();
        let mut full = self.path.clone();
        full.push(key);
        Self {
            shared: Arc::clone(&self.shared),
            path: full,
        }
    }

    fn set_value(&self, value: Value) -> Result<(), TransportError> {
        self.shared.write(&self.path, value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use serde_json::json;

    use super::*;

    fn recorder() -> (Arc<StdMutex<Vec<DataSnapshot>>>, ObserverFn) {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        (log, Box::new(move |snap| sink.lock().unwrap().push(snap)))
    }

    #[test]
    fn test_set_and_read_nested() {
        let db = MemoryDatabase::new();
        db.reference_at("users/ada").set_value(json!({"age": 36})).unwrap();
        assert_eq!(db.value_at("users/ada/age"), json!(36));
        assert_eq!(db.value_at("users"), json!({"ada": {"age": 36}}));
    }

    #[test]
    fn test_null_deletes_and_prunes() {
        let db = MemoryDatabase::new();
        db.reference_at("a/b/c").set_value(json!(1)).unwrap();
        db.reference_at("a/b/c").set_value(Value::Null).unwrap();
        assert_eq!(db.value_at("a"), Value::Null);
        assert_eq!(db.value_at("/"), Value::Null);
    }

    #[test]
    fn test_value_listener_fires_initial_and_on_change() {
        let db = MemoryDatabase::new();
        let (log, cb) = recorder();
        let handle = db.reference_at("counter").observe(DataEventType::Value, cb);

        db.reference_at("counter").set_value(json!(1)).unwrap();
        db.reference_at("counter").set_value(json!(1)).unwrap();
        db.reference_at("other").set_value(json!(2)).unwrap();

        let seen: Vec<Value> = log.lock().unwrap().iter().map(|s| s.value.clone()).collect();
        assert_eq!(seen, vec![Value::Null, json!(1)]);

        db.reference().remove_observer(handle);
        assert_eq!(db.active_observers(), 0);
    }

    #[test]
    fn test_value_listener_sees_descendant_writes() {
        let db = MemoryDatabase::new();
        let (log, cb) = recorder();
        let _h = db.reference_at("room").observe(DataEventType::Value, cb);
        db.reference_at("room/topic").set_value(json!("rust")).unwrap();
        let last = log.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.key.as_deref(), Some("room"));
        assert_eq!(last.value, json!({"topic": "rust"}));
    }

    #[test]
    fn test_child_events() {
        let db = MemoryDatabase::new();
        let list = db.reference_at("list");
        list.child("a").set_value(json!(1)).unwrap();

        let (added, cb_added) = recorder();
        let (changed, cb_changed) = recorder();
        let (removed, cb_removed) = recorder();
        let _a = list.observe(DataEventType::ChildAdded, cb_added);
        let _c = list.observe(DataEventType::ChildChanged, cb_changed);
        let _r = list.observe(DataEventType::ChildRemoved, cb_removed);

        list.child("b").set_value(json!(2)).unwrap();
        list.child("a").set_value(json!(10)).unwrap();
        list.child("b").set_value(Value::Null).unwrap();

        let keys = |log: &Arc<StdMutex<Vec<DataSnapshot>>>| {
            log.lock()
                .unwrap()
                .iter()
                .map(|s| (s.key.clone().unwrap(), s.value.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(&added), vec![("a".into(), json!(1)), ("b".into(), json!(2))]);
        assert_eq!(keys(&changed), vec![("a".into(), json!(10))]);
        assert_eq!(keys(&removed), vec![("b".into(), json!(2))]);
    }

    #[test]
    fn test_single_event_fires_once() {
        let db = MemoryDatabase::new();
        let list = db.reference_at("list");
        let log = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        list.observe_single_event(
            DataEventType::ChildAdded,
            Box::new(move |snap| sink.lock().unwrap().push(snap)),
        );
        assert_eq!(db.active_observers(), 1);

        list.child("x").set_value(json!(1)).unwrap();
        list.child("y").set_value(json!(2)).unwrap();

        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(db.active_observers(), 0);
    }

    #[test]
    fn test_offline_and_protected_writes() {
        let db = MemoryDatabase::new();
        db.set_offline(true);
        assert_eq!(
            db.reference_at("a").set_value(json!(1)),
            Err(TransportError::Offline)
        );
        db.set_offline(false);

        db.protect("admin");
        assert_eq!(
            db.reference_at("admin/flags").set_value(json!(true)),
            Err(TransportError::PermissionDenied {
                path: "admin".to_string()
            })
        );
        assert_eq!(db.value_at("admin"), Value::Null);
        assert!(db.reference_at("public").set_value(json!(true)).is_ok());
    }

    #[test]
    fn test_callback_may_remove_itself() {
        let db = MemoryDatabase::new();
        let reference = db.reference_at("n");
        let slot: Arc<StdMutex<Option<ObserverHandle>>> = Arc::new(StdMutex::new(None));
        let count = Arc::new(StdMutex::new(0));

        let (slot_cb, count_cb, reference_cb) = (Arc::clone(&slot), Arc::clone(&count), reference.clone());
        let handle = reference.observe(
            DataEventType::Value,
            Box::new(move |_| {
                *count_cb.lock().unwrap() += 1;
                if let Some(h) = slot_cb.lock().unwrap().take() {
                    reference_cb.remove_observer(h);
                }
            }),
        );
        *slot.lock().unwrap() = Some(handle);

        reference.set_value(json!(1)).unwrap();
        reference.set_value(json!(2)).unwrap();

        // Initial null, then the write that triggered removal.
        assert_eq!(*count.lock().unwrap(), 2);
        assert_eq!(db.active_observers(), 0);
        assert_eq!(db.removed_observers().len(), 1);
    }

    #[test]
    fn test_callback_may_write() {
        let db = MemoryDatabase::new();
        let mirror = db.reference_at("mirror");
        let (log, cb) = recorder();
        let _m = mirror.observe(DataEventType::Value, cb);
        let _s = db.reference_at("source").observe(
            DataEventType::Value,
            Box::new(move |snap| {
                mirror.set_value(snap.value).unwrap();
            }),
        );
        db.reference_at("source").set_value(json!("hello")).unwrap();
        assert_eq!(db.value_at("mirror"), json!("hello"));
        assert_eq!(log.lock().unwrap().last().unwrap().value, json!("hello"));
    }

    #[test]
    fn test_push_ids_are_ordered_and_unique() {
        let db = MemoryDatabase::new();
        let list = db.reference_at("list");
        let keys: Vec<String> = (0..200).map(|_| list.child_by_auto_id().key().unwrap()).collect();
        assert!(keys.iter().all(|k| k.len() == 20));
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, keys);
    }

    #[test]
    fn test_arrays_read_by_index() {
        let db = MemoryDatabase::new();
        db.reference_at("tags").set_value(json!(["a", "b"])).unwrap();
        assert_eq!(db.value_at("tags/1"), json!("b"));
        db.reference_at("tags/2").set_value(json!("c")).unwrap();
        assert_eq!(db.value_at("tags"), json!({"0": "a", "1": "b", "2": "c"}));
    }

    #[test]
    fn test_handle_releases_only_its_listener() {
        let db = MemoryDatabase::new();
        let reference = db.reference_at("n");
        let (_log, cb) = recorder();
        let handle = reference.observe(DataEventType::Value, cb);
        let raw = handle.raw();

        reference.remove_observer(ObserverHandle::from_raw(raw + 100));
        assert_eq!(db.active_observers(), 1);
        assert!(db.removed_observers().is_empty());

        reference.remove_observer(handle);
        reference.remove_observer(ObserverHandle::from_raw(raw));
        assert_eq!(db.active_observers(), 0);
        assert_eq!(db.removed_observers(), vec![raw]);
    }

    #[test]
    fn test_shutdown_drops_callbacks() {
        let db = MemoryDatabase::new();
        let (_log, cb) = recorder();
        let _h = db.reference_at("x").observe(DataEventType::ChildAdded, cb);
        db.reference_at("y")
            .observe_single_event(DataEventType::ChildRemoved, Box::new(|_| {}));
        assert_eq!(db.active_observers(), 2);
        db.shutdown_listeners();
        assert_eq!(db.active_observers(), 0);
        assert_eq!(db.registrations(), 2);
    }
}
