//! `ProjectionView`: a mapping from [`Id`] to an opaque
//! value, not ready for reads until initial replay completes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::{Notify, RwLock};

use crate::error::{Error, Result};
use crate::id::Id;

/// An update callback: receives the current value (if any existed) and
/// returns the next value.
pub type UpdateFn = Box<dyn FnOnce(Option<Value>) -> Value + Send>;
/// A predicate used by [`ProjectionView::update_all`]/[`ProjectionView::delete_all`].
pub type FilterFn = Box<dyn Fn(&Id, &Value) -> bool + Send + Sync>;

/// The read-model store owned by a projection.
///
/// Readers calling [`ProjectionView::get`] with `nowait = false` block until
/// [`ProjectionView::mark_ready`] has been called once, by the initial
/// replay.
#[derive(Debug)]
pub struct ProjectionView {
    ready: AtomicBool,
    ready_notify: Notify,
    data: RwLock<HashMap<Id, Value>>,
}

impl Default for ProjectionView {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectionView {
    /// Creates an empty, not-yet-ready view.
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            ready_notify: Notify::new(),
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Whether initial replay has completed.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Marks the view ready, waking any reader blocked in `get`/`has` with
    /// `nowait = false`. Idempotent.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
        self.ready_notify.notify_waiters();
    }

    async fn await_ready(&self, nowait: bool) {
        if nowait || self.is_ready() {
            return;
        }
        // Re-check after registering, to avoid a missed wakeup between the
        // `is_ready` check above and `notified()` below.
        let notified = self.ready_notify.notified();
        if self.is_ready() {
            return;
        }
        notified.await;
    }

    /// Returns whether `key` is present. Blocks until ready unless
    /// `nowait`.
    pub async fn has(&self, key: &Id, nowait: bool) -> bool {
        self.await_ready(nowait).await;
        self.data.read().await.contains_key(key)
    }

    /// Returns a clone of the value at `key`, if present. Blocks until
    /// ready unless `nowait`.
    pub async fn get(&self, key: &Id, nowait: bool) -> Option<Value> {
        self.await_ready(nowait).await;
        self.data.read().await.get(key).cloned()
    }

    /// Inserts `value` at `key`. Fails if `key` already exists.
    pub async fn create(&self, key: Id, value: Value) -> Result<()> {
        let mut data = self.data.write().await;
        if data.contains_key(&key) {
            return Err(Error::InvalidArgument(format!(
                "projection key {key} already exists"
            )));
        }
        data.insert(key, value);
        Ok(())
    }

    /// Replaces the value at `key` via `f`. Fails if `key` is missing.
    pub async fn update(&self, key: &Id, f: UpdateFn) -> Result<()> {
        let mut data = self.data.write().await;
        let Some(current) = data.remove(key) else {
            return Err(Error::InvalidArgument(format!(
                "projection key {key} does not exist"
            )));
        };
        data.insert(key.clone(), f(Some(current)));
        Ok(())
    }

    /// Upserts the value at `key` via `f`, passing `None` if it was
    /// missing.
    pub async fn update_enforcing_new(&self, key: Id, f: UpdateFn) {
        let mut data = self.data.write().await;
        let current = data.remove(&key);
        data.insert(key, f(current));
    }

    /// Applies `f` to every entry matching `filter`, atomically per key.
    pub async fn update_all(&self, filter: FilterFn, f: impl Fn(Value) -> Value) {
        let mut data = self.data.write().await;
        let matching: Vec<Id> = data
            .iter()
            .filter(|(k, v)| filter(k, v))
            .map(|(k, _)| k.clone())
            .collect();
        for key in matching {
            if let Some(current) = data.remove(&key) {
                data.insert(key, f(current));
            }
        }
    }

    /// Removes `key`, if present.
    pub async fn delete(&self, key: &Id) {
        self.data.write().await.remove(key);
    }

    /// Removes every entry matching `filter`.
    pub async fn delete_all(&self, filter: FilterFn) {
        let mut data = self.data.write().await;
        data.retain(|k, v| !filter(k, v));
    }
}
