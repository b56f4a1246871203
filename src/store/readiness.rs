// src/store/readiness.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::{InitError, Result};
use crate::store::state::TaskState;
use crate::types::TaskName;

type Observer = Box<dyn FnMut(&TaskState) + Send>;

/// One task's slot in the store.
///
/// The `watch` sender holds the current state for snapshot reads and async
/// waits; `observers` receives every transition synchronously and in order.
struct Entry {
    state: watch::Sender<TaskState>,
    observers: Mutex<Vec<(u64, Observer)>>,
}

impl Entry {
    fn new() -> Self {
        let (state, _rx) = watch::channel(TaskState::Pending);
        Self {
            state,
            observers: Mutex::new(Vec::new()),
        }
    }
}

struct StoreInner {
    entries: RwLock<BTreeMap<TaskName, Arc<Entry>>>,
    all_ready: watch::Sender<bool>,
    next_subscription: AtomicU64,
}

/// Process-wide map from task name to its current [`TaskState`].
///
/// Cloning the store is cheap and yields another handle onto the same
/// entries. Only the engine runtime writes (the write API is crate-private);
/// everyone else observes through [`get`](Self::get),
/// [`watch`](Self::watch) or [`subscribe`](Self::subscribe).
#[derive(Clone)]
pub struct ReadinessStore {
    inner: Arc<StoreInner>,
}

impl fmt::Debug for ReadinessStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessStore")
            .field("tasks", &self.task_names())
            .field("all_ready", &self.all_ready())
            .finish_non_exhaustive()
    }
}

impl Default for ReadinessStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessStore {
    pub fn new() -> Self {
        // An empty store is vacuously ready.
        let (all_ready, _rx) = watch::channel(true);
        Self {
            inner: Arc::new(StoreInner {
                entries: RwLock::new(BTreeMap::new()),
                all_ready,
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    /// Current state of `task`, or `None` if no such task is registered.
    pub fn get(&self, task: &str) -> Option<TaskState> {
        self.entry(task).map(|entry| entry.state.borrow().clone())
    }

    /// `true` iff `task` is registered and `Completed`.
    pub fn is_completed(&self, task: &str) -> bool {
        self.entry(task)
            .map(|entry| entry.state.borrow().is_completed())
            .unwrap_or(false)
    }

    /// Registered task names, in sorted order.
    pub fn task_names(&self) -> Vec<TaskName> {
        read(&self.inner.entries).keys().cloned().collect()
    }

    /// Point-in-time copy of every entry.
    pub fn snapshot(&self) -> BTreeMap<TaskName, TaskState> {
        read(&self.inner.entries)
            .iter()
            .map(|(name, entry)| (name.clone(), entry.state.borrow().clone()))
            .collect()
    }

    /// A `watch` receiver tracking `task`'s state, for async consumers.
    pub fn watch(&self, task: &str) -> Result<watch::Receiver<TaskState>> {
        self.entry(task)
            .map(|entry| entry.state.subscribe())
            .ok_or_else(|| InitError::TaskNotFound(task.to_string()))
    }

    /// Logical AND of "completed" over every registered task.
    pub fn all_ready(&self) -> bool {
        *self.inner.all_ready.borrow()
    }

    /// A `watch` receiver over [`all_ready`](Self::all_ready), updated
    /// whenever any task changes state.
    pub fn watch_all_ready(&self) -> watch::Receiver<bool> {
        self.inner.all_ready.subscribe()
    }

    /// Register `observer` for `task`.
    ///
    /// The observer is called immediately with the current state (a task that
    /// already settled replays its final state) and then once per transition,
    /// in order, until the returned [`Subscription`] is dropped.
    ///
    /// Observers run on the writer's call path: they must not block, and must
    /// not subscribe to or unsubscribe from the same task.
    pub fn subscribe<F>(&self, task: &str, observer: F) -> Result<Subscription>
    where
        F: FnMut(&TaskState) + Send + 'static,
    {
        let entry = self
            .entry(task)
            .ok_or_else(|| InitError::TaskNotFound(task.to_string()))?;
        let id = self.inner.next_subscription.fetch_add(1, Ordering::Relaxed);
        let mut observer: Observer = Box::new(observer);

        // Holding the observer lock while replaying keeps a concurrent publish
        // from slipping in between the replay and the registration.
        let mut observers = lock(&entry.observers);
        let current = entry.state.borrow().clone();
        observer(&current);
        observers.push((id, observer));

        debug!(task = %task, subscription = id, "observer subscribed");

        Ok(Subscription {
            task: task.to_string(),
            id,
            entry: Arc::downgrade(&entry),
        })
    }

    /// Add a `Pending` entry for a newly registered task.
    ///
    /// Re-inserting an existing name keeps the existing entry and its
    /// observers.
    pub(crate) fn insert_pending(&self, task: &str) {
        {
            let mut entries = write(&self.inner.entries);
            entries
                .entry(task.to_string())
                .or_insert_with(|| Arc::new(Entry::new()));
        }
        self.recompute_all_ready();
    }

    /// Publish a state transition for `task`.
    ///
    /// The new state becomes visible to snapshot readers and `watch`
    /// receivers, then every observer is notified, before this returns.
    pub(crate) fn publish(&self, task: &str, state: TaskState) {
        let Some(entry) = self.entry(task) else {
            warn!(task = %task, "publish for unregistered task; ignoring");
            return;
        };

        {
            let mut observers = lock(&entry.observers);
            entry.state.send_replace(state.clone());
            for (_, observer) in observers.iter_mut() {
                observer(&state);
            }
        }

        debug!(task = %task, state = state.label(), "published state transition");
        self.recompute_all_ready();
    }

    /// Move every entry that is not already `Pending` back to `Pending`.
    ///
    /// Used for a full re-initialization; entries and subscriptions are kept.
    pub(crate) fn reset_to_pending(&self) {
        for name in self.task_names() {
            let needs_reset = self
                .entry(&name)
                .map(|entry| *entry.state.borrow() != TaskState::Pending)
                .unwrap_or(false);
            if needs_reset {
                self.publish(&name, TaskState::Pending);
            }
        }
    }

    fn entry(&self, task: &str) -> Option<Arc<Entry>> {
        read(&self.inner.entries).get(task).cloned()
    }

    fn recompute_all_ready(&self) {
        let ready = read(&self.inner.entries)
            .values()
            .all(|entry| entry.state.borrow().is_completed());

        self.inner.all_ready.send_if_modified(|current| {
            if *current == ready {
                false
            } else {
                *current = ready;
                true
            }
        });
    }
}

/// Handle for an observer registered with [`ReadinessStore::subscribe`].
///
/// Dropping it (or calling [`unsubscribe`](Self::unsubscribe)) removes the
/// observer.
#[must_use = "dropping a Subscription immediately unsubscribes the observer"]
pub struct Subscription {
    task: TaskName,
    id: u64,
    entry: Weak<Entry>,
}

impl Subscription {
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("task", &self.task)
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.upgrade() {
            lock(&entry.observers).retain(|(id, _)| *id != self.id);
            debug!(task = %self.task, subscription = self.id, "observer unsubscribed");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
