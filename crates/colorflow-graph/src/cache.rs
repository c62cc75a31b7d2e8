//! Content-addressed cache of built transform contexts.
//!
//! Building a context (opening profiles, linking a transform, filling a
//! lookup table) is the expensive step of a pull. The cache makes sure it
//! happens at most once per [`ContextKey`], even when several threads ask
//! for the same key at the same time:
//!
//! - the first caller installs a *building* placeholder and runs the build
//!   outside the lock
//! - later callers find the placeholder and wait on it
//! - on success the placeholder is replaced by the ready value; on failure
//!   it is removed, so the error is only seen by callers that were already
//!   waiting and a later request builds again
//!
//! Values are reference counted. [`ContextCache::invalidate`] only
//! unpublishes an entry: executions holding the value keep it alive.
//!
//! # Example
//!
//! ```rust
//! use colorflow_graph::{ContextCache, ContextKey};
//! use std::sync::Arc;
//!
//! let cache = ContextCache::new(16);
//! let key = ContextKey::from_bytes([1; 32]);
//! let a = cache.get_or_build(key, || Ok(Arc::new(42u32))).unwrap();
//! let b = cache.get_or_build(key, || unreachable!()).unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! ```

use crate::filter::SharedContext;
use crate::key::ContextKey;
use colorflow_core::{EngineError, EngineResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered by a ready or in-flight entry.
    pub hits: u64,
    /// Requests that started a build.
    pub misses: u64,
    /// Builds that completed successfully.
    pub builds: u64,
    /// Builds that failed.
    pub failures: u64,
    /// Ready entries currently published.
    pub entries: usize,
}

/// An in-flight build that other callers can wait on.
#[derive(Debug, Default)]
struct Pending {
    result: Mutex<Option<EngineResult<SharedContext>>>,
    done: Condvar,
}

impl Pending {
    fn complete(&self, result: EngineResult<SharedContext>) {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(result);
        self.done.notify_all();
    }

    fn wait(&self) -> EngineResult<SharedContext> {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            slot = self
                .done
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[derive(Debug)]
enum Slot {
    Building(Arc<Pending>),
    Ready {
        value: SharedContext,
        /// Access stamp; the smallest is evicted first.
        used: u64,
    },
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<ContextKey, Slot>,
    clock: u64,
    ready: usize,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Returns the ready value for `key` and marks it used.
    fn hit(&mut self, key: &ContextKey) -> Option<SharedContext> {
        let now = self.tick();
        match self.slots.get_mut(key) {
            Some(Slot::Ready { value, used }) => {
                *used = now;
                Some(value.clone())
            }
            _ => None,
        }
    }

    fn remove(&mut self, key: &ContextKey) -> Option<Slot> {
        let slot = self.slots.remove(key);
        if matches!(slot, Some(Slot::Ready { .. })) {
            self.ready -= 1;
        }
        slot
    }

    fn least_recently_used(&self) -> Option<ContextKey> {
        self.slots
            .iter()
            .filter_map(|(key, slot)| match slot {
                Slot::Ready { used, .. } => Some((*used, *key)),
                Slot::Building(_) => None,
            })
            .min()
            .map(|(_, key)| key)
    }
}

/// Thread-safe, content-addressed context store.
///
/// Shared by every conversion of an [`Engine`](crate::Engine).
#[derive(Debug)]
pub struct ContextCache {
    inner: Mutex<Inner>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
    failures: AtomicU64,
}

impl ContextCache {
    /// Creates a cache keeping at most `capacity` ready contexts.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            builds: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the context for `key`, building it with `build` on a miss.
    ///
    /// `build` runs at most once per key at a time; concurrent callers with
    /// the same key block until it finishes and share its result.
    pub fn get_or_build<F>(&self, key: ContextKey, build: F) -> EngineResult<SharedContext>
    where
        F: FnOnce() -> EngineResult<SharedContext>,
    {
        let pending = {
            let mut inner = self.lock();
            let now = inner.tick();
            match inner.slots.get_mut(&key) {
                Some(Slot::Ready { value, used }) => {
                    *used = now;
                    let value = value.clone();
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    trace!(key = ?key, "context cache hit");
                    return Ok(value);
                }
                Some(Slot::Building(pending)) => {
                    let pending = pending.clone();
                    drop(inner);
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    trace!(key = ?key, "waiting for in-flight context build");
                    return pending.wait();
                }
                None => {
                    let pending = Arc::new(Pending::default());
                    inner.slots.insert(key, Slot::Building(pending.clone()));
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    pending
                }
            }
        };

        debug!(key = ?key, "building context");
        let mut guard = BuildGuard {
            cache: self,
            key,
            pending: &pending,
            finished: false,
        };
        let result = build();
        guard.finish(result.clone());
        result
    }

    /// Returns the ready context for `key` without building.
    pub fn get(&self, key: &ContextKey) -> Option<SharedContext> {
        self.lock().hit(key)
    }

    /// Like [`ContextCache::get`], but a missing entry is an error.
    pub fn require(&self, key: &ContextKey) -> EngineResult<SharedContext> {
        self.get(key)
            .ok_or_else(|| EngineError::not_found(format!("no context for key {key}")))
    }

    /// Returns `true` if a ready context is published for `key`.
    pub fn contains(&self, key: &ContextKey) -> bool {
        matches!(self.lock().slots.get(key), Some(Slot::Ready { .. }))
    }

    /// Unpublishes `key`. Returns `true` if an entry was removed.
    ///
    /// An in-flight build for `key` still completes for its callers but
    /// its result is not published.
    pub fn invalidate(&self, key: &ContextKey) -> bool {
        let removed = self.lock().remove(key).is_some();
        if removed {
            debug!(key = ?key, "context invalidated");
        }
        removed
    }

    /// Recomputes a node's key from its current streams and options and
    /// unpublishes it.
    pub fn invalidate_for_node(
        &self,
        node: &crate::FilterNode,
        inputs: &[crate::StreamDesc],
        output: &crate::StreamDesc,
    ) -> bool {
        let key = node.context_key(inputs, output);
        self.invalidate(&key)
    }

    /// Unpublishes every entry.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.slots.clear();
        inner.ready = 0;
    }

    /// Number of ready entries.
    pub fn len(&self) -> usize {
        self.lock().ready
    }

    /// Returns `true` if no ready entries are published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of ready entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn publish(&self, key: ContextKey, pending: &Arc<Pending>, result: &EngineResult<SharedContext>) {
        let mut inner = self.lock();
        let ours = matches!(
            inner.slots.get(&key),
            Some(Slot::Building(p)) if Arc::ptr_eq(p, pending)
        );
        if !ours {
            trace!(key = ?key, "context was invalidated during build, not publishing");
            return;
        }
        match result {
            Ok(value) => {
                let used = inner.tick();
                inner.slots.insert(
                    key,
                    Slot::Ready {
                        value: value.clone(),
                        used,
                    },
                );
                inner.ready += 1;
                while inner.ready > self.capacity {
                    let Some(old) = inner.least_recently_used() else {
                        break;
                    };
                    inner.remove(&old);
                    debug!(key = ?old, "evicted least recently used context");
                }
            }
            Err(_) => {
                inner.slots.remove(&key);
            }
        }
    }
}

impl Default for ContextCache {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Settles a build placeholder even if the build panics.
struct BuildGuard<'a> {
    cache: &'a ContextCache,
    key: ContextKey,
    pending: &'a Arc<Pending>,
    finished: bool,
}

impl BuildGuard<'_> {
    fn finish(&mut self, result: EngineResult<SharedContext>) {
        match &result {
            Ok(_) => {
                self.cache.builds.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.cache.failures.fetch_add(1, Ordering::Relaxed);
                debug!(key = ?self.key, error = %err, "context build failed");
            }
        }
        self.cache.publish(self.key, self.pending, &result);
        self.pending.complete(result);
        self.finished = true;
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(Err(EngineError::incompatible_context(
                "context build panicked",
            )));
        }
    }
}
