//! In-memory storage backend.
//!
//! This is the reference implementation of `StoreBackend`.
//! It uses HashMaps protected by parking_lot locks.
//!
//! ## Behavior
//!
//! - **Ordering**: documents come back in creation order. Replacing a
//!   document keeps its original position.
//! - **Listeners**: every write re-evaluates the listeners of the touched
//!   collection and pushes the full result set to those whose result
//!   changed.
//! - **Fault injection**: `set_available(false)` makes every request fail
//!   with `Error::Backend` and terminates live listeners with an error
//!   event, the way a dropped connection would.
//!
//! Lock order is always `collections` before `listeners`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::model::{WireDocument, WireMap};
use crate::query::WireQuery;
use crate::{Error, Result};
use super::{BackendCapabilities, ListenEvent, Listener, ListenerId, StoreBackend};

/// Default cap on `in` / `array-contains-any` comparand lists.
pub const DEFAULT_MAX_DISJUNCTION_VALUES: usize = 30;

const UNAVAILABLE: &str = "backend unavailable";

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory document storage. Cloning shares the same data.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    collections: RwLock<HashMap<String, StoredCollection>>,
    listeners: Mutex<HashMap<ListenerId, ListenerEntry>>,
    available: AtomicBool,
    next_seq: AtomicU64,
    next_listener_id: AtomicU64,
    released_listeners: AtomicU64,
    max_disjunction_values: usize,
}

#[derive(Default)]
struct StoredCollection {
    docs: HashMap<String, StoredDoc>,
}

struct StoredDoc {
    /// Creation sequence; defines backend order.
    seq: u64,
    fields: WireMap,
}

struct ListenerEntry {
    collection: String,
    query: WireQuery,
    tx: mpsc::UnboundedSender<ListenEvent>,
    last: Vec<WireDocument>,
}

impl StoredCollection {
    fn ordered(&self) -> Vec<WireDocument> {
        let mut docs: Vec<(&String, &StoredDoc)> = self.docs.iter().collect();
        docs.sort_by_key(|(_, d)| d.seq);
        docs.into_iter()
            .map(|(id, d)| WireDocument { id: id.clone(), fields: d.fields.clone() })
            .collect()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_max_disjunction(DEFAULT_MAX_DISJUNCTION_VALUES)
    }

    pub fn with_max_disjunction(max_disjunction_values: usize) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                collections: RwLock::new(HashMap::new()),
                listeners: Mutex::new(HashMap::new()),
                available: AtomicBool::new(true),
                next_seq: AtomicU64::new(1),
                next_listener_id: AtomicU64::new(1),
                released_listeners: AtomicU64::new(0),
                max_disjunction_values,
            }),
        }
    }

    /// Simulate connectivity loss (`false`) or recovery (`true`).
    ///
    /// Going unavailable terminates every live listener with an error event.
    /// Recovery does not resurrect them.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
        if !available {
            let drained: Vec<ListenerEntry> = {
                let mut listeners = self.inner.listeners.lock();
                listeners.drain().map(|(_, entry)| entry).collect()
            };
            for entry in drained {
                let _ = entry.tx.send(ListenEvent::Error(UNAVAILABLE.into()));
            }
        }
    }

    /// Number of registered listeners.
    pub fn active_listeners(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Number of listeners released through `unlisten`.
    pub fn released_listeners(&self) -> u64 {
        self.inner.released_listeners.load(Ordering::SeqCst)
    }

    /// Number of documents stored in a collection.
    pub fn document_count(&self, collection: &str) -> usize {
        self.inner.collections.read().get(collection).map_or(0, |c| c.docs.len())
    }

    fn ensure_available(&self) -> Result<()> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Backend(UNAVAILABLE.into()))
        }
    }

    fn next_seq(&self) -> u64 {
        self.inner.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Push fresh result sets to listeners on `collection` whose result
    /// changed. Listeners whose receiver is gone are dropped.
    fn notify(&self, collection: &str) {
        let collections = self.inner.collections.read();
        let mut listeners = self.inner.listeners.lock();
        if !listeners.values().any(|l| l.collection == collection) {
            return;
        }
        let snapshot = collections.get(collection).map(StoredCollection::ordered).unwrap_or_default();
        listeners.retain(|id, entry| {
            if entry.collection != collection {
                return true;
            }
            let result = entry.query.evaluate(&snapshot);
            if result == entry.last {
                return true;
            }
            entry.last = result.clone();
            let alive = entry.tx.send(ListenEvent::Snapshot(result)).is_ok();
            if !alive {
                tracing::debug!(%id, collection, "listener receiver dropped; discarding");
            }
            alive
        });
    }
}

// ============================================================================
// StoreBackend impl
// ============================================================================

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn shutdown(&self) -> Result<()> {
        // Dropping the senders closes every listener channel.
        self.inner.listeners.lock().clear();
        Ok(())
    }

    async fn add_document(&self, collection: &str, fields: WireMap) -> Result<String> {
        self.ensure_available()?;
        let id = Uuid::new_v4().simple().to_string();
        let seq = self.next_seq();
        self.inner
            .collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .docs
            .insert(id.clone(), StoredDoc { seq, fields });
        self.notify(collection);
        Ok(id)
    }

    async fn set_document(&self, collection: &str, id: &str, fields: WireMap) -> Result<()> {
        self.ensure_available()?;
        {
            let mut collections = self.inner.collections.write();
            let docs = &mut collections.entry(collection.to_string()).or_default().docs;
            match docs.get_mut(id) {
                Some(existing) => existing.fields = fields,
                None => {
                    let seq = self.next_seq();
                    docs.insert(id.to_string(), StoredDoc { seq, fields });
                }
            }
        }
        self.notify(collection);
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<WireDocument>> {
        self.ensure_available()?;
        let collections = self.inner.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|c| c.docs.get(id))
            .map(|d| WireDocument { id: id.to_string(), fields: d.fields.clone() }))
    }

    async fn update_document(&self, collection: &str, id: &str, fields: WireMap) -> Result<()> {
        self.ensure_available()?;
        {
            let mut collections = self.inner.collections.write();
            let doc = collections
                .get_mut(collection)
                .and_then(|c| c.docs.get_mut(id))
                .ok_or_else(|| Error::Backend(format!("no document to update at {collection}/{id}")))?;
            doc.fields.extend(fields);
        }
        self.notify(collection);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        self.ensure_available()?;
        let removed = self
            .inner
            .collections
            .write()
            .get_mut(collection)
            .and_then(|c| c.docs.remove(id))
            .is_some();
        if removed {
            self.notify(collection);
        }
        Ok(())
    }

    async fn run_query(&self, collection: &str, query: &WireQuery) -> Result<Vec<WireDocument>> {
        self.ensure_available()?;
        let collections = self.inner.collections.read();
        let docs = collections.get(collection).map(StoredCollection::ordered).unwrap_or_default();
        Ok(query.evaluate(&docs))
    }

    async fn listen(&self, collection: &str, query: WireQuery) -> Result<Listener> {
        self.ensure_available()?;
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed));
        let (tx, events) = mpsc::unbounded_channel();

        let collections = self.inner.collections.read();
        let docs = collections.get(collection).map(StoredCollection::ordered).unwrap_or_default();
        let initial = query.evaluate(&docs);
        // The receiver is still in scope, so this send cannot fail.
        let _ = tx.send(ListenEvent::Snapshot(initial.clone()));
        self.inner.listeners.lock().insert(
            id,
            ListenerEntry { collection: collection.to_string(), query, tx, last: initial },
        );
        drop(collections);

        Ok(Listener { id, events })
    }

    fn unlisten(&self, id: ListenerId) {
        if self.inner.listeners.lock().remove(&id).is_some() {
            self.inner.released_listeners.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            max_disjunction_values: Some(self.inner.max_disjunction_values),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
