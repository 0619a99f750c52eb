//! # Store Backend Trait
//!
//! The contract between the typed client and whatever actually holds the
//! documents. Backends speak wire values only; temporal normalization and
//! identifier handling happen above this line.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | In-memory reference backend for tests/embedding |

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::model::{WireDocument, WireMap};
use crate::query::WireQuery;
use crate::Result;

pub use memory::MemoryBackend;

// ============================================================================
// Backend Configuration
// ============================================================================

/// Which backend to connect to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// In-memory (no persistence)
    #[default]
    Memory,
}

// ============================================================================
// Backend capabilities
// ============================================================================

/// What a backend can evaluate. Used by the store to reject queries early.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// Maximum comparand list length for `in` / `array-contains-any`.
    pub max_disjunction_values: Option<usize>,
}

// ============================================================================
// Live listeners
// ============================================================================

/// Opaque handle for one backend listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// What a backend pushes down a listener channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenEvent {
    /// The entire current result set, never a delta.
    Snapshot(Vec<WireDocument>),
    /// The listener is dead. Nothing follows.
    Error(String),
}

/// A registered listener: its id plus the receiving end of its channel.
#[derive(Debug)]
pub struct Listener {
    pub id: ListenerId,
    pub events: mpsc::UnboundedReceiver<ListenEvent>,
}

// ============================================================================
// StoreBackend Trait
// ============================================================================

/// The storage contract.
///
/// Every request/response method may fail with `Error::Backend`; the store
/// propagates it unchanged. Writes are last-write-wins per document id.
#[async_trait]
pub trait StoreBackend: Send + Sync + 'static {
    /// Shut down the backend. Live listeners are terminated.
    async fn shutdown(&self) -> Result<()>;

    /// Insert a document under a backend-generated id.
    async fn add_document(&self, collection: &str, fields: WireMap) -> Result<String>;

    /// Create-or-replace the document at `id`.
    async fn set_document(&self, collection: &str, id: &str, fields: WireMap) -> Result<()>;

    /// Read one document. `None` when nothing lives at `id`.
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<WireDocument>>;

    /// Merge top-level fields into an existing document.
    /// Fails when the document does not exist.
    async fn update_document(&self, collection: &str, id: &str, fields: WireMap) -> Result<()>;

    /// Delete a document. Deleting a missing id succeeds.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<()>;

    /// Evaluate a query once.
    async fn run_query(&self, collection: &str, query: &WireQuery) -> Result<Vec<WireDocument>>;

    /// Register a live listener. The current result set is pushed
    /// immediately, then again after every change to it.
    async fn listen(&self, collection: &str, query: WireQuery) -> Result<Listener>;

    /// Release a listener. Unknown ids are ignored.
    fn unlisten(&self, id: ListenerId);

    /// Report what this backend can do.
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::default()
    }
}
