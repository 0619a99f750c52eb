//! # docstore - Typed Document-Store Client
//!
//! A client-side contract over an opaque document backend: typed CRUD,
//! query composition, live subscriptions, and temporal normalization
//! between calendar timestamps and the backend's native markers.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `StoreBackend` is the contract between client and storage
//! 2. **Closed value shapes**: `Value` (domain) and `WireValue` (backend) are
//!    converted by an exhaustive codec, never by runtime type inspection
//! 3. **Typed at the boundary**: each collection has a `Schema`; unknown
//!    shapes are rejected on read, not at use
//! 4. **Explicit lifetimes**: a `Subscription` owns its backend listener and
//!    releases it on cancel or drop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docstore::{DocumentStore, QueryOptions, Value, fields};
//!
//! # async fn example() -> docstore::Result<()> {
//! let store = DocumentStore::open_memory();
//!
//! let id = store.create("skills", fields([("name", Value::from("Rust"))])).await?;
//! let doc = store.get("skills", &id).await?;
//! assert!(doc.is_some());
//!
//! let rust = store
//!     .query("skills", &QueryOptions::new().where_eq("name", "Rust"))
//!     .await?;
//! assert_eq!(rust.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Backends
//!
//! | Backend | Config | Description |
//! |---------|--------|-------------|
//! | Memory | `BackendConfig::Memory` | In-memory reference backend |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod codec;
pub mod query;
pub mod storage;
pub mod subscription;
pub mod config;
pub mod domain;
pub mod onboarding;
pub mod messages;

use std::marker::PhantomData;
use std::sync::Arc;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Value, FromValue, WireValue, WireMap, WireDocument, TemporalMarker,
    FieldMap, ID_FIELD, fields, map_value,
    Document, FromDocument, Schema,
};

// ============================================================================
// Re-exports: Codec, Query, Storage
// ============================================================================

pub use codec::TemporalCodec;
pub use query::{Filter, FilterOp, Direction, OrderBy, QueryOptions, WireQuery};
pub use storage::{
    StoreBackend, BackendConfig, BackendCapabilities, MemoryBackend,
    ListenEvent, Listener, ListenerId,
};
pub use subscription::{Subscription, SubscriptionState};
pub use config::StoreConfig;

// ============================================================================
// Re-exports: Domain consumers
// ============================================================================

pub use domain::{
    Skill, InterestToGrow, ProfessionalExperience, Study, Profile,
    Message, MessageKind, Conversation,
};
pub use onboarding::{ProgressStateMachine, OnboardingState, Step, ExperienceDraft, StudyDraft};
pub use messages::{MessageStream, NewMessage, send_message, save_conversation};

// ============================================================================
// Top-level DocumentStore handle
// ============================================================================

/// The primary entry point. Wraps a backend and provides typed,
/// codec-normalized access to its collections.
///
/// Cheap to clone; clones share the backend. Holds no domain state.
pub struct DocumentStore<B: StoreBackend> {
    backend: Arc<B>,
    max_disjunction: Option<usize>,
}

impl<B: StoreBackend> Clone for DocumentStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            max_disjunction: self.max_disjunction,
        }
    }
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Create a store over the given backend.
    pub fn with_backend(backend: B) -> Self {
        let max_disjunction = backend.capabilities().max_disjunction_values;
        Self { backend: Arc::new(backend), max_disjunction }
    }

    /// Access the underlying backend (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Typed handle for the collection a schema is bound to.
    pub fn collection<T: Schema>(&self) -> Collection<'_, B, T> {
        Collection { store: self, _marker: PhantomData }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert `data` under a backend-generated id and return the id.
    ///
    /// Absent or empty payloads are rejected. A caller-supplied `id` field
    /// is stripped.
    pub async fn create(
        &self,
        collection: &str,
        data: impl Into<Option<FieldMap>>,
    ) -> Result<String> {
        let result = async {
            let wire = encode_payload(collection, data.into().as_ref())?;
            self.backend.add_document(collection, wire).await
        }
        .await;
        logged("create", collection, None, result)
            .inspect(|id| tracing::debug!(collection, id = %id, "document created"))
    }

    /// Create-or-replace the document at `id`. Idempotent.
    pub async fn create_with_id(
        &self,
        collection: &str,
        id: &str,
        data: impl Into<Option<FieldMap>>,
    ) -> Result<()> {
        let result = async {
            validate_id(collection, id)?;
            let wire = encode_payload(collection, data.into().as_ref())?;
            self.backend.set_document(collection, id, wire).await
        }
        .await;
        logged("create_with_id", collection, Some(id), result)
            .inspect(|_| tracing::debug!(collection, id, "document written"))
    }

    /// Merge the given top-level fields into an existing document.
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: impl Into<Option<FieldMap>>,
    ) -> Result<()> {
        let result = async {
            validate_id(collection, id)?;
            let wire = encode_payload(collection, partial.into().as_ref())?;
            self.backend.update_document(collection, id, wire).await
        }
        .await;
        logged("update", collection, Some(id), result)
            .inspect(|_| tracing::debug!(collection, id, "document updated"))
    }

    /// Delete the document at `id`. Deleting a missing id is not an error.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let result = async {
            validate_id(collection, id)?;
            self.backend.delete_document(collection, id).await
        }
        .await;
        logged("delete", collection, Some(id), result)
            .inspect(|_| tracing::debug!(collection, id, "document deleted"))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read one document; `None` when nothing lives at `id`.
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.get_as(collection, id).await
    }

    /// Run a one-shot query. Without an order clause the result order is
    /// whatever the backend returns.
    pub async fn query(&self, collection: &str, options: &QueryOptions) -> Result<Vec<Document>> {
        self.query_as(collection, options).await
    }

    /// Open a live subscription. Each push is the entire current result set.
    ///
    /// Every call registers its own backend listener.
    pub async fn watch(
        &self,
        collection: &str,
        options: &QueryOptions,
    ) -> Result<Subscription<Document>> {
        self.watch_as(collection, options).await
    }

    pub(crate) async fn get_as<T: FromDocument>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        let result = async {
            validate_id(collection, id)?;
            match self.backend.get_document(collection, id).await? {
                Some(doc) => decode(collection, doc).map(Some),
                None => {
                    tracing::debug!(collection, id, "no document");
                    Ok(None)
                }
            }
        }
        .await;
        logged("get", collection, Some(id), result)
    }

    pub(crate) async fn query_as<T: FromDocument>(
        &self,
        collection: &str,
        options: &QueryOptions,
    ) -> Result<Vec<T>> {
        let result = async {
            let query = options.to_wire(self.max_disjunction)?;
            let docs = self.backend.run_query(collection, &query).await?;
            docs.into_iter().map(|d| decode(collection, d)).collect::<Result<Vec<T>>>()
        }
        .await;
        logged("query", collection, None, result)
            .inspect(|docs| tracing::debug!(collection, count = docs.len(), "query returned"))
    }

    pub(crate) async fn watch_as<T: FromDocument>(
        &self,
        collection: &str,
        options: &QueryOptions,
    ) -> Result<Subscription<T>> {
        let result = async {
            let query = options.to_wire(self.max_disjunction)?;
            self.backend.listen(collection, query).await
        }
        .await;
        let listener = logged("watch", collection, None, result)?;
        tracing::debug!(collection, listener = %listener.id, "subscription opened");

        let backend = Arc::clone(&self.backend);
        let id = listener.id;
        Ok(Subscription::new(
            collection,
            id,
            listener.events,
            Box::new(move || backend.unlisten(id)),
        ))
    }

    /// Shut down the backend. Live subscriptions end.
    pub async fn shutdown(&self) -> Result<()> {
        self.backend.shutdown().await
    }
}

/// In-memory store for testing and embedding.
impl DocumentStore<MemoryBackend> {
    pub fn open_memory() -> Self {
        Self::with_backend(MemoryBackend::new())
    }

    /// Build a store from configuration.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        match config.backend {
            BackendConfig::Memory => {
                let backend = match config.max_disjunction_values {
                    Some(max) => MemoryBackend::with_max_disjunction(max),
                    None => MemoryBackend::new(),
                };
                tracing::info!(backend = "memory", "document store opened");
                Ok(Self::with_backend(backend))
            }
        }
    }
}

// ============================================================================
// Typed collection handle
// ============================================================================

/// The store seen through one `Schema`: same operations, typed payloads.
pub struct Collection<'s, B: StoreBackend, T: Schema> {
    store: &'s DocumentStore<B>,
    _marker: PhantomData<fn() -> T>,
}

impl<B: StoreBackend, T: Schema> Collection<'_, B, T> {
    pub fn name(&self) -> &'static str {
        T::COLLECTION
    }

    pub async fn create(&self, record: &T) -> Result<String> {
        self.store.create(T::COLLECTION, record.to_fields()).await
    }

    pub async fn create_with_id(&self, id: &str, record: &T) -> Result<()> {
        self.store.create_with_id(T::COLLECTION, id, record.to_fields()).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>> {
        self.store.get_as(T::COLLECTION, id).await
    }

    pub async fn query(&self, options: &QueryOptions) -> Result<Vec<T>> {
        self.store.query_as(T::COLLECTION, options).await
    }

    pub async fn watch(&self, options: &QueryOptions) -> Result<Subscription<T>> {
        self.store.watch_as(T::COLLECTION, options).await
    }

    pub async fn update(&self, id: &str, partial: FieldMap) -> Result<()> {
        self.store.update(T::COLLECTION, id, partial).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(T::COLLECTION, id).await
    }
}

// ============================================================================
// Boundary helpers
// ============================================================================

fn encode_payload(collection: &str, data: Option<&FieldMap>) -> Result<WireMap> {
    let wire = data.map(TemporalCodec::encode_fields).unwrap_or_default();
    if wire.is_empty() {
        return Err(Error::Validation(format!(
            "payload for `{collection}` must not be empty"
        )));
    }
    Ok(wire)
}

fn validate_id(collection: &str, id: &str) -> Result<()> {
    if id.is_empty() || id.contains('/') {
        return Err(Error::Validation(format!(
            "invalid document id {id:?} in `{collection}`"
        )));
    }
    Ok(())
}

fn decode<T: FromDocument>(collection: &str, doc: WireDocument) -> Result<T> {
    let WireDocument { id, fields } = doc;
    TemporalCodec::decode_fields(&fields)
        .and_then(|fields| T::from_document(Document { id: Some(id.clone()), fields }))
        .map_err(|e| Error::Decode {
            collection: collection.to_string(),
            id,
            message: e.to_string(),
        })
}

/// Log a failed operation at the boundary, then hand the result back.
fn logged<T>(op: &'static str, collection: &str, id: Option<&str>, result: Result<T>) -> Result<T> {
    result.inspect_err(|e| tracing::error!(op, collection, id, error = %e, "store operation failed"))
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Cannot decode {collection}/{id}: {message}")]
    Decode { collection: String, id: String, message: String },

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
