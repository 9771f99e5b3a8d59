//! Platform seam for the hosted auth/database service
//!
//! The binding layer never talks to a concrete backend directly. It
//! consumes two narrow interfaces — [`AuthProvider`] for the current
//! identity and [`DocumentDatabase`] for document subscriptions and
//! one-shot queries — injected as `Arc` handles. Concrete backends:
//!
//! - [`auth::AuthBridge`]: in-process auth provider driven by the host
//! - [`memory::MemoryPlatform`]: in-memory database for tests and dev
//! - [`mongo::MongoPlatform`]: MongoDB via change streams
//! - [`admin`]: server-side client with idempotent initialization

pub mod admin;
pub mod auth;
pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use bson::{Bson, Document};
use std::sync::Arc;

use crate::types::{LivebindError, Result};

/// Authenticated identity reported by the auth provider
///
/// Opaque to this layer beyond `uid`; replaced wholesale on every
/// provider notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Provider-assigned unique id
    pub uid: String,
    /// Account email, if the provider reports one
    pub email: Option<String>,
    /// Display name, if set
    pub display_name: Option<String>,
    /// Avatar URL, if set
    pub photo_url: Option<String>,
}

impl Identity {
    /// Create an identity carrying only a uid
    pub fn with_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            photo_url: None,
        }
    }
}

/// A single point-in-time delivery of a document's content (or absence)
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Full document content, or `None` if the document does not exist
    pub data: Option<Document>,
}

impl Snapshot {
    /// Snapshot of an existing document
    pub fn of(data: Document) -> Self {
        Self { data: Some(data) }
    }

    /// Snapshot indicating the document does not exist
    pub fn absent() -> Self {
        Self { data: None }
    }

    /// Whether the document existed at delivery time
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }
}

/// Callback receiving snapshot deliveries from a live subscription
pub type SnapshotCallback = Arc<dyn Fn(Snapshot) + Send + Sync>;

/// Callback receiving identity-change notifications
pub type IdentityCallback = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// Cancellation guard for a platform subscription or store observer
///
/// Cancelling (explicitly or by drop) is synchronous: once it returns,
/// the underlying callback will not be invoked again.
#[must_use = "dropping an Unsubscribe cancels the subscription immediately"]
pub struct Unsubscribe {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Unsubscribe {
    /// Wrap a cancellation closure
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A guard that does nothing when cancelled
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Cancel the subscription now
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Auth provider interface consumed by the session store
pub trait AuthProvider: Send + Sync {
    /// Synchronous snapshot of the currently authenticated identity
    fn current_identity(&self) -> Option<Identity>;

    /// Register for identity-change notifications
    ///
    /// The callback receives every subsequent identity replacement until
    /// the returned guard is cancelled.
    fn on_identity_change(&self, callback: IdentityCallback) -> Unsubscribe;
}

/// Document database interface consumed by stores and the resolver
#[async_trait]
pub trait DocumentDatabase: Send + Sync {
    /// Open a live subscription to a single document position
    ///
    /// Registration returns immediately; deliveries arrive through the
    /// callback in platform emission order. Malformed locators surface
    /// as a platform-level failure on the first subscription attempt
    /// (logged, no deliveries). The returned guard cancels the
    /// subscription synchronously.
    fn watch_document(&self, locator: &str, on_snapshot: SnapshotCallback) -> Unsubscribe;

    /// One-shot read of a document
    async fn read_document(&self, locator: &str) -> Result<Option<Document>>;

    /// Write (create or replace) a document
    async fn write_document(&self, locator: &str, data: Document) -> Result<()>;

    /// Delete a document
    async fn delete_document(&self, locator: &str) -> Result<()>;

    /// Query a collection for documents where `field` equals `value`
    ///
    /// Returns at most `limit` matching documents. Equality is exact,
    /// no fuzzy matching.
    async fn query_collection(
        &self,
        collection: &str,
        field: &str,
        value: Bson,
        limit: i64,
    ) -> Result<Vec<Document>>;
}

/// Stable handle for direct reads/writes against one locator
///
/// Bypasses the reactive layer entirely; handed out by the document
/// store factory alongside the reactive value.
#[derive(Clone)]
pub struct DocumentRef {
    db: Arc<dyn DocumentDatabase>,
    locator: String,
}

impl DocumentRef {
    /// Create a handle over the given locator
    pub fn new(db: Arc<dyn DocumentDatabase>, locator: impl Into<String>) -> Self {
        Self {
            db,
            locator: locator.into(),
        }
    }

    /// The full locator this handle addresses
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// The locator's terminal identifier segment
    pub fn id(&self) -> &str {
        terminal_segment(&self.locator)
    }

    /// Read the document's current content
    pub async fn get(&self) -> Result<Option<Document>> {
        self.db.read_document(&self.locator).await
    }

    /// Create or replace the document
    pub async fn set(&self, data: Document) -> Result<()> {
        self.db.write_document(&self.locator, data).await
    }

    /// Delete the document
    pub async fn delete(&self) -> Result<()> {
        self.db.delete_document(&self.locator).await
    }
}

impl std::fmt::Debug for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRef")
            .field("locator", &self.locator)
            .finish()
    }
}

/// The terminal identifier segment of a locator
pub fn terminal_segment(locator: &str) -> &str {
    locator.rsplit('/').next().unwrap_or(locator)
}

/// Split a locator into (collection, document id)
///
/// Locators alternate collection and id segments
/// (`users/alice`, `teams/t1/members/m2`). The terminal segment is the
/// document id; the preceding segments, joined with '.', name the
/// collection.
pub fn split_locator(locator: &str) -> Result<(String, String)> {
    let segments: Vec<&str> = locator.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 || segments.len() % 2 != 0 {
        return Err(LivebindError::Locator(locator.to_string()));
    }
    let id = segments[segments.len() - 1].to_string();
    let collection = segments[..segments.len() - 1].join(".");
    Ok((collection, id))
}
