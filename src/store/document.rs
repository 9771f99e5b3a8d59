//! Document store factory
//!
//! Turns a document locator into a reactive value that tracks the
//! document's latest content, alongside a direct-access handle.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

use crate::platform::{terminal_segment, DocumentDatabase, DocumentRef, Snapshot};
use crate::store::Store;

/// Reactive document binding produced by [`document_store`]
pub struct DocumentStore<T> {
    /// Current document content, or `None` while absent
    pub store: Store<Option<T>>,
    /// Handle for direct reads/writes against the same locator
    pub reference: DocumentRef,
    /// The locator's terminal identifier segment
    pub id: String,
}

/// Create a reactive value tracking one document position
///
/// Each call produces an independent store with its own subscription;
/// instances over the same locator are not de-duplicated. Activation
/// opens a live watch on the locator and every delivered snapshot
/// replaces the value: the deserialized content when the document
/// exists, `None` otherwise. Observers see `None` until the first
/// snapshot arrives. Deactivation cancels the watch synchronously and
/// in-flight deliveries are dropped.
///
/// A snapshot that exists but fails to deserialize into `T` is logged
/// and treated as absent rather than surfaced as an error.
pub fn document_store<T>(db: Arc<dyn DocumentDatabase>, locator: &str) -> DocumentStore<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let id = terminal_segment(locator).to_string();
    let reference = DocumentRef::new(Arc::clone(&db), locator);
    let locator = locator.to_string();

    let store = Store::new(None, move |set| {
        // Fresh activation starts from absent; no synchronous read
        set.set(None);
        let locator_for_log = locator.clone();
        let watch = db.watch_document(
            &locator,
            Arc::new(move |snapshot: Snapshot| {
                let value = snapshot.data.and_then(|doc| {
                    match bson::from_document::<T>(doc) {
                        Ok(parsed) => Some(parsed),
                        Err(e) => {
                            warn!(locator = %locator_for_log, error = %e, "document failed validation, treating as absent");
                            None
                        }
                    }
                });
                set.set(value);
            }),
        );
        Some(watch)
    });

    DocumentStore {
        store,
        reference,
        id,
    }
}
