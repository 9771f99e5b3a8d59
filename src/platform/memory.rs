//! In-memory document platform
//!
//! A [`DocumentDatabase`] backed by process-local maps, used for tests
//! and local development. Mutations notify watchers serially in the
//! caller's context, so delivery order per subscription matches
//! mutation order.

use async_trait::async_trait;
use bson::{Bson, Document};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::{split_locator, DocumentDatabase, Snapshot, SnapshotCallback, Unsubscribe};
use crate::types::Result;

type WatcherSet = Arc<DashMap<u64, SnapshotCallback>>;

/// In-memory document table with live watchers
#[derive(Default)]
pub struct MemoryPlatform {
    documents: DashMap<String, Document>,
    watchers: DashMap<String, WatcherSet>,
    next_id: AtomicU64,
}

impl MemoryPlatform {
    /// Create an empty platform
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a document, notifying its watchers
    pub fn put(&self, locator: &str, data: Document) {
        self.documents.insert(locator.to_string(), data.clone());
        self.notify(locator, Snapshot::of(data));
    }

    /// Delete a document, notifying its watchers with an absent snapshot
    pub fn delete(&self, locator: &str) {
        self.documents.remove(locator);
        self.notify(locator, Snapshot::absent());
    }

    /// Number of live watchers on a locator
    pub fn watcher_count(&self, locator: &str) -> usize {
        self.watchers
            .get(locator)
            .map(|set| set.len())
            .unwrap_or(0)
    }

    fn notify(&self, locator: &str, snapshot: Snapshot) {
        let callbacks: Vec<SnapshotCallback> = match self.watchers.get(locator) {
            Some(set) => set.iter().map(|entry| Arc::clone(entry.value())).collect(),
            None => return,
        };
        debug!(locator, watchers = callbacks.len(), exists = snapshot.exists(), "snapshot delivery");
        for callback in callbacks {
            callback(snapshot.clone());
        }
    }
}

#[async_trait]
impl DocumentDatabase for MemoryPlatform {
    fn watch_document(&self, locator: &str, on_snapshot: SnapshotCallback) -> Unsubscribe {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let set = self
            .watchers
            .entry(locator.to_string())
            .or_default()
            .clone();
        set.insert(id, Arc::clone(&on_snapshot));

        // Initial delivery reflecting the document's current state
        let initial = match self.documents.get(locator) {
            Some(doc) => Snapshot::of(doc.value().clone()),
            None => Snapshot::absent(),
        };
        on_snapshot(initial);

        Unsubscribe::new(move || {
            set.remove(&id);
        })
    }

    async fn read_document(&self, locator: &str) -> Result<Option<Document>> {
        Ok(self.documents.get(locator).map(|doc| doc.value().clone()))
    }

    async fn write_document(&self, locator: &str, data: Document) -> Result<()> {
        self.put(locator, data);
        Ok(())
    }

    async fn delete_document(&self, locator: &str) -> Result<()> {
        self.delete(locator);
        Ok(())
    }

    async fn query_collection(
        &self,
        collection: &str,
        field: &str,
        value: Bson,
        limit: i64,
    ) -> Result<Vec<Document>> {
        let mut matches = Vec::new();
        for entry in self.documents.iter() {
            if matches.len() as i64 >= limit {
                break;
            }
            let Ok((entry_collection, _)) = split_locator(entry.key()) else {
                continue;
            };
            if entry_collection != collection {
                continue;
            }
            if entry.value().get(field) == Some(&value) {
                matches.push(entry.value().clone());
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_query_matches_field_equality() {
        let platform = MemoryPlatform::new();
        platform.put("users/a", doc! { "username": "alice", "published": true });
        platform.put("users/b", doc! { "username": "bob", "published": false });

        let hits = platform
            .query_collection("users", "username", Bson::String("alice".into()), 1)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].get_str("username").unwrap(), "alice");

        // Case-sensitive equality, no fuzzy matching
        let misses = platform
            .query_collection("users", "username", Bson::String("Alice".into()), 1)
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn test_watch_delivers_initial_and_mutations() {
        let platform = MemoryPlatform::new();
        let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);

        let sub = platform.watch_document(
            "users/a",
            Arc::new(move |snapshot| seen2.lock().unwrap().push(snapshot.exists())),
        );
        platform.put("users/a", doc! { "username": "alice" });
        platform.delete("users/a");

        assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
        assert_eq!(platform.watcher_count("users/a"), 1);
        sub.cancel();
        assert_eq!(platform.watcher_count("users/a"), 0);

        // Cancelled watchers see nothing further
        platform.put("users/a", doc! { "username": "alice" });
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_direct_read_write_delete() {
        let platform = MemoryPlatform::new();
        platform
            .write_document("users/a", doc! { "bio": "hi" })
            .await
            .unwrap();
        let read = platform.read_document("users/a").await.unwrap();
        assert_eq!(read.unwrap().get_str("bio").unwrap(), "hi");

        platform.delete_document("users/a").await.unwrap();
        assert_eq!(platform.read_document("users/a").await.unwrap(), None);
    }
}
