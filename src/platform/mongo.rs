//! MongoDB-backed document platform
//!
//! Implements [`DocumentDatabase`] over a MongoDB deployment: change
//! streams drive live document subscriptions, plain queries back the
//! one-shot resolver and the direct-access handle.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures_util::StreamExt;
use mongodb::change_stream::event::OperationType;
use mongodb::options::{ClientOptions, Credential, FullDocumentType};
use mongodb::{Client, Collection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{split_locator, DocumentDatabase, Snapshot, SnapshotCallback, Unsubscribe};
use crate::config::PlatformArgs;
use crate::types::{LivebindError, Result};

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoPlatform {
    client: Client,
    db_name: String,
}

impl MongoPlatform {
    /// Connect and verify the deployment is reachable
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Bounded server selection so an unreachable deployment fails
        // fast instead of hanging
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| LivebindError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        Self::verify(client, db_name).await
    }

    /// Connect using client-side platform configuration
    pub async fn from_args(args: &PlatformArgs) -> Result<Self> {
        Self::connect(&args.database_url, &args.project_id).await
    }

    /// Connect with explicit service-account credentials
    pub async fn connect_with_credentials(
        uri: &str,
        db_name: &str,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        info!("Connecting to MongoDB at {} as {}", uri, username);

        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| LivebindError::Database(format!("Invalid MongoDB URI: {}", e)))?;
        options.credential = Some(
            Credential::builder()
                .username(username.to_string())
                .password(password.to_string())
                .build(),
        );

        let client = Client::with_options(options)
            .map_err(|e| LivebindError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        Self::verify(client, db_name).await
    }

    async fn verify(client: Client, db_name: &str) -> Result<Self> {
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| LivebindError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.client.database(&self.db_name).collection(name)
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

#[async_trait]
impl DocumentDatabase for MongoPlatform {
    fn watch_document(&self, locator: &str, on_snapshot: SnapshotCallback) -> Unsubscribe {
        let (collection, id) = match split_locator(locator) {
            Ok(split) => split,
            Err(e) => {
                // Malformed locators surface here, on the first
                // subscription attempt; the subscription stays silent.
                error!(locator, error = %e, "cannot watch document");
                return Unsubscribe::noop();
            }
        };

        let coll = self.collection(&collection);
        let live = Arc::new(AtomicBool::new(true));

        let task_live = Arc::clone(&live);
        let task_locator = locator.to_string();
        let handle = tokio::spawn(async move {
            let deliver = |snapshot: Snapshot| {
                // Checked immediately before invocation: once the guard
                // cancels, nothing further reaches the callback.
                if task_live.load(Ordering::Acquire) {
                    on_snapshot(snapshot);
                }
            };

            // Initial snapshot, then the ordered event stream
            match coll.find_one(doc! { "_id": &id }).await {
                Ok(Some(document)) => deliver(Snapshot::of(document)),
                Ok(None) => deliver(Snapshot::absent()),
                Err(e) => {
                    error!(locator = %task_locator, error = %e, "initial document read failed");
                    return;
                }
            }

            let pipeline = vec![doc! { "$match": { "documentKey._id": &id } }];
            let mut stream = match coll
                .watch()
                .pipeline(pipeline)
                .full_document(FullDocumentType::UpdateLookup)
                .await
            {
                Ok(stream) => stream,
                Err(e) => {
                    error!(locator = %task_locator, error = %e, "change stream open failed");
                    return;
                }
            };

            while let Some(event) = stream.next().await {
                match event {
                    Ok(event) => {
                        let snapshot = match event.operation_type {
                            OperationType::Delete => Snapshot::absent(),
                            _ => event
                                .full_document
                                .map(Snapshot::of)
                                .unwrap_or_else(Snapshot::absent),
                        };
                        deliver(snapshot);
                    }
                    Err(e) => {
                        // Mid-stream failures are the platform's
                        // concern; stop updating until redelivery.
                        warn!(locator = %task_locator, error = %e, "change stream interrupted");
                        break;
                    }
                }
            }
        });

        Unsubscribe::new(move || {
            live.store(false, Ordering::Release);
            handle.abort();
        })
    }

    async fn read_document(&self, locator: &str) -> Result<Option<Document>> {
        let (collection, id) = split_locator(locator)?;
        self.collection(&collection)
            .find_one(doc! { "_id": &id })
            .await
            .map_err(|e| LivebindError::Database(format!("Find failed: {}", e)))
    }

    async fn write_document(&self, locator: &str, data: Document) -> Result<()> {
        let (collection, id) = split_locator(locator)?;
        self.collection(&collection)
            .replace_one(doc! { "_id": &id }, data)
            .upsert(true)
            .await
            .map_err(|e| LivebindError::Database(format!("Write failed: {}", e)))?;
        Ok(())
    }

    async fn delete_document(&self, locator: &str) -> Result<()> {
        let (collection, id) = split_locator(locator)?;
        self.collection(&collection)
            .delete_one(doc! { "_id": &id })
            .await
            .map_err(|e| LivebindError::Database(format!("Delete failed: {}", e)))?;
        Ok(())
    }

    async fn query_collection(
        &self,
        collection: &str,
        field: &str,
        value: Bson,
        limit: i64,
    ) -> Result<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .find(doc! { field: value })
            .limit(limit)
            .await
            .map_err(|e| LivebindError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<Document> = cursor
            .filter_map(|document| async {
                match document {
                    Ok(document) => Some(document),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }
}
