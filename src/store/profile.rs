//! Profile schema and the derived profile store
//!
//! The profile record is a projection of a `users/<uid>` document.
//! Field names follow the wire format (camelCase); serde defaults let
//! partially-filled documents parse instead of failing wholesale.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::platform::{AuthProvider, DocumentDatabase};
use crate::store::document::document_store;
use crate::store::session::session_store;
use crate::store::{derived, Store};

/// Collection holding user profile documents
pub const USER_COLLECTION: &str = "users";

/// One entry in a profile's ordered link list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LinkEntry {
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Target URL
    #[serde(default)]
    pub url: String,
    /// Optional icon name or URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Public projection of a user profile document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProfileRecord {
    /// Unique handle, matched case-sensitively by the resolver
    #[serde(default)]
    pub username: String,
    /// Free-form biography text
    #[serde(default)]
    pub bio: String,
    /// Avatar URL
    #[serde(rename = "photoURL", default)]
    pub photo_url: String,
    /// Ordered link list, empty when the document carries none
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

/// The locator of an identity's profile document
pub fn profile_locator(uid: &str) -> String {
    format!("{}/{}", USER_COLLECTION, uid)
}

/// Reactive value of the authenticated user's own profile
///
/// Composes the session store with a per-identity document store:
/// while unauthenticated the value is `None` and no document
/// subscription exists; once an identity arrives, its `users/<uid>`
/// document is tracked and forwarded verbatim. Every identity
/// transition releases the previous document subscription before
/// creating the next, so a replaced identity's snapshots can never
/// leak into the new session. Absence of identity and absence of the
/// document both read as `None`, never as an error.
pub fn profile_store(
    auth: Option<Arc<dyn AuthProvider>>,
    db: Arc<dyn DocumentDatabase>,
) -> Store<Option<ProfileRecord>> {
    let session = session_store(auth);
    derived(session, None, move |identity, set| match identity {
        Some(identity) => {
            let binding = document_store::<ProfileRecord>(
                Arc::clone(&db),
                &profile_locator(&identity.uid),
            );
            let set = set.clone();
            Some(binding.store.subscribe(move |record| set.set(record)))
        }
        None => {
            set.set(None);
            None
        }
    })
}
