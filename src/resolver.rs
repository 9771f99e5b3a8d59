//! Public profile resolver
//!
//! One-shot, server-executed lookup of a public profile by username.
//! Runs outside the reactive graph: one awaited query per incoming
//! page request, no subscription.

use bson::Bson;
use hyper::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::platform::DocumentDatabase;
use crate::store::profile::{LinkEntry, ProfileRecord, USER_COLLECTION};
use crate::types::LivebindError;

/// Failure modes of a profile resolution
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No document matches the requested username
    #[error("that user does not exist!")]
    NotFound,

    /// The profile exists but is not published
    #[error("The profile of @{username} is not public!")]
    Forbidden {
        /// Username from the matched document
        username: String,
    },

    /// The query itself failed
    #[error("profile lookup failed: {0}")]
    Database(#[from] LivebindError),
}

impl ResolveError {
    /// HTTP status class for the page layer
    pub fn status(&self) -> StatusCode {
        match self {
            ResolveError::NotFound => StatusCode::NOT_FOUND,
            ResolveError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ResolveError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Raw profile document shape used for the visibility check
///
/// Absent `published` deserializes to `false`: an unset flag means
/// private (default-deny).
#[derive(Debug, Deserialize)]
struct ProfileDoc {
    #[serde(default)]
    username: String,
    #[serde(default)]
    published: bool,
    #[serde(default)]
    bio: String,
    #[serde(rename = "photoURL", default)]
    photo_url: String,
    #[serde(default)]
    links: Vec<LinkEntry>,
}

/// One-shot resolver over the users collection
pub struct ProfileResolver {
    db: Arc<dyn DocumentDatabase>,
}

impl ProfileResolver {
    /// Create a resolver over the given database handle
    pub fn new(db: Arc<dyn DocumentDatabase>) -> Self {
        Self { db }
    }

    /// Resolve a public profile by username
    ///
    /// Queries for exactly one document whose `username` field equals
    /// `identifier` (case-sensitive). If several documents match (an
    /// upstream integrity violation) only the first query result is
    /// used. Returns the public projection, with `links` defaulting to
    /// empty when the document carries none.
    pub async fn resolve(&self, identifier: &str) -> Result<ProfileRecord, ResolveError> {
        let matches = self
            .db
            .query_collection(
                USER_COLLECTION,
                "username",
                Bson::String(identifier.to_string()),
                1,
            )
            .await?;

        let Some(document) = matches.into_iter().next() else {
            return Err(ResolveError::NotFound);
        };

        // Validation boundary: the raw document is parsed, not cast
        let profile: ProfileDoc =
            bson::from_document(document).map_err(|e| LivebindError::Database(e.to_string()))?;

        if !profile.published {
            return Err(ResolveError::Forbidden {
                username: profile.username,
            });
        }

        Ok(ProfileRecord {
            username: profile.username,
            bio: profile.bio,
            photo_url: profile.photo_url,
            links: profile.links,
        })
    }
}

/// Typed HTTP-style failure handed to the page-rendering layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageError {
    /// 404 or 403 for resolution failures, 500 for transport failures
    pub status: StatusCode,
    /// Human-readable message for the error page
    pub message: String,
}

impl PageError {
    /// JSON body for routing layers that render errors as JSON
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "status": self.status.as_u16(),
            "message": self.message,
        })
        .to_string()
    }
}

impl From<ResolveError> for PageError {
    fn from(err: ResolveError) -> Self {
        Self {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for PageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

/// Load operation invoked by the routing layer with the route's
/// username parameter
pub async fn load_profile(
    db: Arc<dyn DocumentDatabase>,
    username: &str,
) -> Result<ProfileRecord, PageError> {
    let resolver = ProfileResolver::new(db);
    resolver.resolve(username).await.map_err(PageError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::MemoryPlatform;
    use bson::doc;

    fn platform() -> Arc<MemoryPlatform> {
        Arc::new(MemoryPlatform::new())
    }

    #[tokio::test]
    async fn test_published_profile_resolves_to_projection() {
        let platform = platform();
        platform.put(
            "users/a",
            doc! { "username": "alice", "published": true, "bio": "hi", "photoURL": "x", "links": [] },
        );

        let resolver = ProfileResolver::new(platform);
        let profile = resolver.resolve("alice").await.unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.bio, "hi");
        assert_eq!(profile.photo_url, "x");
        assert!(profile.links.is_empty());
    }

    #[tokio::test]
    async fn test_links_default_to_empty_when_omitted() {
        let platform = platform();
        platform.put(
            "users/a",
            doc! { "username": "alice", "published": true, "bio": "hi", "photoURL": "x" },
        );

        let resolver = ProfileResolver::new(platform);
        let profile = resolver.resolve("alice").await.unwrap();
        assert_eq!(profile.links, Vec::new());
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let resolver = ProfileResolver::new(platform());
        let err = resolver.resolve("ghost").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound));
        assert_eq!(err.to_string(), "that user does not exist!");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unpublished_profile_is_forbidden() {
        let platform = platform();
        platform.put("users/b", doc! { "username": "bob", "published": false });

        let resolver = ProfileResolver::new(platform);
        let err = resolver.resolve("bob").await.unwrap_err();
        assert_eq!(err.to_string(), "The profile of @bob is not public!");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_absent_published_flag_means_private() {
        let platform = platform();
        platform.put("users/c", doc! { "username": "carol", "bio": "hi" });

        let resolver = ProfileResolver::new(platform);
        let err = resolver.resolve("carol").await.unwrap_err();
        assert!(matches!(err, ResolveError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_username_match_is_case_sensitive() {
        let platform = platform();
        platform.put("users/a", doc! { "username": "alice", "published": true });

        let resolver = ProfileResolver::new(platform);
        assert!(matches!(
            resolver.resolve("Alice").await.unwrap_err(),
            ResolveError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_load_profile_maps_to_page_error() {
        let platform = platform();
        platform.put("users/b", doc! { "username": "bob", "published": false });

        let err = load_profile(platform.clone(), "bob").await.unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.message, "The profile of @bob is not public!");
        assert_eq!(
            err.to_json(),
            r#"{"message":"The profile of @bob is not public!","status":403}"#
        );

        let err = load_profile(platform, "ghost").await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "that user does not exist!");
    }
}
