//! Livebind - live document bindings for reactive UIs
//!
//! A thin data-binding layer between a hosted document database/auth
//! platform and a reactive UI. Remote documents and the authenticated
//! identity surface as reactive values that activate on their first
//! observer and release their platform subscription when the last
//! observer detaches; a server-side resolver answers public profile
//! lookups with typed 404/403 failures.
//!
//! ## Components
//!
//! - **Store**: observable container with subscribe/unsubscribe lifecycle
//! - **Session store**: current authenticated identity, or none
//! - **Document store**: live view of one document position, plus a
//!   direct-access handle
//! - **Profile store**: the signed-in user's own profile document,
//!   derived from the session
//! - **Resolver**: one-shot public profile lookup by username
//! - **Platform**: injected auth/database seams with in-memory and
//!   MongoDB backends

pub mod config;
pub mod logging;
pub mod platform;
pub mod resolver;
pub mod store;
pub mod types;

pub use platform::{AuthProvider, DocumentDatabase, DocumentRef, Identity, Snapshot, Unsubscribe};
pub use resolver::{load_profile, PageError, ProfileResolver, ResolveError};
pub use store::document::{document_store, DocumentStore};
pub use store::profile::{profile_store, LinkEntry, ProfileRecord};
pub use store::session::session_store;
pub use store::{derived, Setter, Store};
pub use types::{LivebindError, Result};
