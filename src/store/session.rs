//! Session store
//!
//! Exposes the currently authenticated identity as a reactive value.

use std::sync::Arc;
use tracing::warn;

use crate::platform::{AuthProvider, Identity};
use crate::store::Store;

/// Reactive value of the current identity, or `None` when signed out
///
/// With no auth provider (the host environment cannot support one) the
/// store permanently settles to `None` and never opens a subscription —
/// a degraded mode for this instance, not a retryable error.
///
/// Otherwise, activation seeds the value with the provider's synchronous
/// identity snapshot and forwards every identity-change notification
/// until the last observer detaches. Observers only ever see "some
/// identity" or "none", never an error.
pub fn session_store(auth: Option<Arc<dyn AuthProvider>>) -> Store<Option<Identity>> {
    let Some(auth) = auth else {
        warn!("auth provider unavailable, session store settles to none");
        return Store::inert(None);
    };

    Store::new(None, move |set| {
        set.set(auth.current_identity());
        let listener = auth.on_identity_change(Arc::new(move |identity| {
            set.set(identity);
        }));
        Some(listener)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::auth::AuthBridge;
    use std::sync::Mutex;

    #[test]
    fn test_no_provider_settles_to_none() {
        let store = session_store(None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let _sub = store.subscribe(move |v| seen2.lock().unwrap().push(v));

        assert_eq!(*seen.lock().unwrap(), vec![None]);
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_seeds_from_provider_snapshot() {
        let auth = Arc::new(AuthBridge::new());
        auth.set_identity(Some(Identity::with_uid("u1")));

        let store = session_store(Some(auth));
        let _sub = store.subscribe(|_| {});
        assert_eq!(store.get().map(|i| i.uid), Some("u1".to_string()));
    }

    #[test]
    fn test_forwards_identity_changes() {
        let auth = Arc::new(AuthBridge::new());
        let store = session_store(Some(auth.clone()));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let _sub = store.subscribe(move |v: Option<Identity>| {
            seen2.lock().unwrap().push(v.map(|i| i.uid));
        });

        auth.set_identity(Some(Identity::with_uid("u1")));
        auth.set_identity(None);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("u1".to_string()), None]
        );
    }

    #[test]
    fn test_no_updates_after_deactivation() {
        let auth = Arc::new(AuthBridge::new());
        let store = session_store(Some(auth.clone()));

        let sub = store.subscribe(|_| {});
        auth.set_identity(Some(Identity::with_uid("u1")));
        sub.cancel();

        // Provider identity keeps changing; the store must not follow
        auth.set_identity(Some(Identity::with_uid("u2")));
        assert_eq!(store.get().map(|i| i.uid), Some("u1".to_string()));
        assert_eq!(auth.listener_count(), 0, "listener must be removed");
    }
}
