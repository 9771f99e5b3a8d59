//! In-process auth provider bridge
//!
//! The credential-issuing provider itself is an external collaborator;
//! the host application forwards its auth-state notifications into an
//! [`AuthBridge`], which fans them out to session-store listeners.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::{AuthProvider, Identity, IdentityCallback, Unsubscribe};

/// Listener registry implementing [`AuthProvider`]
///
/// Holds the current identity and a set of change listeners.
/// Notifications are dispatched serially in the caller's context.
pub struct AuthBridge {
    current: Mutex<Option<Identity>>,
    listeners: Arc<DashMap<u64, IdentityCallback>>,
    next_id: AtomicU64,
}

impl AuthBridge {
    /// Create a bridge with no authenticated identity
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            listeners: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Replace the current identity and notify all listeners
    ///
    /// Called by the host whenever the external provider reports an
    /// auth-state change (sign-in, sign-out, token-driven replacement).
    pub fn set_identity(&self, identity: Option<Identity>) {
        *self.current.lock().expect("auth lock poisoned") = identity.clone();

        let callbacks: Vec<IdentityCallback> = self
            .listeners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        debug!(
            listeners = callbacks.len(),
            authenticated = identity.is_some(),
            "identity replaced"
        );

        for callback in callbacks {
            callback(identity.clone());
        }
    }

    /// Number of registered change listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for AuthBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for AuthBridge {
    fn current_identity(&self) -> Option<Identity> {
        self.current.lock().expect("auth lock poisoned").clone()
    }

    fn on_identity_change(&self, callback: IdentityCallback) -> Unsubscribe {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, callback);

        let listeners = Arc::clone(&self.listeners);
        Unsubscribe::new(move || {
            listeners.remove(&id);
        })
    }
}
