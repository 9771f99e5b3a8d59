//! Reactive value containers
//!
//! A [`Store`] holds a current value and a set of observers. It is
//! push-based with an explicit lifecycle: the first observer activates
//! the store (running its start closure, which may open one upstream
//! subscription), the last observer's departure deactivates it (running
//! the teardown). At most one upstream subscription is live per store
//! instance at any time; re-activation after full deactivation
//! establishes a fresh one.
//!
//! Writes go through a [`Setter`] handed to the start closure. Each
//! activation gets its own epoch; deactivation bumps the epoch, so a
//! late write from a torn-down subscription is silently dropped instead
//! of resurrecting the store (no zombie updates).

pub mod document;
pub mod profile;
pub mod session;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tracing::trace;

use crate::platform::Unsubscribe;

/// Observer callback invoked with each value replacement
type Observer<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Start closure run on activation; may return a teardown guard
type StartFn<T> = Box<dyn Fn(Setter<T>) -> Option<Unsubscribe> + Send + Sync>;

struct StoreState<T> {
    value: T,
    observers: HashMap<u64, Observer<T>>,
    next_id: u64,
    /// Bumped on every deactivation; writes from older epochs are inert
    epoch: u64,
    /// True once the start closure has returned for the current epoch
    active: bool,
    teardown: Option<Unsubscribe>,
}

struct StoreInner<T> {
    state: Mutex<StoreState<T>>,
    start: Option<StartFn<T>>,
}

/// Observable container with activation-on-subscribe lifecycle
pub struct Store<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    /// Create a store that activates via `start` on its first observer
    pub fn new(initial: T, start: impl Fn(Setter<T>) -> Option<Unsubscribe> + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState {
                    value: initial,
                    observers: HashMap::new(),
                    next_id: 0,
                    epoch: 0,
                    active: false,
                    teardown: None,
                }),
                start: Some(Box::new(start)),
            }),
        }
    }

    /// Create a store that never changes its value
    ///
    /// Used for permanent degraded modes: observers always see `initial`
    /// and no upstream subscription is ever opened.
    pub fn inert(initial: T) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState {
                    value: initial,
                    observers: HashMap::new(),
                    next_id: 0,
                    epoch: 0,
                    active: false,
                    teardown: None,
                }),
                start: None,
            }),
        }
    }

    /// Snapshot of the current value
    pub fn get(&self) -> T {
        self.inner
            .state
            .lock()
            .expect("store lock poisoned")
            .value
            .clone()
    }

    /// Number of attached observers
    pub fn observer_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .expect("store lock poisoned")
            .observers
            .len()
    }

    /// Attach an observer
    ///
    /// The observer is invoked immediately with the current value (after
    /// activation, if this is the first observer) and again on every
    /// replacement until the returned guard is cancelled. Cancelling the
    /// final observer tears down the upstream subscription synchronously.
    pub fn subscribe(&self, observer: impl Fn(T) + Send + Sync + 'static) -> Unsubscribe {
        let observer: Observer<T> = Arc::new(observer);

        let (id, activate, epoch) = {
            let mut state = self.inner.state.lock().expect("store lock poisoned");
            let id = state.next_id;
            state.next_id += 1;
            state.observers.insert(id, Arc::clone(&observer));
            let activate = state.observers.len() == 1 && self.inner.start.is_some();
            (id, activate, state.epoch)
        };

        if activate {
            trace!(epoch, "store activating");
            let setter = Setter {
                inner: Arc::downgrade(&self.inner),
                epoch,
            };
            // Writes during the start call update the value without
            // notifying; the initial delivery below carries the result.
            let teardown = self.inner.start.as_ref().and_then(|start| start(setter));

            let mut state = self.inner.state.lock().expect("store lock poisoned");
            if state.epoch == epoch && !state.observers.is_empty() {
                state.active = true;
                state.teardown = teardown;
            } else if let Some(teardown) = teardown {
                // Observer left during activation; tear down immediately
                drop(state);
                teardown.cancel();
            }
        }

        // Initial delivery with the (possibly seeded) current value
        let current = {
            let state = self.inner.state.lock().expect("store lock poisoned");
            if !state.observers.contains_key(&id) {
                None
            } else {
                Some(state.value.clone())
            }
        };
        if let Some(value) = current {
            observer(value);
        }

        // The guard holds a strong reference: attached observers keep
        // the store (and its upstream subscription) alive.
        let inner = Arc::clone(&self.inner);
        Unsubscribe::new(move || detach(&inner, id))
    }
}

/// Remove an observer and deactivate at zero
fn detach<T>(inner: &Arc<StoreInner<T>>, id: u64) {
    let teardown = {
        let mut state = inner.state.lock().expect("store lock poisoned");
        if state.observers.remove(&id).is_none() {
            return;
        }
        if state.observers.is_empty() && state.active {
            // Bump the epoch before teardown so in-flight deliveries
            // from the old subscription can no longer land.
            state.epoch += 1;
            state.active = false;
            trace!(epoch = state.epoch, "store deactivating");
            state.teardown.take()
        } else {
            None
        }
    };
    drop(teardown);
}

/// Write handle bound to one activation of a store
///
/// Writes from a stale epoch (after the activation that produced this
/// setter has been torn down) are dropped.
pub struct Setter<T> {
    inner: Weak<StoreInner<T>>,
    epoch: u64,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
            epoch: self.epoch,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Setter<T> {
    /// Replace the store's value, notifying observers
    pub fn set(&self, value: T) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };

        let observers: Vec<Observer<T>> = {
            let mut state = inner.state.lock().expect("store lock poisoned");
            if state.epoch != self.epoch {
                trace!(
                    write_epoch = self.epoch,
                    store_epoch = state.epoch,
                    "dropping stale store write"
                );
                return;
            }
            state.value = value.clone();
            if !state.active {
                // Mid-activation: record the value, initial delivery
                // will surface it.
                return;
            }
            state.observers.values().cloned().collect()
        };

        // Observers run outside the lock, in registration-arbitrary order
        for observer in observers {
            observer(value.clone());
        }
    }
}

/// Derive a read-only store from an upstream store
///
/// `recompute` runs for every upstream value with a setter for the
/// derived value; it may open a downstream subscription and return its
/// guard. The previous guard is always cancelled before `recompute` runs
/// again (sequenced teardown-then-setup), and both the upstream
/// subscription and any live downstream guard are released when the
/// derived store deactivates.
pub fn derived<U, T, F>(source: Store<U>, initial: T, recompute: F) -> Store<T>
where
    U: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    F: Fn(U, &Setter<T>) -> Option<Unsubscribe> + Send + Sync + 'static,
{
    let recompute = Arc::new(recompute);
    Store::new(initial, move |set: Setter<T>| {
        let downstream: Arc<Mutex<Option<Unsubscribe>>> = Arc::new(Mutex::new(None));

        let upstream = {
            let recompute = Arc::clone(&recompute);
            let downstream = Arc::clone(&downstream);
            source.subscribe(move |value| {
                let previous = downstream
                    .lock()
                    .expect("derived lock poisoned")
                    .take();
                if let Some(previous) = previous {
                    previous.cancel();
                }
                let next = recompute(value, &set);
                *downstream.lock().expect("derived lock poisoned") = next;
            })
        };

        Some(Unsubscribe::new(move || {
            upstream.cancel();
            let inner = downstream.lock().expect("derived lock poisoned").take();
            if let Some(inner) = inner {
                inner.cancel();
            }
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscribe_receives_current_value() {
        let store = Store::new(7u32, |_| None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let sub = store.subscribe(move |v| seen2.lock().unwrap().push(v));
        assert_eq!(*seen.lock().unwrap(), vec![7]);
        sub.cancel();
    }

    #[test]
    fn test_start_runs_once_per_activation() {
        let starts = Arc::new(AtomicUsize::new(0));
        let starts2 = Arc::clone(&starts);
        let store = Store::new(0u32, move |_| {
            starts2.fetch_add(1, Ordering::SeqCst);
            None
        });

        let a = store.subscribe(|_| {});
        let b = store.subscribe(|_| {});
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        a.cancel();
        b.cancel();
        let c = store.subscribe(|_| {});
        assert_eq!(starts.load(Ordering::SeqCst), 2);
        c.cancel();
    }

    #[test]
    fn test_teardown_at_zero_observers() {
        let torn = Arc::new(AtomicUsize::new(0));
        let torn2 = Arc::clone(&torn);
        let store = Store::new(0u32, move |_| {
            let torn = Arc::clone(&torn2);
            Some(Unsubscribe::new(move || {
                torn.fetch_add(1, Ordering::SeqCst);
            }))
        });

        let a = store.subscribe(|_| {});
        let b = store.subscribe(|_| {});
        a.cancel();
        assert_eq!(torn.load(Ordering::SeqCst), 0, "one observer still attached");
        b.cancel();
        assert_eq!(torn.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let slot: Arc<Mutex<Option<Setter<u32>>>> = Arc::new(Mutex::new(None));
        let slot2 = Arc::clone(&slot);
        let store = Store::new(0u32, move |set| {
            *slot2.lock().unwrap() = Some(set);
            None
        });

        let _sub = store.subscribe(|_| {});
        let set = slot.lock().unwrap().clone().unwrap();
        set.set(1);
        set.set(2);
        set.set(3);
        assert_eq!(store.get(), 3);
    }

    #[test]
    fn test_stale_setter_is_inert_after_deactivation() {
        let slot: Arc<Mutex<Option<Setter<u32>>>> = Arc::new(Mutex::new(None));
        let slot2 = Arc::clone(&slot);
        let store = Store::new(0u32, move |set| {
            *slot2.lock().unwrap() = Some(set);
            None
        });

        let sub = store.subscribe(|_| {});
        let set = slot.lock().unwrap().clone().unwrap();
        set.set(5);
        sub.cancel();

        // Late in-flight delivery from the torn-down activation
        set.set(99);
        assert_eq!(store.get(), 5, "stale write must not land");
        assert_eq!(store.observer_count(), 0);

        // A fresh activation gets a fresh epoch and works normally
        let _sub = store.subscribe(|_| {});
        let fresh = slot.lock().unwrap().clone().unwrap();
        fresh.set(6);
        assert_eq!(store.get(), 6);
        // The old setter still cannot land
        set.set(99);
        assert_eq!(store.get(), 6);
    }

    #[test]
    fn test_inert_store_never_changes() {
        let store: Store<Option<u32>> = Store::inert(None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let sub = store.subscribe(move |v| seen2.lock().unwrap().push(v));
        assert_eq!(*seen.lock().unwrap(), vec![None]);
        assert_eq!(store.get(), None);
        sub.cancel();
    }

    #[test]
    fn test_seed_during_start_reaches_first_observer() {
        let store = Store::new(0u32, |set| {
            set.set(42);
            None
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let _sub = store.subscribe(move |v| seen2.lock().unwrap().push(v));
        // One delivery only, carrying the seeded value
        assert_eq!(*seen.lock().unwrap(), vec![42]);
    }

    #[test]
    fn test_derived_sequences_teardown_before_setup() {
        let slot: Arc<Mutex<Option<Setter<u32>>>> = Arc::new(Mutex::new(None));
        let slot2 = Arc::clone(&slot);
        let source = Store::new(0u32, move |set| {
            *slot2.lock().unwrap() = Some(set);
            None
        });

        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let log2 = Arc::clone(&log);
        let d = derived(source.clone(), 0u32, move |v, set| {
            let log = Arc::clone(&log2);
            log.lock().unwrap().push(format!("setup {v}"));
            set.set(v * 10);
            Some(Unsubscribe::new(move || {
                log.lock().unwrap().push(format!("teardown {v}"));
            }))
        });

        let _sub = d.subscribe(|_| {});
        let set = slot.lock().unwrap().clone().unwrap();
        set.set(1);
        set.set(2);

        assert_eq!(d.get(), 20);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["setup 0", "teardown 0", "setup 1", "teardown 1", "setup 2"]
        );
    }

    #[test]
    fn test_derived_releases_downstream_on_deactivation() {
        let torn = Arc::new(AtomicUsize::new(0));
        let source = Store::new(1u32, |_| None);
        let torn2 = Arc::clone(&torn);
        let d = derived(source, 0u32, move |_, _| {
            let torn = Arc::clone(&torn2);
            Some(Unsubscribe::new(move || {
                torn.fetch_add(1, Ordering::SeqCst);
            }))
        });

        let sub = d.subscribe(|_| {});
        assert_eq!(torn.load(Ordering::SeqCst), 0);
        sub.cancel();
        assert_eq!(torn.load(Ordering::SeqCst), 1);
    }
}
