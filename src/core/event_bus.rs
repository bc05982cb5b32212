//! Synchronous multi-listener broadcast.
//!
//! Both a node's completion signal and an expression's gesture channel are a
//! [`Broadcast`]: one producer, many listeners, fire-and-forget, delivered
//! synchronously on the emitting thread.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    listeners: Vec<(u64, Listener<T>)>,
    next_id: u64,
}

/// Multi-listener broadcast channel with synchronous delivery.
///
/// Cloning yields another handle onto the same listener registry. Emission
/// snapshots the registry first, so listeners may subscribe or cancel while a
/// delivery is in flight; a listener registered during delivery does not see
/// the in-flight value.
pub struct Broadcast<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: 'static> Broadcast<T> {
    /// Create a broadcast with no listeners.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register a listener. The returned handle cancels the registration;
    /// dropping the handle does not.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerHandle {
        let id = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, Arc::new(listener)));
            id
        };
        let registry: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        ListenerHandle::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .lock()
                    .listeners
                    .retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }

    /// Deliver `value` to every listener registered at the start of the call.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = {
            let registry = self.registry.lock();
            if registry.listeners.is_empty() {
                return;
            }
            registry
                .listeners
                .iter()
                .map(|(_, listener)| listener.clone())
                .collect()
        };
        for listener in snapshot {
            listener(value);
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.registry.lock().listeners.len()
    }
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<T: 'static> Default for Broadcast<T> {
    fn default() -> Self {
        Self::new()
    }
}

type CancelFn = Box<dyn FnOnce() + Send>;

/// Handle to one broadcast listener. `cancel` is idempotent.
pub struct ListenerHandle {
    cancel: Mutex<Option<CancelFn>>,
}

impl ListenerHandle {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Remove the listener from the broadcast. Later calls are no-ops.
    pub fn cancel(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_reaches_every_listener() {
        let bus: Broadcast<u32> = Broadcast::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let hits = hits.clone();
            bus.subscribe(move |value: &u32| {
                hits.fetch_add(*value as usize, Ordering::SeqCst);
            });
        }

        bus.emit(&2);
        assert_eq!(hits.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let bus: Broadcast<()> = Broadcast::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = {
            let hits = hits.clone();
            bus.subscribe(move |_: &()| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };

        handle.cancel();
        handle.cancel();
        bus.emit(&());

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_listener_registered_during_emit_misses_inflight_value() {
        let bus: Broadcast<()> = Broadcast::new();
        let late_hits = Arc::new(AtomicUsize::new(0));

        {
            let bus_inner = bus.clone();
            let late_hits = late_hits.clone();
            bus.subscribe(move |_: &()| {
                let late_hits = late_hits.clone();
                bus_inner.subscribe(move |_: &()| {
                    late_hits.fetch_add(1, Ordering::SeqCst);
                });
            });
        }

        bus.emit(&());
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);

        bus.emit(&());
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_emit_without_listeners_is_noop() {
        let bus: Broadcast<String> = Broadcast::new();
        bus.emit(&"nobody home".to_string());
        assert_eq!(bus.listener_count(), 0);
    }
}
