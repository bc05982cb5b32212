//! Scripted in-memory sensor for tests and host prototyping.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{SensorError, SensorResult};

use super::{EventListener, Sensor, SensorEvent, Subscription};

struct FakeSensorState<F, P> {
    listeners: Vec<(u64, EventListener<F, P>)>,
    next_id: u64,
    refuse_subscriptions: bool,
}

/// In-memory sensor whose events are published by the caller.
///
/// Events are delivered synchronously from [`publish`](FakeSensor::publish),
/// on the publishing thread, to a snapshot of the listeners registered when
/// delivery starts. `refuse_subscriptions` turns every later subscribe
/// attempt into [`SensorError::SubscribeFailed`], for exercising the
/// subscription-failure path.
pub struct FakeSensor<F, P> {
    state: Arc<Mutex<FakeSensorState<F, P>>>,
}

impl<F, P> FakeSensor<F, P> {
    /// Create a sensor with no listeners.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeSensorState {
                listeners: Vec::new(),
                next_id: 0,
                refuse_subscriptions: false,
            })),
        }
    }

    /// Publish one event to every currently registered listener.
    pub fn publish(&self, feature: F, payload: P) {
        let snapshot: Vec<EventListener<F, P>> = {
            let state = self.state.lock();
            state
                .listeners
                .iter()
                .map(|(_, listener)| listener.clone())
                .collect()
        };
        let event = SensorEvent { feature, payload };
        for listener in snapshot {
            listener(&event);
        }
    }

    /// Number of live subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Make every later `subscribe` call fail (or succeed again).
    pub fn refuse_subscriptions(&self, refuse: bool) {
        self.state.lock().refuse_subscriptions = refuse;
    }
}

impl<F, P> Default for FakeSensor<F, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F, P> Sensor for FakeSensor<F, P>
where
    F: Copy + Eq + fmt::Debug + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    type Feature = F;
    type Payload = P;

    fn subscribe(&self, listener: EventListener<F, P>) -> SensorResult<Subscription> {
        let mut state = self.state.lock();
        if state.refuse_subscriptions {
            return Err(SensorError::SubscribeFailed(
                "subscriptions refused".to_string(),
            ));
        }
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.push((id, listener));

        let state: Weak<Mutex<FakeSensorState<F, P>>> = Arc::downgrade(&self.state);
        Ok(Subscription::new(move || {
            if let Some(state) = state.upgrade() {
                state
                    .lock()
                    .listeners
                    .retain(|(listener_id, _)| *listener_id != id);
            }
        }))
    }
}
