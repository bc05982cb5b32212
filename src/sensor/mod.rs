//! Sensor port: the abstract event source a gesture network listens to.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::SensorResult;

pub mod fake;

pub use fake::FakeSensor;

/// One feature-tagged event published by a sensor.
#[derive(Debug, Clone)]
pub struct SensorEvent<F, P> {
    /// Feature tag, drawn from the sensor's finite feature enumeration.
    pub feature: F,
    /// Opaque payload, carried verbatim to predicates.
    pub payload: P,
}

/// Listener registered with [`Sensor::subscribe`].
pub type EventListener<F, P> = Arc<dyn Fn(&SensorEvent<F, P>) + Send + Sync>;

/// An abstract publish/subscribe event source.
///
/// The engine routes each delivered event to completion synchronously on the
/// delivering thread and does not serialize concurrent deliveries itself; a
/// host delivering from multiple threads must funnel events through a single
/// consumer first.
pub trait Sensor: Send + Sync + 'static {
    /// Feature enumeration. Equality must be decidable.
    type Feature: Copy + Eq + fmt::Debug + Send + Sync + 'static;
    /// Opaque event payload.
    type Payload: Send + Sync + 'static;

    /// Register a listener for every event this sensor publishes.
    fn subscribe(
        &self,
        listener: EventListener<Self::Feature, Self::Payload>,
    ) -> SensorResult<Subscription>;
}

type CancelFn = Box<dyn FnOnce() + Send>;

/// Handle to one sensor subscription. `cancel` is idempotent.
pub struct Subscription {
    cancel: Mutex<Option<CancelFn>>,
}

impl Subscription {
    /// Wrap the sensor-side cancellation action.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Cancel the subscription. Later calls are no-ops.
    pub fn cancel(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel();
        }
    }
}
