//! Ground-term node: one feature tag plus an optional predicate, bound to
//! the sensor stream.

use std::mem;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::core::{Broadcast, Token, TokenBatch};
use crate::error::GestureResult;
use crate::sensor::{Sensor, SensorEvent, Subscription};

use super::GestureNet;

/// Predicate applied to an event payload before a ground term fires.
/// An absent predicate means every payload matches.
pub type Predicate<P> = Arc<dyn Fn(&P) -> bool + Send + Sync>;

struct GroundState {
    held: Vec<Token>,
    subscription: Option<Subscription>,
}

/// Leaf node of a gesture network.
///
/// Holds a live sensor subscription exactly while its held-token set is
/// non-empty. On a matching event the node swaps out the held set and drops
/// the subscription before emitting the completion, so a reentrant delivery
/// cannot double-fire and a subscription installed downstream during the
/// emission survives.
pub struct GroundNet<S: Sensor> {
    sensor: Arc<S>,
    feature: S::Feature,
    predicate: Option<Predicate<S::Payload>>,
    state: Mutex<GroundState>,
    completion: Broadcast<TokenBatch>,
    weak_self: Weak<Self>,
}

impl<S: Sensor> GroundNet<S> {
    /// Create a detached ground term bound to `sensor`.
    pub fn new(
        sensor: Arc<S>,
        feature: S::Feature,
        predicate: Option<Predicate<S::Payload>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            sensor,
            feature,
            predicate,
            state: Mutex::new(GroundState {
                held: Vec::new(),
                subscription: None,
            }),
            completion: Broadcast::new(),
            weak_self: weak_self.clone(),
        })
    }

    /// The feature tag this node listens for.
    pub fn feature(&self) -> S::Feature {
        self.feature
    }

    /// True while the node holds at least one token.
    pub fn holds_tokens(&self) -> bool {
        !self.state.lock().held.is_empty()
    }

    /// Number of tokens currently held.
    pub fn held_count(&self) -> usize {
        self.state.lock().held.len()
    }

    /// True while the node holds a live sensor subscription.
    pub fn is_subscribed(&self) -> bool {
        self.state.lock().subscription.is_some()
    }

    fn on_event(&self, event: &SensorEvent<S::Feature, S::Payload>) {
        if event.feature != self.feature {
            return;
        }
        if let Some(predicate) = &self.predicate {
            if !predicate(&event.payload) {
                return;
            }
        }
        // Swap first, unsubscribe second, emit last.
        let (tokens, subscription) = {
            let mut state = self.state.lock();
            if state.held.is_empty() {
                return;
            }
            (mem::take(&mut state.held), state.subscription.take())
        };
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
        self.completion.emit(&tokens);
    }
}

impl<S: Sensor> GestureNet<S> for GroundNet<S> {
    fn add_tokens(&self, tokens: &[Token]) -> GestureResult<()> {
        if tokens.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock();
        if state.subscription.is_none() {
            let weak_self = self.weak_self.clone();
            let subscription = self.sensor.subscribe(Arc::new(move |event| {
                if let Some(node) = weak_self.upgrade() {
                    node.on_event(event);
                }
            }))?;
            state.subscription = Some(subscription);
        }
        state.held.extend_from_slice(tokens);
        Ok(())
    }

    fn remove_tokens(&self, tokens: &[Token]) {
        let subscription = {
            let mut state = self.state.lock();
            state.held.retain(|held| !tokens.contains(held));
            if state.held.is_empty() {
                state.subscription.take()
            } else {
                None
            }
        };
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }

    fn front(&self) -> Vec<Arc<GroundNet<S>>> {
        match self.weak_self.upgrade() {
            Some(node) => vec![node],
            None => Vec::new(),
        }
    }

    fn completion(&self) -> &Broadcast<TokenBatch> {
        &self.completion
    }
}

impl<S: Sensor> Drop for GroundNet<S> {
    fn drop(&mut self) {
        if let Some(subscription) = self.state.get_mut().subscription.take() {
            subscription.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::FakeSensor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Feature {
        A,
        B,
    }

    type TestSensor = FakeSensor<Feature, i64>;

    #[test]
    fn test_subscription_tracks_held_set() {
        let sensor = Arc::new(TestSensor::new());
        let node = GroundNet::new(sensor.clone(), Feature::A, None);
        assert!(!node.is_subscribed());

        let token = Token::fresh();
        node.add_tokens(&[token]).unwrap();
        assert!(node.holds_tokens());
        assert!(node.is_subscribed());
        assert_eq!(sensor.active_subscriptions(), 1);

        node.remove_tokens(&[token]);
        assert!(!node.holds_tokens());
        assert!(!node.is_subscribed());
        assert_eq!(sensor.active_subscriptions(), 0);
    }

    #[test]
    fn test_fire_consumes_tokens_and_unsubscribes() {
        let sensor = Arc::new(TestSensor::new());
        let node = GroundNet::new(sensor.clone(), Feature::A, None);
        let fired = Arc::new(AtomicUsize::new(0));

        let fired_inner = fired.clone();
        node.completion().subscribe(move |tokens: &TokenBatch| {
            fired_inner.fetch_add(tokens.len(), Ordering::SeqCst);
        });

        node.add_tokens(&[Token::fresh(), Token::fresh()]).unwrap();
        sensor.publish(Feature::A, 0);

        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert!(!node.holds_tokens());
        assert_eq!(sensor.active_subscriptions(), 0);

        // A second event finds an empty node and does nothing.
        sensor.publish(Feature::A, 0);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_feature_mismatch_and_failed_predicate_are_ignored() {
        let sensor = Arc::new(TestSensor::new());
        let node = GroundNet::new(
            sensor.clone(),
            Feature::A,
            Some(Arc::new(|payload: &i64| *payload > 0) as Predicate<i64>),
        );
        let fired = Arc::new(AtomicUsize::new(0));

        let fired_inner = fired.clone();
        node.completion().subscribe(move |_: &TokenBatch| {
            fired_inner.fetch_add(1, Ordering::SeqCst);
        });

        node.add_tokens(&[Token::fresh()]).unwrap();
        sensor.publish(Feature::B, 5);
        sensor.publish(Feature::A, 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(node.holds_tokens());

        sensor.publish(Feature::A, 5);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_subscribe_leaves_held_set_unmodified() {
        let sensor = Arc::new(TestSensor::new());
        sensor.refuse_subscriptions(true);
        let node = GroundNet::new(sensor.clone(), Feature::A, None);

        assert!(node.add_tokens(&[Token::fresh()]).is_err());
        assert!(!node.holds_tokens());
        assert!(!node.is_subscribed());
    }

    #[test]
    fn test_drop_cancels_subscription() {
        let sensor = Arc::new(TestSensor::new());
        let node = GroundNet::new(sensor.clone(), Feature::A, None);
        node.add_tokens(&[Token::fresh()]).unwrap();
        assert_eq!(sensor.active_subscriptions(), 1);

        drop(node);
        assert_eq!(sensor.active_subscriptions(), 0);
    }
}
