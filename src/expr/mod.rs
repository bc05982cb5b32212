//! Declarative gesture expressions.
//!
//! An expression is an immutable algebraic description of a gesture: ground
//! terms combined by sequence, parallel, choice and iteration. Expressions
//! are cheap handles and freely shareable; [`compile`](GestureExpr::compile)
//! may be called any number of times and yields an independent recognizer
//! network per call, every one of them feeding the expression's
//! [`gesture`](GestureExpr::gesture) broadcast.

use std::sync::{Arc, Weak};

use tracing::warn;

use crate::core::{Broadcast, Token, TokenBatch};
use crate::error::GestureResult;
use crate::net::{GestureNet, GroundNet, OperatorNet, Predicate};
use crate::sensor::Sensor;

enum ExprKind<S: Sensor> {
    Ground {
        feature: S::Feature,
        predicate: Option<Predicate<S::Payload>>,
    },
    Sequence(GestureExpr<S>, GestureExpr<S>),
    Parallel(GestureExpr<S>, GestureExpr<S>),
    Choice(GestureExpr<S>, GestureExpr<S>),
    Iter(GestureExpr<S>),
}

struct ExprInner<S: Sensor> {
    kind: ExprKind<S>,
    gesture: Broadcast<TokenBatch>,
}

/// Immutable algebraic description of a gesture.
pub struct GestureExpr<S: Sensor> {
    inner: Arc<ExprInner<S>>,
}

impl<S: Sensor> Clone for GestureExpr<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Sensor> GestureExpr<S> {
    fn new(kind: ExprKind<S>) -> Self {
        Self {
            inner: Arc::new(ExprInner {
                kind,
                gesture: Broadcast::new(),
            }),
        }
    }

    /// Ground term matching every event carrying `feature`.
    pub fn ground(feature: S::Feature) -> Self {
        Self::new(ExprKind::Ground {
            feature,
            predicate: None,
        })
    }

    /// Ground term matching events carrying `feature` whose payload
    /// satisfies `predicate`.
    pub fn ground_when(
        feature: S::Feature,
        predicate: impl Fn(&S::Payload) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(ExprKind::Ground {
            feature,
            predicate: Some(Arc::new(predicate)),
        })
    }

    /// `first ; then`: recognize `first`, then `then`.
    pub fn sequence(first: GestureExpr<S>, then: GestureExpr<S>) -> Self {
        Self::new(ExprKind::Sequence(first, then))
    }

    /// `left ‖ right`: both sides must be recognized.
    pub fn parallel(left: GestureExpr<S>, right: GestureExpr<S>) -> Self {
        Self::new(ExprKind::Parallel(left, right))
    }

    /// `left ⊕ right`: whichever side is recognized first wins.
    pub fn choice(left: GestureExpr<S>, right: GestureExpr<S>) -> Self {
        Self::new(ExprKind::Choice(left, right))
    }

    /// `body*`: recognize `body` over and over; raises this expression's
    /// gesture on every round but never completes upward. Composed as the
    /// left side of a sequence, the sequence therefore stalls forever; the
    /// enclosing composition stops an iteration with `remove_tokens`.
    pub fn iter(body: GestureExpr<S>) -> Self {
        Self::new(ExprKind::Iter(body))
    }

    /// Fluent form of [`sequence`](GestureExpr::sequence).
    pub fn then(&self, next: &GestureExpr<S>) -> Self {
        Self::sequence(self.clone(), next.clone())
    }

    /// Fluent form of [`parallel`](GestureExpr::parallel).
    pub fn alongside(&self, other: &GestureExpr<S>) -> Self {
        Self::parallel(self.clone(), other.clone())
    }

    /// Fluent form of [`choice`](GestureExpr::choice).
    pub fn or_else(&self, other: &GestureExpr<S>) -> Self {
        Self::choice(self.clone(), other.clone())
    }

    /// Fluent form of [`iter`](GestureExpr::iter).
    pub fn repeated(&self) -> Self {
        Self::iter(self.clone())
    }

    /// Broadcast raised every time a compiled recognizer for this
    /// expression signals a completion.
    pub fn gesture(&self) -> &Broadcast<TokenBatch> {
        &self.inner.gesture
    }

    /// Compile and arm a recognizer against `sensor`.
    ///
    /// Wires this expression's gesture to the network's completion, installs
    /// the auto-refeed policy and injects the initial token, so the
    /// recognizer stays armed for the next gesture instance after every
    /// recognition. Re-arming follows the front structure: a ground term
    /// re-arms itself, a parallel re-arms its entire front with one shared
    /// fresh token (both branches must be able to pair the next instance),
    /// choice branches re-arm independently, and iteration bodies are left
    /// alone because they recycle their own tokens.
    pub fn compile(&self, sensor: &Arc<S>) -> GestureResult<Arc<dyn GestureNet<S>>> {
        let compiled = self.compile_node(sensor, true);
        let net = compiled.net;

        let gesture = self.inner.gesture.clone();
        net.completion().subscribe(move |tokens: &TokenBatch| {
            gesture.emit(tokens);
        });

        net.add_tokens(&[Token::fresh()])?;
        Ok(net)
    }

    /// Compile one expression node. `rearm` is true while the node sits on a
    /// front path of the root, and decides whether auto-refeed wiring is
    /// installed here; embedded sub-expressions that completions merely flow
    /// through are compiled with it off.
    fn compile_node(&self, sensor: &Arc<S>, rearm: bool) -> CompiledNode<S> {
        match &self.inner.kind {
            ExprKind::Ground { feature, predicate } => {
                let node = GroundNet::new(sensor.clone(), *feature, predicate.clone());
                if rearm {
                    wire_rearm_group(&[node.clone()]);
                }
                CompiledNode {
                    net: node.clone(),
                    steady_front: vec![node],
                }
            }
            ExprKind::Sequence(first, then) => {
                let left = first.compile_node(sensor, rearm);
                let right = then.compile_node(sensor, false);
                CompiledNode {
                    net: OperatorNet::sequence(left.net, right.net),
                    steady_front: left.steady_front,
                }
            }
            ExprKind::Parallel(left, right) => {
                let left = left.compile_node(sensor, false);
                let right = right.compile_node(sensor, false);
                let net = OperatorNet::parallel(left.net, right.net);
                let mut steady_front = left.steady_front;
                steady_front.extend(right.steady_front);
                if rearm {
                    wire_rearm_group(&steady_front);
                }
                CompiledNode { net, steady_front }
            }
            ExprKind::Choice(left, right) => {
                let left = left.compile_node(sensor, rearm);
                let right = right.compile_node(sensor, rearm);
                let net = OperatorNet::choice(left.net, right.net);
                let mut steady_front = left.steady_front;
                steady_front.extend(right.steady_front);
                CompiledNode { net, steady_front }
            }
            ExprKind::Iter(body) => {
                let inner = body.compile_node(sensor, false);
                CompiledNode {
                    net: OperatorNet::iteration(inner.net, self.inner.gesture.clone()),
                    steady_front: Vec::new(),
                }
            }
        }
    }
}

/// A sub-network compiled from one expression node, together with the part
/// of its front that needs external re-arming. Iteration bodies are absent
/// from `steady_front`: their tokens are recycled by the iteration itself,
/// so an extra injection per round would grow their held sets without bound.
struct CompiledNode<S: Sensor> {
    net: Arc<dyn GestureNet<S>>,
    steady_front: Vec<Arc<GroundNet<S>>>,
}

/// Auto-refeed wiring for one re-arm group: when any node of the group
/// completes, one shared fresh token is injected into every node of the
/// group in the same call chain. A parallel's branches thereby keep pairing
/// a common token identity round after round; a lone ground term is the
/// singleton case.
fn wire_rearm_group<S: Sensor>(group: &[Arc<GroundNet<S>>]) {
    for node in group {
        let targets: Vec<Weak<GroundNet<S>>> = group.iter().map(Arc::downgrade).collect();
        node.completion().subscribe(move |_: &TokenBatch| {
            let fresh = [Token::fresh()];
            for target in &targets {
                if let Some(target) = target.upgrade() {
                    if let Err(error) = target.add_tokens(&fresh) {
                        warn!(%error, "auto-refeed failed to re-arm a front node");
                    }
                }
            }
        });
    }
}
