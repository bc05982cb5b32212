//! Operator scaffold and the four combinator wirings.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::core::{Broadcast, Token, TokenBatch};
use crate::error::GestureResult;
use crate::sensor::Sensor;

use super::{GestureNet, GroundNet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Left,
    Right,
}

/// Interior node owning its child sub-networks.
///
/// `front_sources` is the strategy value deciding which children contribute
/// ground terms to this node's front; completion behaviour is wired per
/// combinator by the constructors below. Token injection forwards to the
/// front, withdrawal forwards to every direct child, because tokens may be
/// waiting at any depth.
pub struct OperatorNet<S: Sensor> {
    children: Vec<Arc<dyn GestureNet<S>>>,
    front_sources: Vec<Arc<dyn GestureNet<S>>>,
    completion: Broadcast<TokenBatch>,
}

impl<S: Sensor> OperatorNet<S> {
    fn new(
        children: Vec<Arc<dyn GestureNet<S>>>,
        front_sources: Vec<Arc<dyn GestureNet<S>>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            children,
            front_sources,
            completion: Broadcast::new(),
        })
    }

    /// `L ; R`: tokens traverse the left sub-network fully, then the right.
    ///
    /// The front is the left side's front; every left completion is routed
    /// into the right side, and right completions become this node's own.
    pub fn sequence(
        left: Arc<dyn GestureNet<S>>,
        right: Arc<dyn GestureNet<S>>,
    ) -> Arc<Self> {
        let op = Self::new(vec![left.clone(), right.clone()], vec![left.clone()]);

        let downstream = right.clone();
        left.completion().subscribe(move |tokens: &TokenBatch| {
            if let Err(error) = downstream.add_tokens(tokens) {
                warn!(%error, "sequence dropped a batch: right side refused tokens");
            }
        });

        let completion = op.completion.clone();
        right.completion().subscribe(move |tokens: &TokenBatch| {
            completion.emit(tokens);
        });

        op
    }

    /// `L ‖ R`: a token is complete only once both branches completed it.
    ///
    /// A token completed by exactly one branch waits in the half-completed
    /// set and is never re-emitted on its own.
    pub fn parallel(
        left: Arc<dyn GestureNet<S>>,
        right: Arc<dyn GestureNet<S>>,
    ) -> Arc<Self> {
        let op = Self::new(
            vec![left.clone(), right.clone()],
            vec![left.clone(), right.clone()],
        );

        let half: Arc<Mutex<HashMap<Token, Branch>>> = Arc::new(Mutex::new(HashMap::new()));
        for (net, side) in [(left, Branch::Left), (right, Branch::Right)] {
            let half = half.clone();
            let completion = op.completion.clone();
            net.completion().subscribe(move |tokens: &TokenBatch| {
                let paired: TokenBatch = {
                    let mut half = half.lock();
                    tokens
                        .iter()
                        .copied()
                        .filter(|token| match half.remove(token) {
                            Some(first_side) => {
                                debug_assert_ne!(
                                    first_side, side,
                                    "token {:?} completed twice by the same branch",
                                    token
                                );
                                true
                            }
                            None => {
                                half.insert(*token, side);
                                false
                            }
                        })
                        .collect()
                };
                if !paired.is_empty() {
                    completion.emit(&paired);
                }
            });
        }

        op
    }

    /// `L ⊕ R`: whichever branch completes a token first wins; the same
    /// tokens are withdrawn from the losing branch and never re-emitted.
    pub fn choice(
        left: Arc<dyn GestureNet<S>>,
        right: Arc<dyn GestureNet<S>>,
    ) -> Arc<Self> {
        let op = Self::new(
            vec![left.clone(), right.clone()],
            vec![left.clone(), right.clone()],
        );
        Self::wire_choice_branch(&op, &left, &right);
        Self::wire_choice_branch(&op, &right, &left);
        op
    }

    fn wire_choice_branch(
        op: &Arc<Self>,
        winner: &Arc<dyn GestureNet<S>>,
        loser: &Arc<dyn GestureNet<S>>,
    ) {
        let loser = Arc::downgrade(loser);
        let completion = op.completion.clone();
        winner.completion().subscribe(move |tokens: &TokenBatch| {
            if let Some(loser) = loser.upgrade() {
                loser.remove_tokens(tokens);
            }
            completion.emit(tokens);
        });
    }

    /// `X*`: every body completion is fed straight back to the body's front
    /// and reported on `loop_signal`; the outer completion stays silent, so
    /// an iteration never terminates on its own.
    pub fn iteration(
        body: Arc<dyn GestureNet<S>>,
        loop_signal: Broadcast<TokenBatch>,
    ) -> Arc<Self> {
        let op = Self::new(vec![body.clone()], vec![body.clone()]);

        let weak_body = Arc::downgrade(&body);
        body.completion().subscribe(move |tokens: &TokenBatch| {
            if let Some(body) = weak_body.upgrade() {
                if let Err(error) = body.add_tokens(tokens) {
                    warn!(%error, "iteration dropped a batch: body refused re-fed tokens");
                }
            }
            loop_signal.emit(tokens);
        });

        op
    }
}

impl<S: Sensor> GestureNet<S> for OperatorNet<S> {
    fn add_tokens(&self, tokens: &[Token]) -> GestureResult<()> {
        for node in self.front() {
            node.add_tokens(tokens)?;
        }
        Ok(())
    }

    fn remove_tokens(&self, tokens: &[Token]) {
        for child in &self.children {
            child.remove_tokens(tokens);
        }
    }

    fn front(&self) -> Vec<Arc<GroundNet<S>>> {
        self.front_sources
            .iter()
            .flat_map(|child| child.front())
            .collect()
    }

    fn completion(&self) -> &Broadcast<TokenBatch> {
        &self.completion
    }
}
