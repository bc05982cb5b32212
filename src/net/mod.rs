//! Gesture networks: executable token-flow graphs compiled from expressions.

pub mod ground;
pub mod operator;

pub use ground::{GroundNet, Predicate};
pub use operator::OperatorNet;

use std::sync::Arc;

use crate::core::{Broadcast, Token, TokenBatch};
use crate::error::GestureResult;
use crate::sensor::Sensor;

/// One node of a compiled gesture network.
///
/// A node routes opaque tokens: they enter at the front, wait at ground terms
/// for matching sensor events, and leave upward through the completion
/// signal. Each token held anywhere in the sub-network is either delivered
/// upward exactly once or withdrawn exactly once, never both.
pub trait GestureNet<S: Sensor>: Send + Sync {
    /// Inject tokens at this sub-network's front.
    ///
    /// Surfaces a subscription failure from the sensor port; the failing
    /// node's held set is left unmodified.
    fn add_tokens(&self, tokens: &[Token]) -> GestureResult<()>;

    /// Withdraw tokens from the entire sub-network, however deep they sit.
    /// Tokens not present are ignored.
    fn remove_tokens(&self, tokens: &[Token]);

    /// The ground-term nodes currently eligible to accept fresh tokens.
    fn front(&self) -> Vec<Arc<GroundNet<S>>>;

    /// Upward completion signal carrying finished token batches.
    fn completion(&self) -> &Broadcast<TokenBatch>;
}
