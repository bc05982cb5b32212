use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Opaque flow marker routed through a gesture network.
///
/// Tokens carry no payload and are equal only to themselves: identity is an
/// atomically incremented counter, so every minted token is distinct for the
/// lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Token(u64);

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);

impl Token {
    /// Mint a token distinct from every token minted before it.
    pub fn fresh() -> Self {
        Token(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identity, for logging and assertions.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// The set of tokens delivered by one completion.
pub type TokenBatch = Vec<Token>;
