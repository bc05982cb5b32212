pub mod event_bus;
pub mod token;

pub use event_bus::{Broadcast, ListenerHandle};
pub use token::{Token, TokenBatch};
