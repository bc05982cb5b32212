pub mod core;
pub mod error;
pub mod expr;
pub mod net;
pub mod sensor;

pub use crate::core::{Broadcast, ListenerHandle, Token, TokenBatch};
pub use crate::error::{GestureError, GestureResult, SensorError, SensorResult};
pub use crate::expr::GestureExpr;
pub use crate::net::{GestureNet, GroundNet, OperatorNet, Predicate};
pub use crate::sensor::{EventListener, FakeSensor, Sensor, SensorEvent, Subscription};
