//! Error types for the gesture engine.
//!
//! - [`SensorError`] — Errors raised by a sensor port.
//! - [`GestureError`] — Top-level errors for compiling and driving networks.

pub mod gesture_error;
pub mod sensor_error;

pub use gesture_error::GestureError;
pub use sensor_error::SensorError;

/// Convenience alias for engine-level results.
pub type GestureResult<T> = Result<T, GestureError>;
/// Convenience alias for sensor-port results.
pub type SensorResult<T> = Result<T, SensorError>;
