//! Engine-level error types.

use super::SensorError;
use thiserror::Error;

/// Engine-level errors
#[derive(Debug, Error)]
pub enum GestureError {
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),
}
