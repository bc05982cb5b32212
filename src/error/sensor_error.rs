use thiserror::Error;

/// Sensor-port errors
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Subscribe failed: {0}")]
    SubscribeFailed(String),
    #[error("Sensor closed")]
    Closed,
}
