pub mod display;
pub mod table;

pub use display::PowerPlugDisplay;
pub use table::Us100Table;

use std::io;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("sensor I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("unexpected sensor reply: {0}")]
    Protocol(String),

    #[error("sensor did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("sensor request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Whether the monitored display is powered on. `None` means the state could
/// not be determined this time; it is never fatal for the caller.
#[async_trait]
pub trait DisplayPowerSensor: Send {
    async fn is_on(&mut self) -> Option<bool>;
}

/// Whether the desk is in its raised position.
#[async_trait]
pub trait TablePositionSensor: Send {
    async fn is_up(&mut self) -> Result<bool, SensorError>;
}
