use std::io;

use super::Color;

#[derive(Debug, thiserror::Error)]
pub enum IndicatorError {
    #[error("indicator I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// A physical light the dispatcher can command.
///
/// Calls are expected to be quick (a single serial write); the waiting part
/// of an alert is done by the dispatcher, not the device.
pub trait IndicatorDevice: Send {
    fn turn_on(&mut self, color: Color) -> Result<(), IndicatorError>;

    fn turn_off(&mut self, color: Color) -> Result<(), IndicatorError>;

    /// Devices without a hardware blink mode fall back to a steady light.
    fn start_blinking(&mut self, color: Color) -> Result<(), IndicatorError> {
        self.turn_on(color)
    }

    fn all_off(&mut self) -> Result<(), IndicatorError> {
        for color in Color::ALL {
            self.turn_off(color)?;
        }
        Ok(())
    }
}
