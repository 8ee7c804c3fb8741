use std::{io::Write, path::Path, time::Duration};

use anyhow::{Context, Result};
use log::{debug, warn};

use tokio_serial::SerialPort;

use super::{Color, IndicatorDevice, IndicatorError};

const BAUD_RATE: u32 = 9600;
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Adafruit USB tower light driven by single command bytes over a serial
/// line.
pub struct UsbBulb<W: Write + Send> {
    port: W,
}

impl UsbBulb<Box<dyn SerialPort>> {
    /// Open the bulb's tty in raw mode at 9600 baud, 8N1.
    pub fn open(path: &Path) -> Result<Self> {
        let port = tokio_serial::new(path.to_string_lossy(), BAUD_RATE)
            .timeout(WRITE_TIMEOUT)
            .open()
            .with_context(|| format!("failed to open bulb serial device {}", path.display()))?;
        Self::new(port).context("failed to reset bulb state")
    }
}

impl<W: Write + Send> UsbBulb<W> {
    /// Wrap an already open port. All colors are switched off first so a
    /// previous run cannot leave a stale light behind.
    pub fn new(port: W) -> Result<Self, IndicatorError> {
        let mut bulb = Self { port };
        bulb.all_off()?;
        Ok(bulb)
    }

    fn send(&mut self, command: u8) -> Result<(), IndicatorError> {
        self.port.write_all(&[command])?;
        self.port.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn port(&self) -> &W {
        &self.port
    }
}

fn on_command(color: Color) -> u8 {
    match color {
        Color::Red => 0x11,
        Color::Yellow => 0x12,
        Color::Green => 0x14,
    }
}

fn off_command(color: Color) -> u8 {
    match color {
        Color::Red => 0x21,
        Color::Yellow => 0x22,
        Color::Green => 0x24,
    }
}

fn blink_command(color: Color) -> u8 {
    match color {
        Color::Red => 0x41,
        Color::Yellow => 0x42,
        Color::Green => 0x44,
    }
}

impl<W: Write + Send> IndicatorDevice for UsbBulb<W> {
    fn turn_on(&mut self, color: Color) -> Result<(), IndicatorError> {
        debug!("turning {color} on");
        self.send(on_command(color))
    }

    fn turn_off(&mut self, color: Color) -> Result<(), IndicatorError> {
        debug!("turning {color} off");
        self.send(off_command(color))
    }

    fn start_blinking(&mut self, color: Color) -> Result<(), IndicatorError> {
        debug!("blinking {color}");
        self.send(blink_command(color))
    }
}

impl<W: Write + Send> Drop for UsbBulb<W> {
    fn drop(&mut self) {
        if let Err(err) = self.all_off() {
            warn!("failed to switch bulb off on close: {err}");
        }
    }
}
