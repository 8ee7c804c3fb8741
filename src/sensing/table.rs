use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use super::{SensorError, TablePositionSensor};

const TRIGGER_DISTANCE: u8 = 0x55;
const BAUD_RATE: u32 = 9600;
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// US-100 ultrasonic range finder mounted under the desk, talking its UART
/// protocol: one trigger byte out, the distance in millimetres back as two
/// big-endian bytes.
///
/// Only one bit is of interest: whether the measured distance is above the
/// height threshold, i.e. the desk is raised.
pub struct Us100Table<P> {
    port: P,
    height_threshold_cm: f64,
}

impl Us100Table<SerialStream> {
    /// Open the sensor's tty in raw mode at 9600 baud, 8N1.
    pub fn open(path: &Path, height_threshold_cm: f64) -> Result<Self> {
        let path_str = path.to_string_lossy();
        let port = tokio_serial::new(path_str, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open_native_async()
            .with_context(|| format!("failed to open table sensor device {}", path.display()))?;
        Ok(Self::new(port, height_threshold_cm))
    }
}

impl<P> Us100Table<P>
where
    P: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(port: P, height_threshold_cm: f64) -> Self {
        Self {
            port,
            height_threshold_cm,
        }
    }

    pub async fn distance_cm(&mut self) -> Result<f64, SensorError> {
        self.port.write_all(&[TRIGGER_DISTANCE]).await?;
        self.port.flush().await?;

        let mut reply = [0u8; 2];
        match tokio::time::timeout(READ_TIMEOUT, self.port.read_exact(&mut reply)).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(SensorError::Protocol("short distance reply".into()));
            }
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => return Err(SensorError::Timeout(READ_TIMEOUT)),
        }

        let millimetres = u16::from_be_bytes(reply);
        Ok(f64::from(millimetres) / 10.0)
    }
}

#[async_trait]
impl<P> TablePositionSensor for Us100Table<P>
where
    P: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn is_up(&mut self) -> Result<bool, SensorError> {
        let distance = self.distance_cm().await?;
        let up = distance > self.height_threshold_cm;
        debug!("table distance = {distance} cm -> up {up}");
        Ok(up)
    }
}
