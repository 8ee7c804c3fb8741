pub mod bulb;
pub mod dispatcher;
pub mod indicator;
pub mod priority;

pub use bulb::UsbBulb;
pub use dispatcher::AlertDispatcher;
pub use indicator::{IndicatorDevice, IndicatorError};

use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Color {
    Red,
    Green,
    Yellow,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Red, Color::Green, Color::Yellow];

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Yellow => "yellow",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AlertAction {
    /// Blink the color for the task duration, then switch it off.
    Blink,
    /// Keep the color steadily on for the task duration, then switch it off.
    Hold,
}

/// One unit of work for the dispatcher. Moved into the queue on request and
/// consumed exactly once by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTask {
    pub id: Uuid,
    pub color: Color,
    pub action: AlertAction,
    pub duration: Duration,
}

impl AlertTask {
    pub fn new(color: Color, action: AlertAction, duration: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            color,
            action,
            duration,
        }
    }
}

/// Mirror of an accepted [`AlertTask`], broadcast to observers such as the
/// metrics collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub id: Uuid,
    pub color: Color,
    pub action: AlertAction,
    pub duration_secs: u64,
    pub requested_at: DateTime<Utc>,
}

impl From<&AlertTask> for AlertEvent {
    fn from(task: &AlertTask) -> Self {
        Self {
            id: task.id,
            color: task.color,
            action: task.action,
            duration_secs: task.duration.as_secs(),
            requested_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AlertError {
    #[error("alert dispatcher is shut down")]
    Closed,
}
