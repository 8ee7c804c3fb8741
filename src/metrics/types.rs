use serde::{Deserialize, Serialize};

use crate::{alert::Color, monitor::MonitorSnapshot};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCounts {
    pub red: u64,
    pub green: u64,
    pub yellow: u64,
}

impl AlertCounts {
    pub fn get(&self, color: Color) -> u64 {
        match color {
            Color::Red => self.red,
            Color::Green => self.green,
            Color::Yellow => self.yellow,
        }
    }

    pub(crate) fn increment(&mut self, color: Color) {
        match color {
            Color::Red => self.red += 1,
            Color::Green => self.green += 1,
            Color::Yellow => self.yellow += 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub system: SystemMetrics,
    /// Last display reading, `None` when the plug could not be read.
    pub display_status: Option<bool>,
    /// Last table reading, `None` when the sensor could not be read.
    pub table_position: Option<bool>,
    pub monitor: MonitorSnapshot,
    pub alerts: AlertCounts,
    pub sensor_failures: u64,
    pub sample_count: u64,
}
