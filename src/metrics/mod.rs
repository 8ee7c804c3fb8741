mod exposition;
pub mod server;
mod types;

pub use exposition::render_prometheus;
pub use types::{AlertCounts, MetricsSnapshot, SystemMetrics};

use std::sync::Arc;

use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};

use crate::{alert::AlertEvent, monitor::MonitorSnapshot};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Mirrors what the loop and the dispatcher are doing so it can be scraped.
/// Purely an observer: nothing here feeds back into the loop.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    display_status: Option<bool>,
    table_position: Option<bool>,
    monitor: MonitorSnapshot,
    alerts: AlertCounts,
    sensor_failures: u64,
    sample_count: u64,
    system: System,
    pid: Pid,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());

        // Initial refresh to establish baseline for CPU calculation
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                display_status: None,
                table_position: None,
                monitor: MonitorSnapshot::default(),
                alerts: AlertCounts::default(),
                sensor_failures: 0,
                sample_count: 0,
                system,
                pid,
            })),
        }
    }

    /// Raw sensor readings of one tick, complete or not.
    pub async fn record_reading(&self, display_on: Option<bool>, table_up: Option<bool>) {
        let mut state = self.inner.lock().await;
        state.display_status = display_on;
        state.table_position = table_up;
        state.sample_count += 1;
    }

    pub async fn record_sensor_failure(&self) {
        self.inner.lock().await.sensor_failures += 1;
    }

    pub async fn record_state(&self, snapshot: MonitorSnapshot) {
        self.inner.lock().await.monitor = snapshot;
    }

    pub async fn record_alert(&self, event: &AlertEvent) {
        self.inner.lock().await.alerts.increment(event.color);
    }

    /// Count every alert the dispatcher accepts until it goes away.
    pub fn spawn_alert_listener(
        &self,
        mut events: broadcast::Receiver<AlertEvent>,
    ) -> JoinHandle<()> {
        let collector = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        log_debug!("{} alert requested at {}", event.color, event.requested_at);
                        collector.record_alert(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log_warn!("metrics missed {skipped} alert events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let mut state = self.inner.lock().await;
        let pid = state.pid;

        // Refresh to get current CPU/RAM
        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        let system = match state.system.process(pid) {
            Some(process) => SystemMetrics {
                cpu_percent: process.cpu_usage(),
                memory_mb: process.memory() as f64 / 1024.0 / 1024.0,
            },
            None => SystemMetrics::default(),
        };

        MetricsSnapshot {
            system,
            display_status: state.display_status,
            table_position: state.table_position,
            monitor: state.monitor.clone(),
            alerts: state.alerts,
            sensor_failures: state.sensor_failures,
            sample_count: state.sample_count,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
