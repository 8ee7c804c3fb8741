use std::{sync::Arc, time::Duration};

use chrono::Timelike;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    alert::AlertDispatcher,
    metrics::MetricsCollector,
    sensing::{DisplayPowerSensor, TablePositionSensor},
};

use super::state::{Maximums, MonitorRuntimeState, Sample};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

// Upper bound on one sensor read, whatever the driver does internally.
const SENSOR_TIMEOUT: Duration = Duration::from_secs(5);

pub fn local_hour() -> u32 {
    chrono::Local::now().hour()
}

/// The sampling loop: reads both sensors once per tick, folds the sample into
/// [`MonitorRuntimeState`] and turns due alerts into dispatcher requests.
pub struct Workmon<D, T> {
    display: D,
    table: T,
    maximums: Maximums,
    dispatcher: Arc<AlertDispatcher>,
    metrics: Option<MetricsCollector>,
    hour_of_day: fn() -> u32,
    state: MonitorRuntimeState,
}

impl<D, T> Workmon<D, T>
where
    D: DisplayPowerSensor,
    T: TablePositionSensor,
{
    pub fn new(display: D, table: T, maximums: Maximums, dispatcher: Arc<AlertDispatcher>) -> Self {
        Self {
            display,
            table,
            maximums,
            dispatcher,
            metrics: None,
            hour_of_day: local_hour,
            state: MonitorRuntimeState::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replace the wall-clock hour source.
    pub fn with_hour_source(mut self, hour_of_day: fn() -> u32) -> Self {
        self.hour_of_day = hour_of_day;
        self
    }

    pub fn dispatcher(&self) -> Arc<AlertDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn state(&self) -> &MonitorRuntimeState {
        &self.state
    }

    pub async fn run(mut self, cancel_token: CancellationToken) {
        let mut ticker = time::interval(self.maximums.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log_info!(
            "monitoring started, sampling every {}s",
            self.maximums.sample_interval.as_secs()
        );

        loop {
            let cancelled = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => true,
                _ = ticker.tick() => tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => true,
                    _ = self.sample_once() => false,
                },
            };

            if cancelled {
                log_info!("monitoring loop shutting down");
                break;
            }
        }
    }

    /// One tick of the loop.
    pub async fn sample_once(&mut self) {
        let table_up = match time::timeout(SENSOR_TIMEOUT, self.table.is_up()).await {
            Ok(Ok(up)) => Some(up),
            Ok(Err(err)) => {
                log_warn!("cannot determine table position: {err}");
                None
            }
            Err(_) => {
                log_warn!("table sensor did not answer within {SENSOR_TIMEOUT:?}");
                None
            }
        };
        let display_on = time::timeout(SENSOR_TIMEOUT, self.display.is_on())
            .await
            .unwrap_or_else(|_| {
                log_warn!("display sensor did not answer within {SENSOR_TIMEOUT:?}");
                None
            });
        log_debug!("table up = {table_up:?}, display on = {display_on:?}");

        if let Some(metrics) = &self.metrics {
            metrics.record_reading(display_on, table_up).await;
        }

        let (Some(display_on), Some(table_up)) = (display_on, table_up) else {
            log_warn!("sensor reading unavailable, skipping this tick");
            self.state.skip();
            if let Some(metrics) = &self.metrics {
                metrics.record_sensor_failure().await;
            }
            return;
        };

        let hour = (self.hour_of_day)();
        let alerts = self.state.evaluate(
            &self.maximums,
            Sample {
                display_on,
                table_up,
            },
            hour,
        );

        for alert in alerts {
            log_info!("{alert}");
            let duration = self.maximums.alert_duration;
            if let Err(err) = self.dispatcher.request(alert.color(), alert.action(), duration) {
                log_error!("failed to request {} alert: {err}", alert.color());
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_state(self.state.snapshot()).await;
        }
    }
}
