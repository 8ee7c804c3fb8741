use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{
    alert::{AlertAction, Color},
    settings::{ConfigError, Settings},
    tracking::DurationTracker,
    utils::format_duration,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Thresholds the loop evaluates against. Only built from validated
/// [`Settings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maximums {
    pub display_contig_max: Duration,
    pub display_daily_max: Duration,
    pub break_duration: Duration,
    pub table_state_max: Duration,
    pub sample_interval: Duration,
    pub alert_duration: Duration,
    pub start_of_day_hour: u32,
}

impl TryFrom<&Settings> for Maximums {
    type Error = ConfigError;

    fn try_from(settings: &Settings) -> Result<Self, Self::Error> {
        let positive = |name: &str, secs: u64| {
            if secs == 0 {
                Err(ConfigError::Invalid(format!("{name} must be greater than zero")))
            } else {
                Ok(Duration::from_secs(secs))
            }
        };

        if settings.start_of_day_hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "start of day hour {} is not within 0-23",
                settings.start_of_day_hour
            )));
        }

        Ok(Self {
            display_contig_max: positive(
                "display contiguous maximum",
                settings.display_contig_max_secs,
            )?,
            display_daily_max: positive("display daily maximum", settings.display_daily_max_secs)?,
            break_duration: positive("break duration", settings.break_duration_secs)?,
            table_state_max: positive("table state maximum", settings.table_state_max_secs)?,
            sample_interval: positive("sample interval", settings.sample_interval_secs)?,
            alert_duration: positive("alert duration", settings.alert_duration_secs)?,
            start_of_day_hour: settings.start_of_day_hour,
        })
    }
}

/// What one tick found out about the desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub display_on: bool,
    pub table_up: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alert {
    ContinuousUse,
    EndOfWorkday,
    ChangePosition,
}

impl Alert {
    pub fn color(&self) -> Color {
        match self {
            Alert::ContinuousUse => Color::Red,
            Alert::EndOfWorkday => Color::Green,
            Alert::ChangePosition => Color::Yellow,
        }
    }

    pub fn action(&self) -> AlertAction {
        match self {
            Alert::EndOfWorkday => AlertAction::Hold,
            Alert::ContinuousUse | Alert::ChangePosition => AlertAction::Blink,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Alert::ContinuousUse => "time for a break",
            Alert::EndOfWorkday => "recommended work day is over",
            Alert::ChangePosition => "time to change position",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub display_on: Option<bool>,
    pub table_up: Option<bool>,
    pub display_contiguous_secs: u64,
    pub display_daily_secs: u64,
    pub break_secs: u64,
    pub table_secs: u64,
    pub fired_display_contig: bool,
    pub fired_display_daily: bool,
    pub fired_table: bool,
}

/// Everything the loop remembers between ticks. Owned by the loop task.
#[derive(Debug)]
pub struct MonitorRuntimeState {
    last_table_up: Option<bool>,
    last_display_on: Option<bool>,
    display_contiguous: Duration,
    display_daily: Duration,
    break_elapsed: Duration,
    table_duration: Duration,
    fired_display_contig: bool,
    fired_display_daily: bool,
    fired_table: bool,
    last_hour: Option<u32>,
    last_tick: Option<Instant>,
    display_tracker: DurationTracker<bool>,
    table_tracker: DurationTracker<bool>,
}

impl MonitorRuntimeState {
    pub fn new() -> Self {
        Self {
            last_table_up: None,
            last_display_on: None,
            display_contiguous: Duration::ZERO,
            display_daily: Duration::ZERO,
            break_elapsed: Duration::ZERO,
            table_duration: Duration::ZERO,
            fired_display_contig: false,
            fired_display_daily: false,
            fired_table: false,
            last_hour: None,
            last_tick: None,
            display_tracker: DurationTracker::new(),
            table_tracker: DurationTracker::new(),
        }
    }

    /// Fold one complete sample into the state and return the alerts that
    /// became due on this tick, in the order they should be requested.
    pub fn evaluate(&mut self, maximums: &Maximums, sample: Sample, hour: u32) -> Vec<Alert> {
        let now = Instant::now();
        let elapsed = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_tick = Some(now);

        if hour == maximums.start_of_day_hour && self.last_hour != Some(hour) {
            log_info!("new work day started at {hour}:00, resetting all durations");
            self.start_new_day();
        }
        self.last_hour = Some(hour);

        let mut alerts = Vec::new();
        self.evaluate_display(maximums, sample.display_on, elapsed, &mut alerts);
        self.evaluate_table(maximums, sample, &mut alerts);

        self.last_display_on = Some(sample.display_on);
        self.last_table_up = Some(sample.table_up);
        alerts
    }

    /// A tick without a complete sample. Nothing is reset, and the time
    /// until the next evaluated tick is not attributed to any state.
    pub fn skip(&mut self) {
        if self.last_tick.is_some() {
            self.last_tick = Some(Instant::now());
        }
        self.display_tracker.skip();
        self.table_tracker.skip();
    }

    pub fn start_new_day(&mut self) {
        self.display_contiguous = Duration::ZERO;
        self.display_daily = Duration::ZERO;
        self.break_elapsed = Duration::ZERO;
        self.table_duration = Duration::ZERO;
        self.display_tracker.reset();
        self.table_tracker.reset();
        self.fired_display_contig = false;
        self.fired_display_daily = false;
        self.fired_table = false;
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            display_on: self.last_display_on,
            table_up: self.last_table_up,
            display_contiguous_secs: self.display_contiguous.as_secs(),
            display_daily_secs: self.display_daily.as_secs(),
            break_secs: self.break_elapsed.as_secs(),
            table_secs: self.table_duration.as_secs(),
            fired_display_contig: self.fired_display_contig,
            fired_display_daily: self.fired_display_daily,
            fired_table: self.fired_table,
        }
    }

    fn evaluate_display(
        &mut self,
        maximums: &Maximums,
        display_on: bool,
        elapsed: Duration,
        alerts: &mut Vec<Alert>,
    ) {
        let held = self.display_tracker.update(display_on);

        if display_on {
            self.break_elapsed = Duration::ZERO;
            self.display_contiguous += elapsed;
            self.display_daily += elapsed;

            if exceeds(self.display_contiguous, maximums.display_contig_max)
                && !self.fired_display_contig
            {
                log_info!(
                    "display on for {} without a break",
                    format_duration(self.display_contiguous)
                );
                self.fired_display_contig = true;
                alerts.push(Alert::ContinuousUse);
            }

            if exceeds(self.display_daily, maximums.display_daily_max)
                && !self.fired_display_daily
            {
                log_info!(
                    "worked {} today, that's enough",
                    format_duration(self.display_daily)
                );
                self.fired_display_daily = true;
                alerts.push(Alert::EndOfWorkday);
            }
        } else {
            self.break_elapsed = held;

            if exceeds(self.break_elapsed, maximums.break_duration) {
                if !self.display_contiguous.is_zero() {
                    log_info!(
                        "break of {} taken after {} of work",
                        format_duration(self.break_elapsed),
                        format_duration(self.display_contiguous)
                    );
                }
                self.display_contiguous = Duration::ZERO;
                self.table_duration = Duration::ZERO;
                self.table_tracker.reset();
                self.fired_display_contig = false;
                self.fired_table = false;
            }
        }
    }

    fn evaluate_table(&mut self, maximums: &Maximums, sample: Sample, alerts: &mut Vec<Alert>) {
        let changed = self
            .table_tracker
            .previous()
            .is_some_and(|previous| *previous != sample.table_up);
        self.table_duration = self
            .table_tracker
            .update_counting(sample.table_up, sample.display_on);

        if changed {
            log_debug!("table moved {}", if sample.table_up { "up" } else { "down" });
            self.fired_table = false;
            return;
        }

        if sample.display_on
            && exceeds(self.table_duration, maximums.table_state_max)
            && !self.fired_table
        {
            log_info!(
                "table in the same position for {}",
                format_duration(self.table_duration)
            );
            self.fired_table = true;
            alerts.push(Alert::ChangePosition);
        }
    }
}

impl Default for MonitorRuntimeState {
    fn default() -> Self {
        Self::new()
    }
}

/// Thresholds are compared at whole-second resolution.
fn exceeds(value: Duration, max: Duration) -> bool {
    value.as_secs() > max.as_secs()
}
