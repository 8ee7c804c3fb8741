use std::path::PathBuf;

use clap::Parser;

use crate::settings::{ConfigError, Settings};

/// Work habits monitoring: watches desk position and display usage and
/// lights a USB bulb when it is time for a break or a position change.
#[derive(Debug, Parser)]
#[command(name = "workmon", version, about)]
pub struct Cli {
    /// JSON settings file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to serve metrics on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Sleep duration between iterations in seconds
    #[arg(short, long)]
    pub sleep: Option<u64>,

    /// Table height threshold in centimetres
    #[arg(long)]
    pub height: Option<f64>,

    /// Wattage threshold for detecting whether the display is on
    #[arg(short = 'W', long)]
    pub wattage: Option<f64>,

    /// URL of the smart plug energy usage document
    #[arg(long)]
    pub plug_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    pub log_level: log::LevelFilter,

    /// Maximum time without a break (seconds)
    #[arg(long)]
    pub display_contig_max: Option<u64>,

    /// Recommended work duration per day (seconds)
    #[arg(long)]
    pub display_daily_max: Option<u64>,

    /// Minimal duration of not working that counts as a break (seconds)
    #[arg(long)]
    pub break_duration: Option<u64>,

    /// Maximum time the table should stay in one position while working (seconds)
    #[arg(long)]
    pub table_state_max: Option<u64>,

    /// Hour (0-23) at which a new work day starts
    #[arg(long)]
    pub start_of_day: Option<u32>,

    /// How long a single alert lasts (seconds)
    #[arg(long)]
    pub alert_duration: Option<u64>,
}

impl Cli {
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        if let Some(port) = self.port {
            settings.metrics_port = port;
        }
        if let Some(sleep) = self.sleep {
            settings.sample_interval_secs = sleep;
        }
        if let Some(height) = self.height {
            settings.height_threshold_cm = height;
        }
        if let Some(wattage) = self.wattage {
            settings.wattage_threshold = wattage;
        }
        if let Some(url) = self.plug_url {
            settings.plug_url = Some(url);
        }
        if let Some(secs) = self.display_contig_max {
            settings.display_contig_max_secs = secs;
        }
        if let Some(secs) = self.display_daily_max {
            settings.display_daily_max_secs = secs;
        }
        if let Some(secs) = self.break_duration {
            settings.break_duration_secs = secs;
        }
        if let Some(secs) = self.table_state_max {
            settings.table_state_max_secs = secs;
        }
        if let Some(hour) = self.start_of_day {
            settings.start_of_day_hour = hour;
        }
        if let Some(secs) = self.alert_duration {
            settings.alert_duration_secs = secs;
        }

        Ok(settings)
    }
}
