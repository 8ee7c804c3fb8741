use serde::{Deserialize, Serialize};
use std::{fs, io, path::{Path, PathBuf}};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings from {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Every tunable of the monitor. Fields missing from a settings file fall
/// back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub sample_interval_secs: u64,
    /// Maximum time with the display on without a break.
    pub display_contig_max_secs: u64,
    /// Recommended daily work duration.
    pub display_daily_max_secs: u64,
    /// Minimal display-off duration that counts as a break.
    pub break_duration_secs: u64,
    /// Maximum time the desk should stay in one position while working.
    pub table_state_max_secs: u64,
    /// Local hour at which a new work day begins.
    pub start_of_day_hour: u32,
    pub alert_duration_secs: u64,
    /// Plug wattage above which the display counts as on.
    pub wattage_threshold: f64,
    /// Distance above which the desk counts as raised.
    pub height_threshold_cm: f64,
    pub metrics_port: u16,
    pub table_serial_id: String,
    pub bulb_serial_id: String,
    pub plug_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sample_interval_secs: 5,
            display_contig_max_secs: 3600,
            display_daily_max_secs: 7 * 3600,
            break_duration_secs: 5 * 60,
            table_state_max_secs: 20 * 60,
            start_of_day_hour: 6,
            alert_duration_secs: 10,
            // Samsung 24" display takes ~74W when on.
            wattage_threshold: 70.0,
            height_threshold_cm: 120.0,
            metrics_port: 8111,
            table_serial_id: "Silicon_Labs_CP2102".into(),
            bulb_serial_id: "1a86".into(),
            plug_url: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn plug_url(&self) -> Result<&str, ConfigError> {
        self.plug_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("smart plug URL"))
    }
}
