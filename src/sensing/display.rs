use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, error};
use serde_json::Value;

use super::{DisplayPowerSensor, SensorError};

const REQUEST_TIMEOUT_SECS: u64 = 3;

/// Derives the display state from the wattage reported by the smart plug the
/// display is connected to.
///
/// The plug (or a bridge in front of it) serves its energy usage as JSON with
/// a `current_power` field in milliwatts, either at the top level or nested
/// under `result`.
pub struct PowerPlugDisplay {
    client: reqwest::Client,
    url: String,
    threshold_watts: f64,
    credentials: Option<(String, String)>,
}

impl PowerPlugDisplay {
    pub fn new(
        url: impl Into<String>,
        threshold_watts: f64,
        credentials: Option<(String, String)>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build smart plug HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
            threshold_watts,
            credentials,
        })
    }

    async fn current_power_milliwatts(&self) -> Result<f64, SensorError> {
        let mut request = self.client.get(&self.url);
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        let body: Value = request.send().await?.error_for_status()?.json().await?;
        debug!("got energy usage document: {body}");

        parse_current_power(&body)
            .ok_or_else(|| SensorError::Protocol(format!("no current_power in {body}")))
    }
}

#[async_trait]
impl DisplayPowerSensor for PowerPlugDisplay {
    async fn is_on(&mut self) -> Option<bool> {
        match self.current_power_milliwatts().await {
            Ok(milliwatts) => Some(power_indicates_on(milliwatts, self.threshold_watts)),
            Err(err) => {
                error!("cannot determine the state of the display: {err}");
                None
            }
        }
    }
}

pub(crate) fn parse_current_power(body: &Value) -> Option<f64> {
    let field = body
        .get("current_power")
        .or_else(|| body.get("result").and_then(|result| result.get("current_power")))?;

    match field {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn power_indicates_on(milliwatts: f64, threshold_watts: f64) -> bool {
    milliwatts / 1000.0 > threshold_watts
}
