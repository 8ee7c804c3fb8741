pub mod alert;
pub mod cli;
pub mod metrics;
pub mod monitor;
pub mod sensing;
pub mod settings;
pub mod tracking;
pub mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use alert::{AlertDispatcher, UsbBulb};
use cli::Cli;
use metrics::MetricsCollector;
use monitor::{Maximums, MonitorController, Workmon};
use sensing::{PowerPlugDisplay, Us100Table};
use settings::Settings;
use utils::find_serial_device;

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(cli.log_level)
        .init();

    let settings = cli.into_settings().context("invalid configuration")?;
    let maximums = Maximums::try_from(&settings).context("invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    runtime.block_on(monitor_until_interrupted(settings, maximums))
}

async fn monitor_until_interrupted(settings: Settings, maximums: Maximums) -> Result<()> {
    info!("workmon starting up...");

    let table_path = serial_device(&settings.table_serial_id, "table sensor")?;
    let bulb_path = serial_device(&settings.bulb_serial_id, "signal bulb")?;

    let table = Us100Table::open(&table_path, settings.height_threshold_cm)?;
    let bulb = UsbBulb::open(&bulb_path)?;
    let display = PowerPlugDisplay::new(
        settings.plug_url()?,
        settings.wattage_threshold,
        plug_credentials(),
    )?;

    let dispatcher = Arc::new(AlertDispatcher::spawn(bulb));
    let metrics = MetricsCollector::new();
    let listener = metrics.spawn_alert_listener(dispatcher.subscribe());

    let server_token = CancellationToken::new();
    let server = tokio::spawn(metrics::server::serve(
        metrics::server::bind(settings.metrics_port).await?,
        metrics.clone(),
        server_token.clone(),
    ));

    let mut controller = MonitorController::new();
    controller.start_monitoring(
        Workmon::new(display, table, maximums, Arc::clone(&dispatcher)).with_metrics(metrics),
    )?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("interrupted, shutting down");

    let stopped = controller.stop_monitoring().await;
    // The dispatcher is gone by now, which also ends the alert listener.
    drop(dispatcher);
    server_token.cancel();

    match server.await {
        Ok(Err(err)) => warn!("{err:#}"),
        Err(err) => warn!("metrics server task failed: {err}"),
        Ok(Ok(())) => {}
    }
    if let Err(err) = listener.await {
        warn!("alert listener task failed: {err}");
    }

    stopped
}

fn serial_device(id: &str, what: &str) -> Result<PathBuf> {
    find_serial_device(id)
        .with_context(|| format!("cannot list serial devices while looking for the {what}"))?
        .with_context(|| format!("no serial device matching {id:?} for the {what}"))
}

fn plug_credentials() -> Option<(String, String)> {
    let username = std::env::var("WORKMON_PLUG_USERNAME").ok()?;
    let password = std::env::var("WORKMON_PLUG_PASSWORD").ok()?;
    Some((username, password))
}
