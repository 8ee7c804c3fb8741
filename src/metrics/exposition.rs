use std::fmt::Write;

use crate::alert::Color;

use super::MetricsSnapshot;

/// Prometheus text exposition of a snapshot. Unknown sensor readings are
/// exported as `NaN`.
pub fn render_prometheus(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::new();
    let monitor = &snapshot.monitor;

    gauge(&mut out, "table_position", "Table position (1 = up)", reading(snapshot.table_position));
    gauge(&mut out, "display_status", "Display status (1 = on)", reading(snapshot.display_status));
    gauge(
        &mut out,
        "display_contiguous_seconds",
        "Display contiguous usage",
        monitor.display_contiguous_secs as f64,
    );
    gauge(
        &mut out,
        "display_daily_seconds",
        "Display usage today",
        monitor.display_daily_secs as f64,
    );
    gauge(&mut out, "break_seconds", "Current break length", monitor.break_secs as f64);
    gauge(
        &mut out,
        "table_state_seconds",
        "Time in the current table position",
        monitor.table_secs as f64,
    );

    header(&mut out, "alerts_total", "Alerts requested", "counter");
    for color in Color::ALL {
        let _ = writeln!(
            out,
            "alerts_total{{color=\"{color}\"}} {}",
            snapshot.alerts.get(color)
        );
    }
    header(&mut out, "sensor_failures_total", "Ticks skipped for missing readings", "counter");
    let _ = writeln!(out, "sensor_failures_total {}", snapshot.sensor_failures);

    gauge(
        &mut out,
        "process_cpu_percent",
        "CPU usage of this process",
        f64::from(snapshot.system.cpu_percent),
    );
    gauge(
        &mut out,
        "process_memory_megabytes",
        "Resident memory of this process",
        snapshot.system.memory_mb,
    );

    out
}

fn reading(value: Option<bool>) -> f64 {
    match value {
        Some(true) => 1.0,
        Some(false) => 0.0,
        None => f64::NAN,
    }
}

fn header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");
}

fn gauge(out: &mut String, name: &str, help: &str, value: f64) {
    header(out, name, help, "gauge");
    let _ = writeln!(out, "{name} {value}");
}
