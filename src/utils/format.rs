use std::time::Duration;

/// Render a duration for log lines: `42s`, `5:07`, `1:02:03`.
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    if seconds < 60 {
        return format!("{seconds}s");
    }

    if seconds < 3600 {
        return format!("{}:{:02}", seconds / 60, seconds % 60);
    }

    let hours = seconds / 3600;
    let remainder = seconds % 3600;
    format!("{}:{:02}:{:02}", hours, remainder / 60, remainder % 60)
}
