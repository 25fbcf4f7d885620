use chrono::{DateTime, Local};

/// This is the standard way of showing time spent in worktally: `H:MM:SS`, hours unbounded.
pub fn format_elapsed(millis: u64) -> String {
    let seconds = millis / 1000;
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

/// Local time for an epoch-millisecond timestamp. `None` for values chrono can't represent.
pub fn local_from_millis(millis: i64) -> Option<DateTime<Local>> {
    DateTime::from_timestamp_millis(millis).map(|v| v.with_timezone(&Local))
}
