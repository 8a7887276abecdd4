use chrono::{DateTime, Local, Utc};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Coarse relative age: `just now`, `5m ago`, `3h ago`, `2d ago`.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    if secs < 60 {
        return "just now".to_string();
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{mins}m ago");
    }
    let hours = mins / 60;
    if hours < 48 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", hours / 24)
}

/// `YYYY-MM-DD HH:MM` in the local time zone.
pub fn local_stamp(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    #[test]
    fn time_ago_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(time_ago(now, now), "just now");
        assert_eq!(time_ago(now + TimeDelta::minutes(5), now), "just now");
        assert_eq!(time_ago(now - TimeDelta::minutes(5), now), "5m ago");
        assert_eq!(time_ago(now - TimeDelta::hours(3), now), "3h ago");
        assert_eq!(time_ago(now - TimeDelta::hours(47), now), "47h ago");
        assert_eq!(time_ago(now - TimeDelta::days(3), now), "3d ago");
    }
}
