// Display formatting for draw dates, times, and spoken countdowns.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};

/// Format a draw date as `02 MAR 2026`. Unparseable input is shown as-is
/// rather than hidden; missing input becomes the dashboard's placeholder.
pub fn draw_date(value: Option<&str>) -> String {
    let Some(raw) = value else {
        return "—".to_string();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%d %b %Y").to_string().to_uppercase();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%d %b %Y").to_string().to_uppercase();
    }
    raw.to_string()
}

/// Format a draw time as `3:05PM` (minutes omitted on the hour: `3PM`).
///
/// The server has sent times as `H`, `HH:MM`, `HH:MM:SS`, and as full
/// datetimes, so the bare-time forms are tried first and a datetime parse is
/// the fallback. Unparseable input is shown as-is.
pub fn draw_time(value: Option<&str>) -> String {
    let Some(raw) = value else {
        return "—".to_string();
    };
    let hour_minute = parse_bare_time(raw).or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| (dt.hour(), dt.minute()))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                    .map(|dt| (dt.hour(), dt.minute()))
            })
            .ok()
    });

    let Some((hour, minute)) = hour_minute else {
        return raw.to_string();
    };

    let period = if hour >= 12 { "PM" } else { "AM" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    if minute == 0 {
        format!("{hour12}{period}")
    } else {
        format!("{hour12}:{minute:02}{period}")
    }
}

/// Parse `H`, `HH`, `HH:MM`, or `HH:MM:SS` into (hour, minute).
fn parse_bare_time(raw: &str) -> Option<(u32, u32)> {
    let mut parts = raw.split(':');
    let hour: u32 = parts.next()?.trim().parse().ok()?;
    if hour > 23 {
        return None;
    }
    let minute: u32 = match parts.next() {
        Some(m) => m.trim().parse().ok()?,
        None => 0,
    };
    if minute > 59 {
        return None;
    }
    // A seconds component is accepted and ignored; anything further is not.
    match parts.next() {
        Some(s) if s.trim().parse::<u32>().is_err() => return None,
        _ => {}
    }
    if parts.next().is_some() {
        return None;
    }
    Some((hour, minute))
}

/// Compose a spoken duration: "2 minutes 30 seconds", "1 minute", "45 seconds".
/// Zero yields an empty string (callers skip empty utterances).
pub fn spoken_time(total_seconds: u32) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    let mut parts = Vec::new();
    if minutes > 0 {
        parts.push(format!("{minutes} minute{}", if minutes == 1 { "" } else { "s" }));
    }
    if seconds > 0 {
        parts.push(format!("{seconds} second{}", if seconds == 1 { "" } else { "s" }));
    }
    parts.join(" ")
}

/// mm:ss split for the countdown display.
pub fn clock_digits(total_seconds: u32) -> (String, String) {
    (
        format!("{:02}", total_seconds / 60),
        format!("{:02}", total_seconds % 60),
    )
}
