use std::time::Duration;
use time::format_description::well_known::Rfc3339;

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Rounds half-up to whole milliseconds.
pub fn round_millis(d: Duration) -> u64 {
    let micros = d.as_micros();
    ((micros + 500) / 1000) as u64
}
