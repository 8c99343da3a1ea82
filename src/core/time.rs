use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub(crate) fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Whole seconds between `started_at` and `now`, floored and never negative.
pub(crate) fn elapsed_seconds(started_at: OffsetDateTime, now: OffsetDateTime) -> u64 {
    let seconds = (now - started_at).whole_seconds();
    u64::try_from(seconds).unwrap_or(0)
}

pub(crate) fn format_offset(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}
