use chrono::{DateTime, Duration, Utc};

/// Data older than this is refreshed automatically.
pub fn staleness_threshold() -> Duration {
    Duration::days(7)
}

/// A missing timestamp is infinitely stale. Timestamps in the future
/// (clock skew) are treated as fresh.
pub fn is_stale(last_update: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_update {
        None => true,
        Some(last) => now.signed_duration_since(last) >= staleness_threshold(),
    }
}
