use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_TTL_DAYS: i64 = 30;

/// An entry is expired once strictly more than `ttl` has passed since it was written.
pub(crate) fn is_expired(created: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    now.signed_duration_since(created) > ttl
}
