use time::{Duration, OffsetDateTime};

/// A user with no gate on record may always spin. The boundary is
/// inclusive: at exactly `next_allowed_at` the spin goes through.
pub fn is_allowed(now: OffsetDateTime, next_allowed_at: Option<OffsetDateTime>) -> bool {
    match next_allowed_at {
        None => true,
        Some(gate) => now >= gate,
    }
}

pub fn next_allowed_at(now: OffsetDateTime, cooldown_seconds: i64) -> OffsetDateTime {
    now + Duration::seconds(cooldown_seconds)
}
