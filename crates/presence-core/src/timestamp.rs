//! Timestamp policy
//!
//! Maps a profile's timestamp configuration to a concrete start instant for
//! the presence payload. Pure and deterministic given `now`; resolved fresh
//! on every activation, never cached, since "now" moves.

use chrono::{DateTime, Utc};
use presence_api::TimestampConfig;

/// Resolve the claimed start instant for a presence payload.
///
/// `None` mode yields no instant (the companion shows no elapsed timer).
/// `RelativeOffset` backdates the start so a profile can claim "running for
/// N units" even though the session just began.
pub fn resolve_start(config: &TimestampConfig, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match config {
        TimestampConfig::None => None,
        TimestampConfig::RelativeOffset { magnitude, unit } => {
            let offset_seconds = magnitude.saturating_mul(unit.multiplier());
            Some(now - chrono::Duration::seconds(offset_seconds.min(i64::MAX as u64) as i64))
        }
    }
}
