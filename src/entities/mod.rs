//! Typed entities hydrated from raw API payloads.
//!
//! Hydration is deliberately forgiving: the only unrecoverable condition is
//! a missing identity field, which raises
//! [`Error::MalformedEntity`](crate::Error::MalformedEntity). Every other
//! absent field degrades to a documented default (empty string, zero count,
//! `None`), since the platform routinely omits fields per experiment bucket.
//!
//! Entities that support convenience actions hold a cheap clone of the
//! [`Client`](crate::Client) they were hydrated through; equality and
//! hashing consider only the entity id.

mod community;
mod media;
mod message;
mod notification;
mod place;
mod trend;
mod tweet;
mod user;

pub use community::Community;
pub use media::{Media, MediaKind, VideoInfo, VideoVariant};
pub use message::Message;
pub use notification::Notification;
pub use place::Place;
pub use trend::Trend;
pub use tweet::{Tweet, TweetRef};
pub use user::User;

use chrono::{DateTime, FixedOffset};

/// Timestamp format used by legacy payload fields,
/// e.g. "Wed Oct 10 20:19:24 +0000 2018".
pub(crate) const LEGACY_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Parse a legacy-format timestamp; malformed or absent input degrades to
/// `None` rather than failing hydration.
pub(crate) fn parse_legacy_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw, LEGACY_TIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_timestamps_parse() {
        let parsed = parse_legacy_time("Wed Oct 10 20:19:24 +0000 2018").unwrap();
        assert_eq!(parsed.timestamp(), 1539202764);
        assert!(parse_legacy_time("not a time").is_none());
    }
}
