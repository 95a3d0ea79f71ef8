//! Notification entity.

use serde_json::Value;

use crate::entities::tweet::Tweet;
use crate::entities::user::User;
use crate::error::{Error, Result};
use crate::raw::{path, str_at};

/// One notification from the notifications timeline.
///
/// The timeline response carries notifications and their referenced tweets
/// and users in separate lookup tables; the hydrator receives the already
/// joined pieces.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: String,
    /// Delivery time in epoch milliseconds
    pub timestamp_ms: i64,
    /// Icon discriminator, e.g. "heart_icon"
    pub icon: String,
    /// Rendered notification text
    pub message: String,
    /// Tweet the notification refers to, when one was joined
    pub tweet: Option<Tweet>,
    /// Account that triggered the notification, when one was joined
    pub from_user: Option<User>,
}

impl Notification {
    pub(crate) fn from_parts(
        value: &Value,
        tweet: Option<Tweet>,
        from_user: Option<User>,
    ) -> Result<Self> {
        let id = str_at(value, &["id"])
            .map(str::to_string)
            .ok_or_else(|| Error::malformed("notification", "missing id"))?;
        Ok(Self {
            id,
            timestamp_ms: str_at(value, &["timestampMs"])
                .and_then(|t| t.parse().ok())
                .unwrap_or(0),
            icon: str_at(value, &["icon", "id"]).unwrap_or_default().to_string(),
            message: path(value, &["message", "text"])
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            tweet,
            from_user,
        })
    }
}

impl PartialEq for Notification {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Notification {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hydrates_from_lookup_entry() {
        let value = json!({
            "id": "1790",
            "timestampMs": "1716900000000",
            "icon": {"id": "heart_icon"},
            "message": {"text": "Someone liked your post"}
        });
        let notification = Notification::from_parts(&value, None, None).unwrap();
        assert_eq!(notification.id, "1790");
        assert_eq!(notification.timestamp_ms, 1716900000000);
        assert_eq!(notification.icon, "heart_icon");
        assert_eq!(notification.message, "Someone liked your post");
    }

    #[test]
    fn missing_id_is_malformed() {
        assert!(Notification::from_parts(&json!({"icon": {}}), None, None).is_err());
    }
}
