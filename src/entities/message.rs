//! Direct message entity.

use serde_json::Value;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::raw::str_at;

/// One direct message in a one-to-one conversation.
#[derive(Debug, Clone)]
pub struct Message {
    client: Client,
    /// Numeric id as a string
    pub id: String,
    /// Send time in epoch milliseconds, as served
    pub time: String,
    pub text: String,
    pub sender_id: String,
    pub recipient_id: String,
    /// Raw attachment payload, when the message carried one
    pub attachment: Option<Value>,
}

impl Message {
    /// Hydrate from a conversation entry's `message_data` payload.
    pub(crate) fn from_message_data(
        client: &Client,
        data: &Value,
        recipient_id: &str,
    ) -> Result<Self> {
        let id = str_at(data, &["id"])
            .map(str::to_string)
            .ok_or_else(|| Error::malformed("message", "missing id"))?;
        Ok(Self {
            client: client.clone(),
            id,
            time: str_at(data, &["time"]).unwrap_or_default().to_string(),
            text: str_at(data, &["text"]).unwrap_or_default().to_string(),
            sender_id: str_at(data, &["sender_id"]).unwrap_or_default().to_string(),
            recipient_id: str_at(data, &["recipient_id"])
                .unwrap_or(recipient_id)
                .to_string(),
            attachment: data.get("attachment").cloned(),
        })
    }

    /// Send time in epoch milliseconds, when well-formed.
    pub fn time_ms(&self) -> Option<i64> {
        self.time.parse().ok()
    }

    /// Id of the conversation partner, from the logged-in account's view.
    fn partner_id(&self) -> &str {
        match self.client.user_id() {
            Some(me) if me == self.sender_id => &self.recipient_id,
            _ => &self.sender_id,
        }
    }

    /// Reply in this conversation.
    pub async fn reply(&self, text: &str) -> Result<Message> {
        self.client.send_dm(self.partner_id(), text).await
    }

    /// Delete this message for the logged-in account.
    pub async fn delete(&self) -> Result<()> {
        self.client.delete_dm(&self.id).await
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Message {}
