//! Community entity.

use serde_json::Value;

use crate::client::Client;
use crate::entities::tweet::Tweet;
use crate::error::{Error, Result};
use crate::page::Page;
use crate::raw::{count_at, str_at};

/// A community hydrated from a GraphQL community result.
#[derive(Debug, Clone)]
pub struct Community {
    client: Client,
    pub id: String,
    pub name: String,
    pub description: String,
    pub member_count: u64,
    /// Join policy, e.g. "Open" or "RestrictedJoinRequestsRequireModeratorApproval"
    pub join_policy: String,
    /// The logged-in account's role, when a member
    pub role: Option<String>,
    pub is_nsfw: bool,
}

impl Community {
    pub(crate) fn from_result(client: &Client, result: &Value) -> Result<Self> {
        let id = str_at(result, &["rest_id"])
            .or_else(|| str_at(result, &["id_str"]))
            .map(str::to_string)
            .ok_or_else(|| Error::malformed("community", "missing rest_id"))?;
        Ok(Self {
            client: client.clone(),
            id,
            name: str_at(result, &["name"]).unwrap_or_default().to_string(),
            description: str_at(result, &["description"]).unwrap_or_default().to_string(),
            member_count: count_at(result, &["member_count"]),
            join_policy: str_at(result, &["join_policy"]).unwrap_or_default().to_string(),
            role: str_at(result, &["role"])
                .filter(|r| *r != "NonMember")
                .map(str::to_string),
            is_nsfw: result
                .get("is_nsfw")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }

    /// Recent tweets posted in this community.
    pub async fn tweets(&self, count: u32) -> Result<Page<Tweet>> {
        self.client.community_tweets(&self.id, count).await
    }
}

impl PartialEq for Community {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Community {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use serde_json::json;

    #[test]
    fn hydrates_with_defaults() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let community = Community::from_result(
            &client,
            &json!({
                "rest_id": "160", "name": "Rustaceans",
                "member_count": 5000, "join_policy": "Open", "role": "Member"
            }),
        )
        .unwrap();
        assert_eq!(community.name, "Rustaceans");
        assert_eq!(community.role.as_deref(), Some("Member"));
        assert!(!community.is_nsfw);
    }

    #[test]
    fn non_member_role_is_none() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let community =
            Community::from_result(&client, &json!({"rest_id": "1", "role": "NonMember"}))
                .unwrap();
        assert!(community.role.is_none());
    }
}
