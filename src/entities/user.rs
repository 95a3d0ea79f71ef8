//! User entity and hydrator.

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::client::Client;
use crate::entities::parse_legacy_time;
use crate::entities::tweet::Tweet;
use crate::error::{Error, Result};
use crate::page::Page;
use crate::raw::{self, bool_at, count_at, str_at};

/// An account hydrated from a GraphQL `user_results.result` payload.
#[derive(Debug, Clone)]
pub struct User {
    client: Client,
    /// Numeric id as a string
    pub id: String,
    /// Display name
    pub name: String,
    /// Handle, without the leading `@`
    pub screen_name: String,
    pub description: String,
    pub location: String,
    pub url: Option<String>,
    /// Raw legacy-format account creation timestamp
    pub created_at: String,
    pub profile_image_url: String,
    pub profile_banner_url: Option<String>,
    pub protected: bool,
    pub verified: bool,
    pub is_blue_verified: bool,
    pub can_dm: bool,
    pub followers_count: u64,
    pub following_count: u64,
    pub statuses_count: u64,
    pub favourites_count: u64,
    pub listed_count: u64,
    pub media_count: u64,
    pub pinned_tweet_ids: Vec<String>,
}

impl User {
    /// Hydrate from a `user_results.result` object. Fails only on a missing
    /// identity field.
    pub(crate) fn from_result(client: &Client, result: &Value) -> Result<Self> {
        let id = str_at(result, &["rest_id"])
            .or_else(|| str_at(result, &["legacy", "id_str"]))
            .map(str::to_string)
            .ok_or_else(|| Error::malformed("user", "missing rest_id"))?;

        let legacy = result.get("legacy").cloned().unwrap_or(Value::Null);

        let pinned_tweet_ids = raw::path(&legacy, &["pinned_tweet_ids_str"])
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            client: client.clone(),
            id,
            name: str_at(&legacy, &["name"]).unwrap_or_default().to_string(),
            screen_name: str_at(&legacy, &["screen_name"]).unwrap_or_default().to_string(),
            description: str_at(&legacy, &["description"]).unwrap_or_default().to_string(),
            location: str_at(&legacy, &["location"]).unwrap_or_default().to_string(),
            url: str_at(&legacy, &["url"]).map(str::to_string),
            created_at: str_at(&legacy, &["created_at"]).unwrap_or_default().to_string(),
            profile_image_url: str_at(&legacy, &["profile_image_url_https"])
                .unwrap_or_default()
                .to_string(),
            profile_banner_url: str_at(&legacy, &["profile_banner_url"]).map(str::to_string),
            protected: bool_at(&legacy, &["protected"]),
            verified: bool_at(&legacy, &["verified"]),
            is_blue_verified: bool_at(result, &["is_blue_verified"]),
            can_dm: bool_at(&legacy, &["can_dm"]),
            followers_count: count_at(&legacy, &["followers_count"]),
            following_count: count_at(&legacy, &["friends_count"]),
            statuses_count: count_at(&legacy, &["statuses_count"]),
            favourites_count: count_at(&legacy, &["favourites_count"]),
            listed_count: count_at(&legacy, &["listed_count"]),
            media_count: count_at(&legacy, &["media_count"]),
            pinned_tweet_ids,
        })
    }

    /// Hydrate from an entry's content payload as produced by the walker.
    pub(crate) fn from_entry_content(client: &Client, content: &Value) -> Result<Self> {
        let result = raw::find_first(content, "user_results")
            .and_then(|ur| ur.get("result"))
            .ok_or_else(|| Error::malformed("user", "no user result in entry content"))?;
        Self::from_result(client, result)
    }

    /// Account creation time parsed from the legacy timestamp.
    pub fn created_at_datetime(&self) -> Option<DateTime<FixedOffset>> {
        parse_legacy_time(&self.created_at)
    }

    /// Canonical URL of this profile.
    pub fn url_path(&self) -> String {
        format!("https://twitter.com/{}", self.screen_name)
    }

    // ── convenience actions ─────────────────────────────────────────────

    pub async fn follow(&self) -> Result<()> {
        self.client.follow_user(&self.id).await
    }

    pub async fn unfollow(&self) -> Result<()> {
        self.client.unfollow_user(&self.id).await
    }

    /// This account's tweets tab.
    pub async fn tweets(&self, count: u32) -> Result<Page<Tweet>> {
        self.client
            .user_tweets(&self.id, crate::client::UserTweetKind::Tweets, count)
            .await
    }

    /// Accounts following this one.
    pub async fn followers(&self, count: u32) -> Result<Page<User>> {
        self.client.user_followers(&self.id, count).await
    }

    /// Accounts this one follows.
    pub async fn following(&self, count: u32) -> Result<Page<User>> {
        self.client.user_following(&self.id, count).await
    }

    /// Open a direct-message conversation history with this account.
    pub async fn dm_history(&self) -> Result<Page<crate::entities::Message>> {
        self.client.dm_history(&self.id).await
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}
