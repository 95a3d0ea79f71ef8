//! Tweet entity and hydrator.

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::client::Client;
use crate::entities::media::Media;
use crate::entities::place::Place;
use crate::entities::user::User;
use crate::entities::parse_legacy_time;
use crate::error::{Error, Result};
use crate::page::Page;
use crate::raw::{self, bool_at, count_at, str_at};

/// A tweet hydrated from a GraphQL result payload.
#[derive(Debug, Clone)]
pub struct Tweet {
    client: Client,
    /// Numeric id as a string (ids exceed f64 precision)
    pub id: String,
    /// Author, when the payload carried one
    pub user: Option<User>,
    /// Full tweet text
    pub text: String,
    /// BCP-47 language tag guessed upstream
    pub lang: String,
    /// Raw legacy-format creation timestamp
    pub created_at: String,
    /// Id of the tweet this replies to
    pub in_reply_to: Option<String>,
    pub is_quote_status: bool,
    /// Quoted tweet; degrades to a bare id past the hydration depth bound
    pub quote: Option<TweetRef>,
    /// Original tweet when this is a retweet; degrades to a bare id past
    /// the hydration depth bound
    pub retweeted_tweet: Option<TweetRef>,
    pub possibly_sensitive: bool,
    /// Tagged location, when the tweet carried one
    pub place: Option<Place>,
    pub media: Vec<Media>,
    pub hashtags: Vec<String>,
    pub urls: Vec<String>,
    pub user_mentions: Vec<String>,
    pub reply_count: u64,
    pub retweet_count: u64,
    pub favorite_count: u64,
    pub quote_count: u64,
    pub bookmark_count: u64,
    /// Impression count; served as a numeric string, absent on old tweets
    pub view_count: u64,
    pub favorited: bool,
    pub retweeted: bool,
    pub bookmarked: bool,
}

/// A nested tweet reference.
///
/// Quote chains can nest arbitrarily deep upstream; beyond the configured
/// hydration depth the chain terminates in [`TweetRef::Id`], which can be
/// fetched on demand.
#[derive(Debug, Clone)]
pub enum TweetRef {
    Tweet(Box<Tweet>),
    Id(String),
}

impl TweetRef {
    /// The referenced tweet's id, hydrated or not.
    pub fn id(&self) -> &str {
        match self {
            Self::Tweet(tweet) => &tweet.id,
            Self::Id(id) => id,
        }
    }

    pub fn as_tweet(&self) -> Option<&Tweet> {
        match self {
            Self::Tweet(tweet) => Some(tweet),
            Self::Id(_) => None,
        }
    }
}

impl Tweet {
    /// Hydrate from a `tweet_results.result` object.
    ///
    /// Fails only when the identity field is missing; everything else
    /// degrades to a default.
    pub(crate) fn from_result(client: &Client, result: &Value, depth: usize) -> Result<Self> {
        // Visibility-limited results wrap the real object one level down.
        let result = result.get("tweet").unwrap_or(result);

        let id = str_at(result, &["rest_id"])
            .or_else(|| str_at(result, &["legacy", "id_str"]))
            .map(str::to_string)
            .ok_or_else(|| Error::malformed("tweet", "missing rest_id"))?;

        let legacy = result.get("legacy").cloned().unwrap_or(Value::Null);

        let user = raw::path(result, &["core", "user_results", "result"])
            .and_then(|u| User::from_result(client, u).ok());

        let quote = hydrate_quote(client, result, &legacy, depth);
        let retweeted_tweet = hydrate_retweet(client, &legacy, depth);

        let media = raw::path(&legacy, &["extended_entities", "media"])
            .or_else(|| raw::path(&legacy, &["entities", "media"]))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|m| Media::from_value(m).ok()).collect())
            .unwrap_or_default();

        Ok(Self {
            client: client.clone(),
            id,
            user,
            text: str_at(&legacy, &["full_text"]).unwrap_or_default().to_string(),
            lang: str_at(&legacy, &["lang"]).unwrap_or_default().to_string(),
            created_at: str_at(&legacy, &["created_at"]).unwrap_or_default().to_string(),
            in_reply_to: str_at(&legacy, &["in_reply_to_status_id_str"]).map(str::to_string),
            is_quote_status: bool_at(&legacy, &["is_quote_status"]),
            quote,
            retweeted_tweet,
            possibly_sensitive: bool_at(&legacy, &["possibly_sensitive"]),
            place: legacy.get("place").and_then(|p| Place::from_value(p).ok()),
            media,
            hashtags: collect_entity_texts(&legacy, "hashtags", "text"),
            urls: collect_entity_texts(&legacy, "urls", "expanded_url"),
            user_mentions: collect_entity_texts(&legacy, "user_mentions", "screen_name"),
            reply_count: count_at(&legacy, &["reply_count"]),
            retweet_count: count_at(&legacy, &["retweet_count"]),
            favorite_count: count_at(&legacy, &["favorite_count"]),
            quote_count: count_at(&legacy, &["quote_count"]),
            bookmark_count: count_at(&legacy, &["bookmark_count"]),
            view_count: count_at(result, &["views", "count"]),
            favorited: bool_at(&legacy, &["favorited"]),
            retweeted: bool_at(&legacy, &["retweeted"]),
            bookmarked: bool_at(&legacy, &["bookmarked"]),
        })
    }

    /// Hydrate from an entry's content payload as produced by the walker.
    pub(crate) fn from_entry_content(client: &Client, content: &Value) -> Result<Self> {
        let result = raw::find_first(content, "tweet_results")
            .and_then(|tr| tr.get("result"))
            .ok_or_else(|| Error::malformed("tweet", "no tweet result in entry content"))?;
        Self::from_result(client, result, 0)
    }

    /// Creation time parsed from the legacy timestamp, when well-formed.
    pub fn created_at_datetime(&self) -> Option<DateTime<FixedOffset>> {
        parse_legacy_time(&self.created_at)
    }

    /// Canonical URL of this tweet.
    pub fn url(&self) -> String {
        match &self.user {
            Some(user) => format!("https://twitter.com/{}/status/{}", user.screen_name, self.id),
            None => format!("https://twitter.com/i/status/{}", self.id),
        }
    }

    // ── convenience actions ─────────────────────────────────────────────

    pub async fn favorite(&self) -> Result<()> {
        self.client.favorite_tweet(&self.id).await
    }

    pub async fn unfavorite(&self) -> Result<()> {
        self.client.unfavorite_tweet(&self.id).await
    }

    pub async fn retweet(&self) -> Result<()> {
        self.client.retweet(&self.id).await
    }

    pub async fn delete_retweet(&self) -> Result<()> {
        self.client.delete_retweet(&self.id).await
    }

    pub async fn delete(&self) -> Result<()> {
        self.client.delete_tweet(&self.id).await
    }

    pub async fn reply(&self, text: &str) -> Result<Tweet> {
        self.client.create_tweet(text, Some(&self.id)).await
    }

    /// Users who liked this tweet.
    pub async fn favoriters(&self, count: u32) -> Result<Page<User>> {
        self.client.tweet_favoriters(&self.id, count).await
    }

    /// Users who retweeted this tweet.
    pub async fn retweeters(&self, count: u32) -> Result<Page<User>> {
        self.client.tweet_retweeters(&self.id, count).await
    }
}

fn hydrate_quote(client: &Client, result: &Value, legacy: &Value, depth: usize) -> Option<TweetRef> {
    let quoted_id = str_at(legacy, &["quoted_status_id_str"]).map(str::to_string);
    let quoted_result = raw::path(result, &["quoted_status_result", "result"]);
    match quoted_result {
        Some(quoted) if depth < client.max_hydration_depth() => {
            match Tweet::from_result(client, quoted, depth + 1) {
                Ok(tweet) => Some(TweetRef::Tweet(Box::new(tweet))),
                Err(_) => quoted_id.map(TweetRef::Id),
            }
        }
        Some(quoted) => str_at(quoted.get("tweet").unwrap_or(quoted), &["rest_id"])
            .map(str::to_string)
            .or(quoted_id)
            .map(TweetRef::Id),
        None => quoted_id.map(TweetRef::Id),
    }
}

// Retweet chains nest the same way quotes do and share the same bound.
fn hydrate_retweet(client: &Client, legacy: &Value, depth: usize) -> Option<TweetRef> {
    let result = raw::path(legacy, &["retweeted_status_result", "result"])?;
    let fallback_id = || {
        str_at(result.get("tweet").unwrap_or(result), &["rest_id"])
            .or_else(|| str_at(legacy, &["retweeted_status_id_str"]))
            .map(str::to_string)
    };
    if depth < client.max_hydration_depth() {
        match Tweet::from_result(client, result, depth + 1) {
            Ok(tweet) => Some(TweetRef::Tweet(Box::new(tweet))),
            Err(_) => fallback_id().map(TweetRef::Id),
        }
    } else {
        fallback_id().map(TweetRef::Id)
    }
}

fn collect_entity_texts(legacy: &Value, group: &str, field: &str) -> Vec<String> {
    raw::path(legacy, &["entities", group])
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(field).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl PartialEq for Tweet {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Tweet {}
