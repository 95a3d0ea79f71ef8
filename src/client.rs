//! Client facade.
//!
//! [`Client`] is a cheaply clonable handle over shared transport and session
//! state; entities hold one for their convenience actions. All operations
//! speak the web client's private API, so a logged-in session (or imported
//! cookies) is required for anything beyond guest-accessible lookups.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::{self, LoginArgs};
use crate::challenge::{ChallengeSolver, NodeSolver};
use crate::config::{ClientConfig, RateLimitInfo};
use crate::endpoints::{self, Endpoints};
use crate::entities::{Community, Message, Notification, Trend, Tweet, User};
use crate::error::{Error, Result};
use crate::page::{FetchFn, Page};
use crate::raw::{self, str_at, CursorPosition, EntryKind};
use crate::stream::StreamSession;
use crate::transport::Transport;

/// Which of a profile's tweet tabs to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTweetKind {
    Tweets,
    Replies,
    Media,
    Likes,
}

impl UserTweetKind {
    fn op(self) -> endpoints::GqlOp {
        match self {
            Self::Tweets => endpoints::USER_TWEETS,
            Self::Replies => endpoints::USER_TWEETS_AND_REPLIES,
            Self::Media => endpoints::USER_MEDIA,
            Self::Likes => endpoints::USER_LIKES,
        }
    }
}

/// Handle to a client session.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Transport,
    endpoints: Endpoints,
    solver: Box<dyn ChallengeSolver>,
}

impl Client {
    /// Create a client that solves login challenges with a local `node`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_solver(config, Box::new(NodeSolver::new()))
    }

    /// Create a client with a custom challenge solver.
    pub fn with_solver(config: ClientConfig, solver: Box<dyn ChallengeSolver>) -> Result<Self> {
        let endpoints = Endpoints::new(&config);
        let transport = Transport::new(config)?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                transport,
                endpoints,
                solver,
            }),
        })
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    pub(crate) fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    pub(crate) fn max_hydration_depth(&self) -> usize {
        self.inner.transport.config.max_hydration_depth
    }

    /// Rate-limit window reported by the most recent response.
    pub fn last_rate_limit(&self) -> RateLimitInfo {
        self.inner.transport.last_rate_limit()
    }

    // ── session ─────────────────────────────────────────────────────────

    /// Run the onboarding login flow and establish session cookies.
    ///
    /// Returns the final flow response for callers that want to inspect it.
    pub async fn login(&self, args: LoginArgs<'_>) -> Result<Value> {
        auth::login(
            self.transport(),
            self.endpoints(),
            self.inner.solver.as_ref(),
            args,
        )
        .await
    }

    /// End the session server-side and drop all cookies.
    pub async fn logout(&self) -> Result<()> {
        auth::logout(self.transport(), self.endpoints()).await
    }

    /// Logged-in account id, parsed from the session cookie.
    pub fn user_id(&self) -> Option<String> {
        parse_twid(&self.transport().cookie("twid")?)
    }

    /// Whether the client holds a logged-in session.
    pub fn is_authenticated(&self) -> bool {
        self.transport().is_authenticated()
    }

    /// Export the session cookies.
    pub fn get_cookies(&self) -> HashMap<String, String> {
        self.transport().cookies_snapshot()
    }

    /// Import session cookies, optionally clearing existing ones first.
    pub fn set_cookies(&self, cookies: HashMap<String, String>, clear_cookies: bool) {
        self.transport().replace_cookies(cookies, clear_cookies);
    }

    /// Persist the session cookies as JSON.
    pub async fn save_cookies(&self, path: impl AsRef<Path>) -> Result<()> {
        self.transport().save_cookies(path.as_ref()).await
    }

    /// Restore session cookies saved with [`Client::save_cookies`].
    pub async fn load_cookies(&self, path: impl AsRef<Path>) -> Result<()> {
        self.transport().load_cookies(path.as_ref()).await
    }

    // ── lookups ─────────────────────────────────────────────────────────

    /// The logged-in account's own profile.
    pub async fn me(&self) -> Result<User> {
        let response = self
            .transport()
            .get_json(&self.endpoints().account_settings(), &[])
            .await?;
        let screen_name = str_at(&response, &["screen_name"])
            .ok_or_else(|| Error::Auth("settings response carried no screen name".into()))?
            .to_string();
        self.user_by_screen_name(&screen_name).await
    }

    /// Fetch a user by handle.
    pub async fn user_by_screen_name(&self, screen_name: &str) -> Result<User> {
        let variables = json!({
            "screen_name": screen_name,
            "withSafetyModeUserFields": false
        });
        let url = self.endpoints().gql(endpoints::USER_BY_SCREEN_NAME);
        let params = endpoints::gql_get_params(&variables, Some(&endpoints::USER_FEATURES));
        let response = self.transport().get_json(&url, &params).await?;
        let result = raw::path(&response, &["data", "user", "result"])
            .ok_or_else(|| Error::malformed("user", "no result for screen name"))?;
        User::from_result(self, result)
    }

    /// Fetch a user by id.
    pub async fn user_by_id(&self, user_id: &str) -> Result<User> {
        let variables = json!({
            "userId": user_id,
            "withSafetyModeUserFields": false
        });
        let url = self.endpoints().gql(endpoints::USER_BY_REST_ID);
        let params = endpoints::gql_get_params(&variables, Some(&endpoints::USER_FEATURES));
        let response = self.transport().get_json(&url, &params).await?;
        let result = raw::path(&response, &["data", "user", "result"])
            .ok_or_else(|| Error::malformed("user", "no result for user id"))?;
        User::from_result(self, result)
    }

    /// Fetch a single tweet by id.
    pub async fn tweet_by_id(&self, tweet_id: &str) -> Result<Tweet> {
        let variables = json!({
            "tweetId": tweet_id,
            "withCommunity": false,
            "includePromotedContent": false,
            "withVoice": false
        });
        let url = self.endpoints().gql(endpoints::TWEET_RESULT_BY_REST_ID);
        let params = endpoints::gql_get_params(&variables, Some(&endpoints::TIMELINE_FEATURES));
        let response = self.transport().get_json(&url, &params).await?;
        let result = raw::path(&response, &["data", "tweetResult", "result"])
            .ok_or_else(|| Error::malformed("tweet", "no result for tweet id"))?;
        Tweet::from_result(self, result, 0)
    }

    // ── search ──────────────────────────────────────────────────────────

    /// Search tweets. `product` is the result tab: "Top", "Latest", or
    /// "Media".
    pub async fn search_tweet(
        &self,
        query: &str,
        product: &str,
        count: u32,
    ) -> Result<Page<Tweet>> {
        self.search_timeline_tweets(query.to_string(), product.to_string(), count, None)
            .await
    }

    /// Search users by query.
    pub async fn search_user(&self, query: &str, count: u32) -> Result<Page<User>> {
        self.search_timeline_users(query.to_string(), count, None).await
    }

    async fn search_timeline_raw(
        &self,
        query: &str,
        product: &str,
        count: u32,
        cursor: Option<&str>,
    ) -> Result<Value> {
        let mut variables = json!({
            "rawQuery": query,
            "count": count,
            "querySource": "typed_query",
            "product": product
        });
        if let Some(cursor) = cursor {
            variables["cursor"] = json!(cursor);
        }
        let url = self.endpoints().gql(endpoints::SEARCH_TIMELINE);
        let params = endpoints::gql_get_params(&variables, Some(&endpoints::TIMELINE_FEATURES));
        self.transport().get_json(&url, &params).await
    }

    fn search_timeline_tweets(
        &self,
        query: String,
        product: String,
        count: u32,
        cursor: Option<String>,
    ) -> futures_util::future::BoxFuture<'static, Result<Page<Tweet>>> {
        let client = self.clone();
        async move {
            let response = client
                .search_timeline_raw(&query, &product, count, cursor.as_deref())
                .await?;
            let fetch: FetchFn<Tweet> = {
                let client = client.clone();
                Arc::new(move |cursor| {
                    client.search_timeline_tweets(
                        query.clone(),
                        product.clone(),
                        count,
                        Some(cursor),
                    )
                })
            };
            client.tweet_page(&response, fetch)
        }
        .boxed()
    }

    fn search_timeline_users(
        &self,
        query: String,
        count: u32,
        cursor: Option<String>,
    ) -> futures_util::future::BoxFuture<'static, Result<Page<User>>> {
        let client = self.clone();
        async move {
            let response = client
                .search_timeline_raw(&query, "People", count, cursor.as_deref())
                .await?;
            let fetch: FetchFn<User> = {
                let client = client.clone();
                Arc::new(move |cursor| {
                    client.search_timeline_users(query.clone(), count, Some(cursor))
                })
            };
            client.user_page(&response, fetch)
        }
        .boxed()
    }

    // ── timelines ───────────────────────────────────────────────────────

    /// The algorithmic "For You" timeline.
    pub async fn home_timeline(&self, count: u32) -> Result<Page<Tweet>> {
        self.home_timeline_page(endpoints::HOME_TIMELINE, count, None)
            .await
    }

    /// The chronological "Following" timeline.
    pub async fn home_latest_timeline(&self, count: u32) -> Result<Page<Tweet>> {
        self.home_timeline_page(endpoints::HOME_LATEST_TIMELINE, count, None)
            .await
    }

    fn home_timeline_page(
        &self,
        op: endpoints::GqlOp,
        count: u32,
        cursor: Option<String>,
    ) -> futures_util::future::BoxFuture<'static, Result<Page<Tweet>>> {
        let client = self.clone();
        async move {
            let mut variables = json!({
                "count": count,
                "includePromotedContent": false,
                "latestControlAvailable": true,
                "withCommunity": true
            });
            if let Some(cursor) = &cursor {
                variables["cursor"] = json!(cursor);
            }
            let body = endpoints::gql_post_body(
                op,
                variables,
                Some(&endpoints::TIMELINE_FEATURES),
            );
            let url = client.endpoints().gql(op);
            let response = client.transport().post_json(&url, Some(&body)).await?;
            let fetch: FetchFn<Tweet> = {
                let client = client.clone();
                Arc::new(move |cursor| client.home_timeline_page(op, count, Some(cursor)))
            };
            client.tweet_page(&response, fetch)
        }
        .boxed()
    }

    /// One of a user's tweet tabs.
    pub async fn user_tweets(
        &self,
        user_id: &str,
        kind: UserTweetKind,
        count: u32,
    ) -> Result<Page<Tweet>> {
        self.user_tweets_page(user_id.to_string(), kind, count, None)
            .await
    }

    fn user_tweets_page(
        &self,
        user_id: String,
        kind: UserTweetKind,
        count: u32,
        cursor: Option<String>,
    ) -> futures_util::future::BoxFuture<'static, Result<Page<Tweet>>> {
        let client = self.clone();
        async move {
            let mut variables = json!({
                "userId": user_id,
                "count": count,
                "includePromotedContent": false,
                "withQuickPromoteEligibilityTweetFields": false,
                "withVoice": true,
                "withV2Timeline": true
            });
            if let Some(cursor) = &cursor {
                variables["cursor"] = json!(cursor);
            }
            let url = client.endpoints().gql(kind.op());
            let params = endpoints::gql_get_params(
                &variables,
                Some(&endpoints::TIMELINE_FEATURES),
            );
            let response = client.transport().get_json(&url, &params).await?;
            let fetch: FetchFn<Tweet> = {
                let client = client.clone();
                Arc::new(move |cursor| {
                    client.user_tweets_page(user_id.clone(), kind, count, Some(cursor))
                })
            };
            client.tweet_page(&response, fetch)
        }
        .boxed()
    }

    /// Users who liked a tweet.
    pub async fn tweet_favoriters(&self, tweet_id: &str, count: u32) -> Result<Page<User>> {
        self.tweet_engagers_page(endpoints::FAVORITERS, tweet_id.to_string(), count, None)
            .await
    }

    /// Users who retweeted a tweet.
    pub async fn tweet_retweeters(&self, tweet_id: &str, count: u32) -> Result<Page<User>> {
        self.tweet_engagers_page(endpoints::RETWEETERS, tweet_id.to_string(), count, None)
            .await
    }

    fn tweet_engagers_page(
        &self,
        op: endpoints::GqlOp,
        tweet_id: String,
        count: u32,
        cursor: Option<String>,
    ) -> futures_util::future::BoxFuture<'static, Result<Page<User>>> {
        let client = self.clone();
        async move {
            let mut variables = json!({
                "tweetId": tweet_id,
                "count": count,
                "includePromotedContent": false
            });
            if let Some(cursor) = &cursor {
                variables["cursor"] = json!(cursor);
            }
            let url = client.endpoints().gql(op);
            let params = endpoints::gql_get_params(
                &variables,
                Some(&endpoints::TIMELINE_FEATURES),
            );
            let response = client.transport().get_json(&url, &params).await?;
            let fetch: FetchFn<User> = {
                let client = client.clone();
                Arc::new(move |cursor| {
                    client.tweet_engagers_page(op, tweet_id.clone(), count, Some(cursor))
                })
            };
            client.user_page(&response, fetch)
        }
        .boxed()
    }

    // ── tweet actions ───────────────────────────────────────────────────

    /// Post a tweet, optionally as a reply.
    pub async fn create_tweet(&self, text: &str, reply_to: Option<&str>) -> Result<Tweet> {
        let mut variables = json!({
            "tweet_text": text,
            "dark_request": false,
            "media": {"media_entities": [], "possibly_sensitive": false},
            "semantic_annotation_ids": []
        });
        if let Some(reply_to) = reply_to {
            variables["reply"] = json!({
                "in_reply_to_tweet_id": reply_to,
                "exclude_reply_user_ids": []
            });
        }
        let body = endpoints::gql_post_body(
            endpoints::CREATE_TWEET,
            variables,
            Some(&endpoints::TIMELINE_FEATURES),
        );
        let url = self.endpoints().gql(endpoints::CREATE_TWEET);
        let response = self.transport().post_json(&url, Some(&body)).await?;
        let result = raw::find_first(&response, "tweet_results")
            .and_then(|tr| tr.get("result"))
            .ok_or_else(|| Error::malformed("tweet", "create returned no tweet result"))?;
        Tweet::from_result(self, result, 0)
    }

    /// Delete a tweet posted by the logged-in account.
    pub async fn delete_tweet(&self, tweet_id: &str) -> Result<()> {
        self.gql_tweet_action(endpoints::DELETE_TWEET, tweet_id, "dark_request")
            .await
    }

    /// Like a tweet.
    pub async fn favorite_tweet(&self, tweet_id: &str) -> Result<()> {
        self.gql_tweet_action(endpoints::FAVORITE_TWEET, tweet_id, "tweet_id")
            .await
    }

    /// Remove a like.
    pub async fn unfavorite_tweet(&self, tweet_id: &str) -> Result<()> {
        self.gql_tweet_action(endpoints::UNFAVORITE_TWEET, tweet_id, "tweet_id")
            .await
    }

    /// Retweet a tweet.
    pub async fn retweet(&self, tweet_id: &str) -> Result<()> {
        self.gql_tweet_action(endpoints::CREATE_RETWEET, tweet_id, "tweet_id")
            .await
    }

    /// Undo a retweet.
    pub async fn delete_retweet(&self, tweet_id: &str) -> Result<()> {
        self.gql_tweet_action(endpoints::DELETE_RETWEET, tweet_id, "source_tweet_id")
            .await
    }

    async fn gql_tweet_action(
        &self,
        op: endpoints::GqlOp,
        tweet_id: &str,
        id_key: &str,
    ) -> Result<()> {
        let variables = if id_key == "dark_request" {
            json!({"tweet_id": tweet_id, "dark_request": false})
        } else {
            json!({ id_key: tweet_id })
        };
        let body = endpoints::gql_post_body(op, variables, None);
        let url = self.endpoints().gql(op);
        self.transport().post_json(&url, Some(&body)).await?;
        Ok(())
    }

    // ── social graph ────────────────────────────────────────────────────

    /// Follow a user.
    pub async fn follow_user(&self, user_id: &str) -> Result<()> {
        let form = vec![("user_id".to_string(), user_id.to_string())];
        self.transport()
            .post_form(&self.endpoints().friendships_create(), &form, &[])
            .await?;
        Ok(())
    }

    /// Unfollow a user.
    pub async fn unfollow_user(&self, user_id: &str) -> Result<()> {
        let form = vec![("user_id".to_string(), user_id.to_string())];
        self.transport()
            .post_form(&self.endpoints().friendships_destroy(), &form, &[])
            .await?;
        Ok(())
    }

    /// Accounts following a user.
    pub async fn user_followers(&self, user_id: &str, count: u32) -> Result<Page<User>> {
        self.friendship_page(endpoints::FOLLOWERS, user_id.to_string(), count, None)
            .await
    }

    /// Accounts a user follows.
    pub async fn user_following(&self, user_id: &str, count: u32) -> Result<Page<User>> {
        self.friendship_page(endpoints::FOLLOWING, user_id.to_string(), count, None)
            .await
    }

    fn friendship_page(
        &self,
        op: endpoints::GqlOp,
        user_id: String,
        count: u32,
        cursor: Option<String>,
    ) -> futures_util::future::BoxFuture<'static, Result<Page<User>>> {
        let client = self.clone();
        async move {
            let mut variables = json!({
                "userId": user_id,
                "count": count,
                "includePromotedContent": false
            });
            if let Some(cursor) = &cursor {
                variables["cursor"] = json!(cursor);
            }
            let url = client.endpoints().gql(op);
            let params = endpoints::gql_get_params(
                &variables,
                Some(&endpoints::TIMELINE_FEATURES),
            );
            let response = client.transport().get_json(&url, &params).await?;
            let fetch: FetchFn<User> = {
                let client = client.clone();
                Arc::new(move |cursor| {
                    client.friendship_page(op, user_id.clone(), count, Some(cursor))
                })
            };
            client.user_page(&response, fetch)
        }
        .boxed()
    }

    // ── direct messages ─────────────────────────────────────────────────

    /// Send a direct message to a user.
    pub async fn send_dm(&self, user_id: &str, text: &str) -> Result<Message> {
        let conversation_id = self.dm_conversation_id(user_id)?;
        let body = json!({
            "cards_platform": "Web-12",
            "conversation_id": conversation_id,
            "dm_users": false,
            "include_cards": 1,
            "include_quote_count": true,
            "recipient_ids": false,
            "text": text
        });
        let response = self
            .transport()
            .post_json(&self.endpoints().dm_new(), Some(&body))
            .await?;
        let data = raw::find_first(&response, "message_data")
            .ok_or_else(|| Error::malformed("message", "send returned no message data"))?;
        Message::from_message_data(self, data, user_id)
    }

    /// Message history of a one-to-one conversation, newest first.
    pub async fn dm_history(&self, user_id: &str) -> Result<Page<Message>> {
        let conversation_id = self.dm_conversation_id(user_id)?;
        self.dm_history_page(conversation_id, user_id.to_string(), None)
            .await
    }

    fn dm_history_page(
        &self,
        conversation_id: String,
        partner_id: String,
        max_id: Option<String>,
    ) -> futures_util::future::BoxFuture<'static, Result<Page<Message>>> {
        let client = self.clone();
        async move {
            let mut params = vec![(
                "context".to_string(),
                "FETCH_DM_CONVERSATION_HISTORY".to_string(),
            )];
            if let Some(max_id) = &max_id {
                params.push(("max_id".to_string(), max_id.clone()));
            }
            let url = client.endpoints().dm_conversation(&conversation_id);
            let response = client.transport().get_json(&url, &params).await?;

            let timeline = raw::path(&response, &["conversation_timeline"])
                .cloned()
                .unwrap_or(Value::Null);
            let mut messages = Vec::new();
            if let Some(entries) = timeline.get("entries").and_then(Value::as_array) {
                for entry in entries {
                    if let Some(data) = raw::find_first(entry, "message_data") {
                        messages.push(Message::from_message_data(&client, data, &partner_id)?);
                    }
                }
            }
            // Older messages are fetched with max_id set to the oldest entry
            // seen so far; the server reports whether any remain.
            let next = (str_at(&timeline, &["status"]) == Some("HAS_MORE"))
                .then(|| str_at(&timeline, &["min_entry_id"]).map(str::to_string))
                .flatten();
            let fetch: FetchFn<Message> = {
                let client = client.clone();
                Arc::new(move |cursor| {
                    client.dm_history_page(
                        conversation_id.clone(),
                        partner_id.clone(),
                        Some(cursor),
                    )
                })
            };
            Ok(Page::new(messages, next, None, fetch))
        }
        .boxed()
    }

    /// Delete a direct message for the logged-in account.
    pub async fn delete_dm(&self, message_id: &str) -> Result<()> {
        let body = endpoints::gql_post_body(
            endpoints::DM_MESSAGE_DELETE,
            json!({"messageId": message_id}),
            None,
        );
        let url = self.endpoints().gql(endpoints::DM_MESSAGE_DELETE);
        self.transport().post_json(&url, Some(&body)).await?;
        Ok(())
    }

    /// One-to-one conversation id: both participant ids, ascending, joined
    /// with a dash.
    fn dm_conversation_id(&self, partner_id: &str) -> Result<String> {
        let own_id = self
            .user_id()
            .ok_or_else(|| Error::Auth("direct messages require a logged-in session".into()))?;
        let mut ids = [own_id.as_str(), partner_id];
        ids.sort_by_key(|id| id.parse::<u64>().unwrap_or(u64::MAX));
        Ok(format!("{}-{}", ids[0], ids[1]))
    }

    // ── trends ──────────────────────────────────────────────────────────

    /// Current trends. `category` is a guide tab id such as "trending",
    /// "for-you", or "news".
    pub async fn trends(&self, category: &str, count: u32) -> Result<Vec<Trend>> {
        let params = vec![
            ("count".to_string(), count.to_string()),
            ("include_page_configuration".to_string(), "true".to_string()),
            ("initial_tab_id".to_string(), category.to_string()),
        ];
        let response = self
            .transport()
            .get_json(&self.endpoints().guide(), &params)
            .await?;
        let trends = raw::collect_entries(&response)
            .into_iter()
            .filter(|entry| entry.kind == EntryKind::Trend)
            .filter_map(|entry| Trend::from_entry_content(&entry.content))
            .collect();
        Ok(trends)
    }

    // ── notifications ───────────────────────────────────────────────────

    /// Notifications timeline. `kind` is "all", "verified", or "mentions".
    pub async fn notifications(&self, kind: &str, count: u32) -> Result<Page<Notification>> {
        self.notifications_page(kind.to_string(), count, None).await
    }

    fn notifications_page(
        &self,
        kind: String,
        count: u32,
        cursor: Option<String>,
    ) -> futures_util::future::BoxFuture<'static, Result<Page<Notification>>> {
        let client = self.clone();
        async move {
            let mut params = vec![("count".to_string(), count.to_string())];
            if let Some(cursor) = &cursor {
                params.push(("cursor".to_string(), cursor.clone()));
            }
            let url = client.endpoints().notifications(&kind);
            let response = client.transport().get_json(&url, &params).await?;
            let items = client.hydrate_notifications(&response)?;
            let (next, previous) = cursors_from(&response);
            let fetch: FetchFn<Notification> = {
                let client = client.clone();
                Arc::new(move |cursor| {
                    client.notifications_page(kind.clone(), count, Some(cursor))
                })
            };
            Ok(Page::new(items, next, previous, fetch))
        }
        .boxed()
    }

    /// Join notification references against the response's lookup tables.
    fn hydrate_notifications(&self, response: &Value) -> Result<Vec<Notification>> {
        let empty = Value::Null;
        let objects = raw::path(response, &["globalObjects"]).unwrap_or(&empty);
        let tweets = objects.get("tweets").unwrap_or(&empty);
        let users = objects.get("users").unwrap_or(&empty);
        let lookup = objects
            .get("notifications")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let mut items: Vec<Notification> = Vec::with_capacity(lookup.len());
        for entry in lookup.values() {
            let tweet = raw::find_first(entry, "targetObjects")
                .and_then(|targets| raw::find_first(targets, "id"))
                .and_then(Value::as_str)
                .and_then(|id| self.legacy_tweet(tweets, users, id));
            let from_user = raw::find_first(entry, "fromUsers")
                .and_then(|from| raw::find_first(from, "id"))
                .and_then(Value::as_str)
                .and_then(|id| self.legacy_user(users, id));
            items.push(Notification::from_parts(entry, tweet, from_user)?);
        }
        items.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        Ok(items)
    }

    /// The lookup tables store flat v1.1-style objects keyed by id; reshape
    /// one into the GraphQL result layout the hydrator expects.
    fn legacy_tweet(&self, tweets: &Value, users: &Value, id: &str) -> Option<Tweet> {
        let legacy = tweets.get(id)?;
        let mut result = json!({"rest_id": id, "legacy": legacy});
        if let Some(user_id) = legacy.get("user_id_str").and_then(Value::as_str) {
            if let Some(user) = users.get(user_id) {
                result["core"] =
                    json!({"user_results": {"result": {"rest_id": user_id, "legacy": user}}});
            }
        }
        Tweet::from_result(self, &result, 0).ok()
    }

    fn legacy_user(&self, users: &Value, id: &str) -> Option<User> {
        let legacy = users.get(id)?;
        User::from_result(self, &json!({"rest_id": id, "legacy": legacy})).ok()
    }

    // ── communities ─────────────────────────────────────────────────────

    /// Fetch a community by id.
    pub async fn community(&self, community_id: &str) -> Result<Community> {
        let variables = json!({"communityId": community_id});
        let url = self.endpoints().gql(endpoints::COMMUNITY_QUERY);
        let params = endpoints::gql_get_params(
            &variables,
            Some(&endpoints::COMMUNITY_TWEETS_FEATURES),
        );
        let response = self.transport().get_json(&url, &params).await?;
        let result = raw::path(&response, &["data", "communityResults", "result"])
            .ok_or_else(|| Error::malformed("community", "no result for community id"))?;
        Community::from_result(self, result)
    }

    /// Search communities by query.
    pub async fn search_community(&self, query: &str) -> Result<Vec<Community>> {
        let variables = json!({"query": query});
        let url = self.endpoints().gql(endpoints::SEARCH_COMMUNITY);
        let params = endpoints::gql_get_params(&variables, None);
        let response = self.transport().get_json(&url, &params).await?;
        let items = raw::find_first(&response, "items_results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(items
            .iter()
            .filter_map(|item| item.get("result"))
            .filter_map(|result| Community::from_result(self, result).ok())
            .collect())
    }

    /// Recent tweets in a community.
    pub async fn community_tweets(&self, community_id: &str, count: u32) -> Result<Page<Tweet>> {
        self.community_tweets_page(community_id.to_string(), count, None)
            .await
    }

    fn community_tweets_page(
        &self,
        community_id: String,
        count: u32,
        cursor: Option<String>,
    ) -> futures_util::future::BoxFuture<'static, Result<Page<Tweet>>> {
        let client = self.clone();
        async move {
            let mut variables = json!({
                "communityId": community_id,
                "count": count,
                "displayLocation": "Community",
                "rankingMode": "Recency",
                "withCommunity": true
            });
            if let Some(cursor) = &cursor {
                variables["cursor"] = json!(cursor);
            }
            let url = client.endpoints().gql(endpoints::COMMUNITY_TWEETS_TIMELINE);
            let params = endpoints::gql_get_params(
                &variables,
                Some(&endpoints::COMMUNITY_TWEETS_FEATURES),
            );
            let response = client.transport().get_json(&url, &params).await?;
            let fetch: FetchFn<Tweet> = {
                let client = client.clone();
                Arc::new(move |cursor| {
                    client.community_tweets_page(community_id.clone(), count, Some(cursor))
                })
            };
            client.tweet_page(&response, fetch)
        }
        .boxed()
    }

    // ── streaming ───────────────────────────────────────────────────────

    /// Open a live-pipeline session subscribed to the given topics.
    pub async fn stream(&self, topics: &[String]) -> Result<StreamSession> {
        StreamSession::open(self.clone(), topics).await
    }

    // ── page assembly ───────────────────────────────────────────────────

    fn tweet_page(&self, response: &Value, fetch: FetchFn<Tweet>) -> Result<Page<Tweet>> {
        let mut tweets = Vec::new();
        let mut next = None;
        let mut previous = None;
        for entry in raw::collect_entries(response) {
            match &entry.kind {
                EntryKind::Tweet => {
                    tweets.push(Tweet::from_entry_content(self, &entry.content)?);
                }
                EntryKind::Tombstone { reason } => {
                    debug!(
                        entry_id = %entry.entry_id,
                        reason = reason.as_deref().unwrap_or("unspecified"),
                        "skipping tombstoned tweet"
                    );
                }
                EntryKind::Cursor(position) => {
                    assign_cursor(&entry, position, &mut next, &mut previous);
                }
                _ => {}
            }
        }
        Ok(Page::new(tweets, next, previous, fetch))
    }

    fn user_page(&self, response: &Value, fetch: FetchFn<User>) -> Result<Page<User>> {
        let mut users = Vec::new();
        let mut next = None;
        let mut previous = None;
        for entry in raw::collect_entries(response) {
            match &entry.kind {
                EntryKind::User => {
                    users.push(User::from_entry_content(self, &entry.content)?);
                }
                EntryKind::Cursor(position) => {
                    assign_cursor(&entry, position, &mut next, &mut previous);
                }
                _ => {}
            }
        }
        Ok(Page::new(users, next, previous, fetch))
    }
}

fn assign_cursor(
    entry: &raw::Entry,
    position: &CursorPosition,
    next: &mut Option<String>,
    previous: &mut Option<String>,
) {
    let token = entry.cursor_token().map(str::to_string);
    match position {
        CursorPosition::Bottom | CursorPosition::ShowMore => {
            if next.is_none() {
                *next = token;
            }
        }
        CursorPosition::Top => {
            if previous.is_none() {
                *previous = token;
            }
        }
    }
}

fn cursors_from(response: &Value) -> (Option<String>, Option<String>) {
    let mut next = None;
    let mut previous = None;
    for entry in raw::collect_entries(response) {
        if let EntryKind::Cursor(position) = &entry.kind {
            assign_cursor(&entry, position, &mut next, &mut previous);
        }
    }
    (next, previous)
}

/// The `twid` session cookie carries the account id as `u%3D<id>` (an
/// urlencoded `u=<id>`), sometimes quoted.
fn parse_twid(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches('"');
    let id = trimmed
        .strip_prefix("u%3D")
        .or_else(|| trimmed.strip_prefix("u="))?;
    (!id.is_empty()).then(|| id.to_string())
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("authenticated", &self.is_authenticated())
            .field("user_id", &self.user_id())
            .finish_non_exhaustive()
    }
}
