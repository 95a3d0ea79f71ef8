//! Synchronous facade.
//!
//! Wraps the async [`Client`](crate::Client) around an owned single-threaded
//! runtime for callers without one of their own. Paginated results are the
//! same [`Page`] values the async client returns; continue them through
//! [`Client::next_page`].

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::auth::LoginArgs;
use crate::config::ClientConfig;
use crate::entities::{Community, Message, Notification, Trend, Tweet, User};
use crate::error::Result;
use crate::page::Page;

/// Blocking client handle.
pub struct Client {
    inner: crate::Client,
    runtime: tokio::runtime::Runtime,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            inner: crate::Client::new(config)?,
            runtime,
        })
    }

    /// The wrapped async client, for mixing calling styles.
    pub fn async_client(&self) -> &crate::Client {
        &self.inner
    }

    pub fn login(&self, args: LoginArgs<'_>) -> Result<Value> {
        self.runtime.block_on(self.inner.login(args))
    }

    pub fn logout(&self) -> Result<()> {
        self.runtime.block_on(self.inner.logout())
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.user_id()
    }

    pub fn get_cookies(&self) -> HashMap<String, String> {
        self.inner.get_cookies()
    }

    pub fn set_cookies(&self, cookies: HashMap<String, String>, clear_cookies: bool) {
        self.inner.set_cookies(cookies, clear_cookies);
    }

    pub fn save_cookies(&self, path: impl AsRef<Path>) -> Result<()> {
        self.runtime.block_on(self.inner.save_cookies(path))
    }

    pub fn load_cookies(&self, path: impl AsRef<Path>) -> Result<()> {
        self.runtime.block_on(self.inner.load_cookies(path))
    }

    pub fn user_by_screen_name(&self, screen_name: &str) -> Result<User> {
        self.runtime
            .block_on(self.inner.user_by_screen_name(screen_name))
    }

    pub fn user_by_id(&self, user_id: &str) -> Result<User> {
        self.runtime.block_on(self.inner.user_by_id(user_id))
    }

    pub fn tweet_by_id(&self, tweet_id: &str) -> Result<Tweet> {
        self.runtime.block_on(self.inner.tweet_by_id(tweet_id))
    }

    pub fn search_tweet(&self, query: &str, product: &str, count: u32) -> Result<Page<Tweet>> {
        self.runtime
            .block_on(self.inner.search_tweet(query, product, count))
    }

    pub fn search_user(&self, query: &str, count: u32) -> Result<Page<User>> {
        self.runtime.block_on(self.inner.search_user(query, count))
    }

    pub fn home_timeline(&self, count: u32) -> Result<Page<Tweet>> {
        self.runtime.block_on(self.inner.home_timeline(count))
    }

    pub fn home_latest_timeline(&self, count: u32) -> Result<Page<Tweet>> {
        self.runtime.block_on(self.inner.home_latest_timeline(count))
    }

    pub fn user_tweets(
        &self,
        user_id: &str,
        kind: crate::UserTweetKind,
        count: u32,
    ) -> Result<Page<Tweet>> {
        self.runtime
            .block_on(self.inner.user_tweets(user_id, kind, count))
    }

    pub fn me(&self) -> Result<User> {
        self.runtime.block_on(self.inner.me())
    }

    pub fn create_tweet(&self, text: &str, reply_to: Option<&str>) -> Result<Tweet> {
        self.runtime.block_on(self.inner.create_tweet(text, reply_to))
    }

    pub fn delete_tweet(&self, tweet_id: &str) -> Result<()> {
        self.runtime.block_on(self.inner.delete_tweet(tweet_id))
    }

    pub fn favorite_tweet(&self, tweet_id: &str) -> Result<()> {
        self.runtime.block_on(self.inner.favorite_tweet(tweet_id))
    }

    pub fn unfavorite_tweet(&self, tweet_id: &str) -> Result<()> {
        self.runtime.block_on(self.inner.unfavorite_tweet(tweet_id))
    }

    pub fn retweet(&self, tweet_id: &str) -> Result<()> {
        self.runtime.block_on(self.inner.retweet(tweet_id))
    }

    pub fn delete_retweet(&self, tweet_id: &str) -> Result<()> {
        self.runtime.block_on(self.inner.delete_retweet(tweet_id))
    }

    pub fn follow_user(&self, user_id: &str) -> Result<()> {
        self.runtime.block_on(self.inner.follow_user(user_id))
    }

    pub fn unfollow_user(&self, user_id: &str) -> Result<()> {
        self.runtime.block_on(self.inner.unfollow_user(user_id))
    }

    pub fn user_followers(&self, user_id: &str, count: u32) -> Result<Page<User>> {
        self.runtime
            .block_on(self.inner.user_followers(user_id, count))
    }

    pub fn user_following(&self, user_id: &str, count: u32) -> Result<Page<User>> {
        self.runtime
            .block_on(self.inner.user_following(user_id, count))
    }

    pub fn send_dm(&self, user_id: &str, text: &str) -> Result<Message> {
        self.runtime.block_on(self.inner.send_dm(user_id, text))
    }

    pub fn dm_history(&self, user_id: &str) -> Result<Page<Message>> {
        self.runtime.block_on(self.inner.dm_history(user_id))
    }

    pub fn delete_dm(&self, message_id: &str) -> Result<()> {
        self.runtime.block_on(self.inner.delete_dm(message_id))
    }

    pub fn trends(&self, category: &str, count: u32) -> Result<Vec<Trend>> {
        self.runtime.block_on(self.inner.trends(category, count))
    }

    pub fn notifications(&self, kind: &str, count: u32) -> Result<Page<Notification>> {
        self.runtime.block_on(self.inner.notifications(kind, count))
    }

    pub fn community(&self, community_id: &str) -> Result<Community> {
        self.runtime.block_on(self.inner.community(community_id))
    }

    pub fn search_community(&self, query: &str) -> Result<Vec<Community>> {
        self.runtime.block_on(self.inner.search_community(query))
    }

    pub fn community_tweets(&self, community_id: &str, count: u32) -> Result<Page<Tweet>> {
        self.runtime
            .block_on(self.inner.community_tweets(community_id, count))
    }

    /// Continue any page produced by this client.
    pub fn next_page<T>(&self, page: &Page<T>) -> Result<Option<Page<T>>> {
        self.runtime.block_on(page.next())
    }

    /// Fetch the page preceding the given one.
    pub fn previous_page<T>(&self, page: &Page<T>) -> Result<Option<Page<T>>> {
        self.runtime.block_on(page.previous())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_state_round_trips() {
        let client = Client::new(ClientConfig::default()).unwrap();
        assert!(client.user_id().is_none());

        let mut cookies = HashMap::new();
        cookies.insert("twid".to_string(), "u%3D42".to_string());
        cookies.insert("auth_token".to_string(), "tok".to_string());
        client.set_cookies(cookies, true);

        assert_eq!(client.user_id().as_deref(), Some("42"));
        assert_eq!(client.get_cookies().get("auth_token").map(String::as_str), Some("tok"));
    }

    #[test]
    fn terminal_pages_do_not_continue() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let page: Page<u32> = Page::terminal(vec![1, 2, 3]);
        assert!(client.next_page(&page).unwrap().is_none());
    }
}
