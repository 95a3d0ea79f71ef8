//! Client library for X/Twitter's private web API.
//!
//! Speaks the same endpoints the web client uses: browser-session
//! authentication through the onboarding flow, GraphQL timeline queries with
//! persisted query ids, cursor pagination, direct messages, notifications,
//! and the live pipeline event stream.
//!
//! ```no_run
//! use skylark::{Client, ClientConfig, LoginArgs};
//!
//! # async fn run() -> skylark::Result<()> {
//! let client = Client::new(ClientConfig::default())?;
//! client
//!     .login(LoginArgs {
//!         auth_info_1: "example_user",
//!         auth_info_2: None,
//!         password: "password",
//!         totp_code: None,
//!     })
//!     .await?;
//!
//! let mut page = client.search_tweet("rust lang", "Latest", 20).await?;
//! for tweet in &page {
//!     println!("{}: {}", tweet.id, tweet.text);
//! }
//! while let Some(next) = page.next().await? {
//!     page = next;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Responses are parsed leniently: unrecognized entry shapes are skipped and
//! missing fields degrade to defaults, so minor upstream schema drift does
//! not break the client. See [`Error::MalformedEntity`] for the one
//! exception.

mod auth;
mod challenge;
mod client;
mod config;
mod endpoints;
mod entities;
mod error;
mod page;
mod raw;
mod stream;
mod transport;

pub mod blocking;

pub use auth::LoginArgs;
pub use challenge::{ChallengeSolver, NodeSolver};
pub use client::{Client, UserTweetKind};
pub use config::{ClientConfig, RateLimitInfo, RetryConfig, WEB_BEARER_TOKEN};
pub use entities::{
    Community, Media, MediaKind, Message, Notification, Place, Trend, Tweet, TweetRef, User,
    VideoInfo, VideoVariant,
};
pub use error::{Error, Result};
pub use page::Page;
pub use raw::{collect_entries, entries_with_prefix, CursorPosition, Entry, EntryKind};
pub use stream::{
    topics, DmTyping, DmUpdate, Payload, SessionConfig, StreamEvent, StreamSession,
    TweetEngagement,
};
