//! Live-pipeline streaming session.
//!
//! The live pipeline is a long-lived chunked HTTP response delivering one
//! JSON document per line: engagement deltas, direct-message updates, and
//! typing indicators for the subscribed topics. The first document is a
//! session config carrying the session id, which must accompany later
//! subscription changes.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::Client;
use crate::error::{Error, Result};

/// Topic path constructors for [`Client::stream`] and
/// [`StreamSession::update_subscriptions`].
pub mod topics {
    /// Engagement deltas (likes, retweets, views) for one tweet.
    pub fn tweet_engagement(tweet_id: &str) -> String {
        format!("/tweet_engagement/{tweet_id}")
    }

    /// New messages in one conversation.
    pub fn dm_update(conversation_id: &str) -> String {
        format!("/dm_update/{conversation_id}")
    }

    /// Typing indicators in one conversation.
    pub fn dm_typing(conversation_id: &str) -> String {
        format!("/dm_typing/{conversation_id}")
    }
}

/// One document from the pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEvent {
    /// Topic the payload belongs to; absent on session-level documents
    #[serde(default)]
    pub topic: Option<String>,
    pub payload: Payload,
}

/// Tagged-union payload; exactly one field is populated per document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub config: Option<SessionConfig>,
    #[serde(default)]
    pub subscriptions: Option<serde_json::Value>,
    #[serde(default)]
    pub tweet_engagement: Option<TweetEngagement>,
    #[serde(default)]
    pub dm_update: Option<DmUpdate>,
    #[serde(default)]
    pub dm_typing: Option<DmTyping>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub session_id: String,
    #[serde(default)]
    pub subscription_ttl_millis: u64,
    #[serde(default)]
    pub heartbeat_millis: u64,
}

/// Engagement counter deltas; only changed counters are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetEngagement {
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub retweet_count: Option<u64>,
    #[serde(default)]
    pub reply_count: Option<u64>,
    #[serde(default)]
    pub quote_count: Option<u64>,
    #[serde(default)]
    pub view_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DmUpdate {
    pub conversation_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DmTyping {
    pub conversation_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

type ByteStream =
    Pin<Box<dyn Stream<Item = std::result::Result<Vec<u8>, reqwest::Error>> + Send>>;

/// An open streaming session.
///
/// Dropping the session closes the connection; subscriptions do not outlive
/// it.
pub struct StreamSession {
    client: Client,
    topics: Vec<String>,
    config: SessionConfig,
    bytes: ByteStream,
    buffer: Vec<u8>,
}

impl StreamSession {
    pub(crate) async fn open(client: Client, topics: &[String]) -> Result<Self> {
        let bytes = Self::connect(&client, topics).await?;

        let mut session = Self {
            client,
            topics: topics.to_vec(),
            config: SessionConfig {
                session_id: String::new(),
                subscription_ttl_millis: 0,
                heartbeat_millis: 0,
            },
            bytes,
            buffer: Vec::new(),
        };
        session.read_config().await?;
        Ok(session)
    }

    async fn connect(client: &Client, topics: &[String]) -> Result<ByteStream> {
        let url = client.endpoints().live_pipeline_events();
        let params = vec![("topics".to_string(), topics.join(","))];
        let response = client.transport().get_stream(&url, &params).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()))
            .boxed())
    }

    // The server speaks first with a config document.
    async fn read_config(&mut self) -> Result<()> {
        match self.next_event().await? {
            Some(event) => {
                let config = event.payload.config.ok_or_else(|| {
                    Error::Stream("first pipeline document was not a session config".into())
                })?;
                debug!(session_id = %config.session_id, "stream session established");
                self.config = config;
                Ok(())
            }
            None => Err(Error::Stream("pipeline closed before session config".into())),
        }
    }

    /// Re-establish the connection with the original topics. The server
    /// assigns a fresh session id; subscriptions added later through
    /// [`update_subscriptions`](Self::update_subscriptions) are not restored.
    pub async fn reconnect(&mut self) -> Result<()> {
        self.bytes = Self::connect(&self.client, &self.topics).await?;
        self.buffer.clear();
        self.read_config().await
    }

    /// Session id assigned by the server.
    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    /// Server-announced heartbeat interval.
    pub fn heartbeat_millis(&self) -> u64 {
        self.config.heartbeat_millis
    }

    /// Next event from the pipeline. `Ok(None)` means the server closed the
    /// connection. Undecodable lines are skipped.
    pub async fn next_event(&mut self) -> Result<Option<StreamEvent>> {
        loop {
            if let Some(line) = self.take_line() {
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<StreamEvent>(&line) {
                    Ok(event) => return Ok(Some(event)),
                    Err(error) => {
                        warn!(%error, "skipping undecodable pipeline line");
                        continue;
                    }
                }
            }
            match self.bytes.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(error)) => return Err(Error::Http(error)),
                None => {
                    // Flush whatever is left without a trailing newline.
                    if self.buffer.is_empty() {
                        return Ok(None);
                    }
                    let rest = String::from_utf8_lossy(&self.buffer).trim().to_string();
                    self.buffer.clear();
                    if rest.is_empty() {
                        return Ok(None);
                    }
                    match serde_json::from_str::<StreamEvent>(&rest) {
                        Ok(event) => return Ok(Some(event)),
                        Err(_) => return Ok(None),
                    }
                }
            }
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let newline = self.buffer.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.buffer.drain(..=newline).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }

    /// Change this session's topic subscriptions in place.
    pub async fn update_subscriptions(
        &self,
        subscribe: &[String],
        unsubscribe: &[String],
    ) -> Result<()> {
        let url = self.client.endpoints().live_pipeline_update_subscriptions();
        let form = vec![
            ("sub_topics".to_string(), subscribe.join(",")),
            ("unsub_topics".to_string(), unsubscribe.join(",")),
        ];
        let headers = [("livepipeline-session", self.config.session_id.clone())];
        self.client
            .transport()
            .post_form(&url, &form, &headers)
            .await?;
        Ok(())
    }
}
