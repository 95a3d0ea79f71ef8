//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bearer token shared by all web sessions; not account-specific.
pub const WEB_BEARER_TOKEN: &str = "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6_1) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15";

/// Configuration for a [`crate::Client`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Language code sent with requests (e.g. "en-US")
    #[serde(default)]
    pub language: Option<String>,

    /// User-Agent header presented to the API
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Bearer token for the web client (constant upstream)
    #[serde(default = "default_bearer_token")]
    pub bearer_token: String,

    /// Base URL for GraphQL endpoints
    #[serde(default = "default_graphql_base")]
    pub graphql_base: String,

    /// Base URL for v1.1/v2 REST endpoints
    #[serde(default = "default_rest_base")]
    pub rest_base: String,

    /// Base URL for the `api.` host (onboarding flow, live pipeline)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Request timeout
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// Maximum depth for eager hydration of nested quote/retweet chains.
    /// Beyond this, the terminal node degrades to a reference id.
    #[serde(default = "default_max_hydration_depth")]
    pub max_hydration_depth: usize,

    /// Retry policy for transient connection failures
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

fn default_bearer_token() -> String {
    WEB_BEARER_TOKEN.into()
}

fn default_graphql_base() -> String {
    "https://twitter.com/i/api/graphql".into()
}

fn default_rest_base() -> String {
    "https://twitter.com/i/api".into()
}

fn default_api_base() -> String {
    "https://api.twitter.com".into()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_hydration_depth() -> usize {
    6
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            language: None,
            user_agent: default_user_agent(),
            bearer_token: default_bearer_token(),
            graphql_base: default_graphql_base(),
            rest_base: default_rest_base(),
            api_base: default_api_base(),
            timeout: default_timeout(),
            max_hydration_depth: default_max_hydration_depth(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for transient connection failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per request
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay between retries in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter factor (0.0-1.0)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter() -> f64 {
    0.1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

/// Rate limit state reported by API response headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimitInfo {
    /// Maximum number of requests allowed in the window
    pub limit: Option<u32>,

    /// Remaining requests in the current window
    pub remaining: Option<u32>,

    /// Unix timestamp when the window resets
    pub reset: Option<u64>,
}

impl RateLimitInfo {
    /// Parse rate limit info from response headers.
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        Self {
            limit: header_num(headers, "x-rate-limit-limit"),
            remaining: header_num(headers, "x-rate-limit-remaining"),
            reset: header_num(headers, "x-rate-limit-reset"),
        }
    }

    /// Whether the current window is exhausted.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Seconds until the window resets, if in the future.
    #[must_use]
    pub fn seconds_until_reset(&self) -> Option<u64> {
        let reset = self.reset?;
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?
            .as_secs();
        (reset > now).then(|| reset - now)
    }
}

fn header_num<T: std::str::FromStr>(headers: &reqwest::header::HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
