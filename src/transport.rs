//! HTTP transport with browser-session request signing.
//!
//! Every request carries the web client's shared bearer token plus the
//! session cookies, and mirrors the `ct0` cookie into the `x-csrf-token`
//! header, which is how the platform distinguishes a logged-in browser
//! session from a third-party OAuth app. Cookies are tracked in a plain
//! map rather than a cookie jar so they can be exported, imported, and
//! persisted as JSON.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ClientConfig, RateLimitInfo, RetryConfig};
use crate::error::{Error, Result};

/// Platform error codes surfaced inside 200-level envelopes.
const CODE_SUSPENDED: &[i64] = &[37, 64];
const CODE_LOCKED: i64 = 326;

pub(crate) struct Transport {
    http: reqwest::Client,
    pub(crate) config: ClientConfig,
    cookies: RwLock<HashMap<String, String>>,
    guest_token: RwLock<Option<String>>,
    last_rate_limit: RwLock<RateLimitInfo>,
}

impl Transport {
    pub(crate) fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            config,
            cookies: RwLock::new(HashMap::new()),
            guest_token: RwLock::new(None),
            last_rate_limit: RwLock::new(RateLimitInfo::default()),
        })
    }

    // ── cookie/session state ────────────────────────────────────────────

    pub(crate) fn cookie(&self, name: &str) -> Option<String> {
        self.cookies
            .read()
            .ok()
            .and_then(|map| map.get(name).cloned())
    }

    pub(crate) fn set_cookie(&self, name: &str, value: &str) {
        if let Ok(mut map) = self.cookies.write() {
            map.insert(name.to_string(), value.to_string());
        }
    }

    pub(crate) fn cookies_snapshot(&self) -> HashMap<String, String> {
        self.cookies.read().map(|m| m.clone()).unwrap_or_default()
    }

    pub(crate) fn replace_cookies(&self, cookies: HashMap<String, String>, clear: bool) {
        if let Ok(mut map) = self.cookies.write() {
            if clear {
                map.clear();
            }
            map.extend(cookies);
        }
    }

    /// Whether the session holds a logged-in auth token.
    pub(crate) fn is_authenticated(&self) -> bool {
        self.cookie("auth_token").is_some()
    }

    pub(crate) fn set_guest_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.guest_token.write() {
            *guard = token;
        }
    }

    /// Rate-limit window reported by the most recent response.
    pub(crate) fn last_rate_limit(&self) -> RateLimitInfo {
        self.last_rate_limit
            .read()
            .map(|info| info.clone())
            .unwrap_or_default()
    }

    pub(crate) async fn save_cookies(&self, path: &Path) -> Result<()> {
        let encoded = serde_json::to_vec_pretty(&self.cookies_snapshot())?;
        tokio::fs::write(path, encoded).await?;
        Ok(())
    }

    pub(crate) async fn load_cookies(&self, path: &Path) -> Result<()> {
        let raw = tokio::fs::read(path).await?;
        let cookies: HashMap<String, String> = serde_json::from_slice(&raw)?;
        self.replace_cookies(cookies, true);
        Ok(())
    }

    // ── request issuing ─────────────────────────────────────────────────

    pub(crate) async fn get_json(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        self.request_json(Method::GET, url, params, None).await
    }

    pub(crate) async fn post_json(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        self.request_json(Method::POST, url, &[], body).await
    }

    pub(crate) async fn request_json(
        &self,
        method: Method,
        url: &str,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let retry = self.config.retry.clone();
        let mut attempt = 0u32;
        loop {
            match self.request_once(method.clone(), url, params, body).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 < retry.max_attempts && is_transient(&err) => {
                    let delay = backoff_delay(&retry, attempt);
                    warn!(
                        %url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient request failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn request_once(
        &self,
        method: Method,
        url: &str,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut request = self
            .http
            .request(method, url)
            .headers(self.base_headers());
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        self.absorb_response_headers(&headers);
        let text = response.text().await?;
        debug!(%url, status = status.as_u16(), bytes = text.len(), "response received");

        handle_response(status, &headers, &text)
    }

    /// POST a urlencoded form, with optional per-request headers.
    pub(crate) async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        extra_headers: &[(&'static str, String)],
    ) -> Result<Value> {
        let mut headers = self.base_headers();
        headers.remove("content-type");
        for (name, value) in extra_headers {
            insert_header(&mut headers, name, value.as_str());
        }
        let response = self
            .http
            .post(url)
            .headers(headers)
            .form(form)
            .send()
            .await?;
        let status = response.status();
        let response_headers = response.headers().clone();
        self.absorb_response_headers(&response_headers);
        let text = response.text().await?;
        handle_response(status, &response_headers, &text)
    }

    /// Fetch a non-JSON body (served scripts) with session headers.
    pub(crate) async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.http.get(url).headers(self.base_headers()).send().await?;
        let status = response.status();
        self.absorb_response_headers(response.headers());
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: truncate(&text, 200),
                retry_after: None,
            });
        }
        Ok(text)
    }

    /// Issue a request and hand back the raw response for byte-stream
    /// consumption. Status is checked; the body is not read.
    pub(crate) async fn get_stream(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .headers(self.base_headers())
            .query(params)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return match handle_response(status, &headers, &text) {
                Err(err) => Err(err),
                Ok(_) => Err(Error::Stream(format!("unexpected status {status}"))),
            };
        }
        Ok(response)
    }

    // ── headers & cookies ───────────────────────────────────────────────

    fn base_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        insert_header(
            &mut headers,
            "authorization",
            &format!("Bearer {}", self.config.bearer_token),
        );
        insert_header(&mut headers, "content-type", "application/json");
        insert_header(&mut headers, "referer", "https://twitter.com/");
        insert_header(&mut headers, "x-twitter-active-user", "yes");
        if let Some(language) = &self.config.language {
            insert_header(&mut headers, "accept-language", language);
            insert_header(&mut headers, "x-twitter-client-language", language);
        }
        if let Some(ct0) = self.cookie("ct0") {
            insert_header(&mut headers, "x-csrf-token", &ct0);
        }
        if self.is_authenticated() {
            insert_header(&mut headers, "x-twitter-auth-type", "OAuth2Session");
        } else if let Some(token) = self.guest_token.read().ok().and_then(|g| g.clone()) {
            insert_header(&mut headers, "x-guest-token", &token);
        }
        let cookie_line = self.cookie_header();
        if !cookie_line.is_empty() {
            insert_header(&mut headers, "cookie", &cookie_line);
        }
        headers
    }

    fn cookie_header(&self) -> String {
        let map = self.cookies_snapshot();
        let mut pairs: Vec<_> = map.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Fold `set-cookie` headers into the session. The platform sometimes
    /// sends `ct0` more than once in a single response; the first occurrence
    /// wins, matching browser jar behavior for the duplicate.
    fn absorb_response_headers(&self, headers: &HeaderMap) {
        let info = RateLimitInfo::from_headers(headers);
        // Only responses that carry the window headers update the state.
        if info.limit.is_some() || info.remaining.is_some() || info.reset.is_some() {
            if let Ok(mut guard) = self.last_rate_limit.write() {
                *guard = info;
            }
        }
        let mut ct0_seen = false;
        for raw in headers.get_all(SET_COOKIE) {
            let Ok(line) = raw.to_str() else { continue };
            let Some((name, value)) = parse_set_cookie(line) else {
                continue;
            };
            if name == "ct0" {
                if ct0_seen {
                    continue;
                }
                ct0_seen = true;
            }
            self.set_cookie(name, value);
        }
    }
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

fn parse_set_cookie(line: &str) -> Option<(&str, &str)> {
    let pair = line.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    (!name.is_empty()).then_some((name, value.trim()))
}

/// Map a completed response to either its decoded JSON body or an error.
///
/// Suspension and lock codes arrive inside the body envelope and can ride
/// on any status, so the envelope is inspected before the status line.
fn handle_response(status: StatusCode, headers: &HeaderMap, text: &str) -> Result<Value> {
    // A success body must decode; a failure body is only mined for detail.
    let body: Value = match serde_json::from_str(text) {
        Ok(body) => body,
        Err(err) if status.is_success() => return Err(Error::Json(err)),
        Err(_) => Value::Null,
    };

    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        for error in errors {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            if CODE_SUSPENDED.contains(&code) {
                return Err(Error::AccountSuspended(message));
            }
            if code == CODE_LOCKED {
                return Err(Error::AccountLocked(message));
            }
        }
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = RateLimitInfo::from_headers(headers).seconds_until_reset();
        return Err(Error::RateLimited { retry_after });
    }

    if !status.is_success() {
        let message = body
            .get("errors")
            .and_then(Value::as_array)
            .and_then(|errors| errors.first())
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| truncate(text, 200));
        return Err(Error::Api {
            status: status.as_u16(),
            message,
            retry_after: None,
        });
    }

    Ok(body)
}

fn is_transient(err: &Error) -> bool {
    match err {
        Error::Http(e) => e.is_timeout() || e.is_connect(),
        Error::Api { status, .. } => *status >= 500,
        _ => false,
    }
}

fn backoff_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    let exp = retry
        .initial_delay_ms
        .saturating_mul(1u64 << attempt.min(16))
        .min(retry.max_delay_ms);
    let jitter = 1.0 + retry.jitter * (rand::random::<f64>() * 2.0 - 1.0);
    Duration::from_millis((exp as f64 * jitter).max(0.0) as u64)
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &text[..end])
    }
}
