use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use reqwest::{Method, Response, header::HeaderMap};
use serde_json::json;
use tokio::{sync::Mutex, time::sleep};

use super::types::API_BASE;
use crate::scrub::sanitize_upstream_error;

const MAX_RATE_LIMIT_RETRIES: u8 = 3;
/// Upper bound on any single rate-limit sleep.
const MAX_RATE_LIMIT_WAIT_SECS: f64 = 60.0;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/seattle-simulator, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

#[derive(Debug, Clone)]
struct RateLimitBucket {
    remaining: u32,
    reset_at: f64,
}

/// REST half of the bot: replies, typing, identity and gateway lookup.
/// Waits out per-route and global rate limits before each request.
pub struct DiscordHttpClient {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    buckets: Arc<Mutex<HashMap<String, RateLimitBucket>>>,
    global_reset_at: Arc<Mutex<Option<f64>>>,
}

impl DiscordHttpClient {
    pub fn new(bot_token: impl Into<String>) -> Result<Self> {
        Self::with_api_base(bot_token, API_BASE)
    }

    pub fn with_api_base(bot_token: impl Into<String>, api_base: &str) -> Result<Self> {
        let client = crate::http_client::build_client(REQUEST_TIMEOUT_SECS, USER_AGENT)
            .context("build Discord HTTP client")?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            buckets: Arc::new(Mutex::new(HashMap::new())),
            global_reset_at: Arc::new(Mutex::new(None)),
        })
    }

    /// Post `content` to a channel, optionally as a reply that does not ping
    /// the original author.
    pub async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<serde_json::Value> {
        let url = format!("{}/channels/{channel_id}/messages", self.api_base);
        let mut body = json!({ "content": content });
        if let Some(message_id) = reply_to {
            body["message_reference"] = json!({
                "message_id": message_id,
                "fail_if_not_exists": false,
            });
            body["allowed_mentions"] = json!({ "replied_user": false });
        }
        let response = self
            .request(Method::POST, &url, Some(body))
            .await
            .context("send Discord message")?;
        response
            .json()
            .await
            .context("parse Discord send message response JSON")
    }

    pub async fn send_typing(&self, channel_id: &str) -> Result<()> {
        let url = format!("{}/channels/{channel_id}/typing", self.api_base);
        let _response = self
            .request(Method::POST, &url, None)
            .await
            .context("send Discord typing indicator")?;
        Ok(())
    }

    pub async fn get_current_user(&self) -> Result<serde_json::Value> {
        let url = format!("{}/users/@me", self.api_base);
        let response = self
            .request(Method::GET, &url, None)
            .await
            .context("fetch current Discord user")?;
        response
            .json()
            .await
            .context("parse current Discord user JSON")
    }

    pub async fn get_gateway_bot(&self) -> Result<serde_json::Value> {
        let url = format!("{}/gateway/bot", self.api_base);
        let response = self
            .request(Method::GET, &url, None)
            .await
            .context("fetch Discord gateway bot data")?;
        response
            .json()
            .await
            .context("parse Discord gateway bot JSON")
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response> {
        let route_key = Self::bucket_key_from_url(url);
        self.wait_for_limits(&route_key).await;

        for attempt in 0..=MAX_RATE_LIMIT_RETRIES {
            let mut request_builder = self
                .client
                .request(method.clone(), url)
                .header("Authorization", format!("Bot {}", self.bot_token));
            if let Some(payload) = &body {
                request_builder = request_builder.json(payload);
            }

            let response = request_builder
                .send()
                .await
                .with_context(|| format!("send Discord request {} {route_key}", method.as_str()))?;

            self.update_bucket_from_headers(&route_key, response.headers())
                .await;

            if response.status().as_u16() == 429 {
                if attempt == MAX_RATE_LIMIT_RETRIES {
                    anyhow::bail!(
                        "Discord request {} {route_key} exceeded rate limit after {MAX_RATE_LIMIT_RETRIES} retries",
                        method.as_str(),
                    );
                }
                let is_global = Self::is_global_limit(response.headers());
                let retry_after = Self::parse_retry_after(response.headers())
                    .unwrap_or_else(|| Duration::from_secs(1));
                tracing::warn!(
                    route = %route_key,
                    global = is_global,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Discord rate limit hit"
                );
                self.handle_429_wait(is_global, retry_after, &route_key)
                    .await;
                continue;
            }

            if !response.status().is_success() {
                let status = response.status();
                let body_text = response
                    .text()
                    .await
                    .unwrap_or_else(|error| format!("<failed to read response body: {error}>"));
                anyhow::bail!(
                    "Discord request {} {route_key} failed ({status}): {}",
                    method.as_str(),
                    sanitize_upstream_error(&body_text)
                );
            }

            return Ok(response);
        }

        anyhow::bail!(
            "Discord request {} {route_key} failed due to rate limiting",
            method.as_str()
        )
    }

    fn parse_header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u32>().ok())
    }

    fn parse_header_f64(headers: &HeaderMap, name: &str) -> Option<f64> {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| value.is_finite())
    }

    fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
        let seconds = Self::parse_header_f64(headers, "Retry-After")?;
        Some(Self::bounded_wait(seconds))
    }

    /// Sleep length for a header-derived number of seconds, clamped to
    /// `0..=MAX_RATE_LIMIT_WAIT_SECS`. NaN yields zero.
    fn bounded_wait(seconds: f64) -> Duration {
        Duration::try_from_secs_f64(seconds.clamp(0.0, MAX_RATE_LIMIT_WAIT_SECS))
            .unwrap_or_default()
    }

    fn is_global_limit(headers: &HeaderMap) -> bool {
        headers
            .get("X-RateLimit-Global")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    fn now_unix_timestamp() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }

    /// Snowflakes collapse to `{id}` so one route shares one bucket.
    fn bucket_key_from_url(url: &str) -> String {
        let path = reqwest::Url::parse(url)
            .map_or_else(|_| url.to_string(), |parsed| parsed.path().to_string());
        let path_without_api_prefix = path.strip_prefix("/api/v10").unwrap_or(&path);

        let normalized = path_without_api_prefix
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                if segment.chars().all(|character| character.is_ascii_digit()) {
                    "{id}"
                } else {
                    segment
                }
            })
            .collect::<Vec<_>>()
            .join("/");

        format!("/{normalized}")
    }

    async fn wait_for_limits(&self, route_key: &str) {
        let now = Self::now_unix_timestamp();
        let global_wait = {
            let global_guard = self.global_reset_at.lock().await;
            global_guard.and_then(|reset_at| (reset_at > now).then_some(reset_at - now))
        };
        if let Some(wait_secs) = global_wait {
            sleep(Self::bounded_wait(wait_secs)).await;
        }

        let route_wait = {
            let buckets = self.buckets.lock().await;
            buckets.get(route_key).and_then(|bucket| {
                (bucket.remaining == 0 && bucket.reset_at > now).then_some(bucket.reset_at - now)
            })
        };
        if let Some(wait_secs) = route_wait {
            sleep(Self::bounded_wait(wait_secs)).await;
        }
    }

    async fn handle_429_wait(&self, is_global: bool, retry_after: Duration, route_key: &str) {
        let reset_at = Self::now_unix_timestamp() + retry_after.as_secs_f64();
        if is_global {
            *self.global_reset_at.lock().await = Some(reset_at);
        } else {
            self.buckets.lock().await.insert(
                route_key.to_string(),
                RateLimitBucket {
                    remaining: 0,
                    reset_at,
                },
            );
        }
        sleep(retry_after).await;
    }

    async fn update_bucket_from_headers(&self, route_key: &str, headers: &HeaderMap) {
        let remaining = Self::parse_header_u32(headers, "X-RateLimit-Remaining");
        let reset_at = Self::parse_header_f64(headers, "X-RateLimit-Reset");

        if let (Some(remaining), Some(reset_at)) = (remaining, reset_at) {
            self.buckets.lock().await.insert(
                route_key.to_string(),
                RateLimitBucket {
                    remaining,
                    reset_at,
                },
            );
        }
    }
}
