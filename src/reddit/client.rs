use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::types::{
    CommentData, Listing, MAX_TITLE_CHARS, SubmitResponse, SubmittedPost, Thing, TokenResponse,
};
use crate::config::RedditConfig;
use crate::error::{ConfigError, SimError};
use crate::http_client::{build_client, retry_after_secs};
use crate::scrub::{describe_failure, sanitize_upstream_error};
use crate::utils::text::truncate_chars;

const SERVICE: &str = "reddit";

/// Thin OAuth client for the handful of Reddit endpoints the simulator uses.
pub struct RedditClient {
    client: Client,
    api_base: String,
    auth_url: String,
    client_id: String,
    client_secret: String,
    username: Option<String>,
    password: Option<String>,
}

impl RedditClient {
    pub fn from_config(config: &RedditConfig) -> Result<Self, SimError> {
        let client_id = config
            .client_id
            .clone()
            .ok_or(ConfigError::MissingCredential("REDDIT_CLIENT_ID"))?;
        let client_secret = config
            .client_secret
            .clone()
            .ok_or(ConfigError::MissingCredential("REDDIT_CLIENT_SECRET"))?;
        let client = build_client(config.timeout_secs, &config.user_agent)
            .map_err(|e| SimError::upstream(SERVICE, format!("http client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            auth_url: config.auth_url.clone(),
            client_id,
            client_secret,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Application-only token (client-credentials grant) for reads.
    pub async fn app_token(&self) -> Result<String, SimError> {
        self.request_token(&[("grant_type", "client_credentials")])
            .await
    }

    /// User token (password grant) for submitting.
    pub async fn password_token(&self) -> Result<String, SimError> {
        let username = self
            .username
            .as_deref()
            .ok_or(ConfigError::MissingCredential("REDDIT_USERNAME"))?;
        let password = self
            .password
            .as_deref()
            .ok_or(ConfigError::MissingCredential("REDDIT_PASSWORD"))?;
        self.request_token(&[
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ])
        .await
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<String, SimError> {
        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(rate_limited(&response));
        }
        if !response.status().is_success() {
            let detail = describe_failure(response).await;
            return Err(SimError::upstream(
                SERVICE,
                format!("token request failed: {detail}"),
            ));
        }

        // Reddit answers bad credentials with 200 and an `error` field.
        let token: TokenResponse = decode(response).await?;
        match (token.access_token, token.error) {
            (Some(access), None) if !access.is_empty() => Ok(access),
            (_, Some(error)) => Err(SimError::upstream(
                SERVICE,
                format!("token request rejected: {}", sanitize_upstream_error(&error)),
            )),
            _ => Err(SimError::upstream(SERVICE, "token response had no access_token")),
        }
    }

    fn get(&self, token: &str, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{path}", self.api_base))
            .bearer_auth(token)
            .query(&[("raw_json", "1")])
    }

    /// `GET {api_base}{path}` as a listing. `missing` names the target in a
    /// `NotFound` error.
    pub(crate) async fn listing(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
        missing: &str,
    ) -> Result<Vec<Thing>, SimError> {
        let response = self
            .get(token, path)
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_read(response, missing).await?;
        let listing: Listing = decode(response).await?;
        Ok(listing.into_things())
    }

    /// Top-level comments of one post, in Reddit's `top` order.
    pub(crate) async fn top_comments(
        &self,
        token: &str,
        subreddit: &str,
        post_id: &str,
        limit: usize,
    ) -> Result<Vec<CommentData>, SimError> {
        let path = format!("/r/{subreddit}/comments/{post_id}");
        let response = self
            .get(token, &path)
            .query(&[
                ("limit", limit.to_string()),
                ("depth", "1".to_string()),
                ("sort", "top".to_string()),
            ])
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_read(response, &format!("r/{subreddit} post {post_id}")).await?;

        // `[post listing, comment listing]`
        let pair: Vec<Listing> = decode(response).await?;
        let comments = pair
            .into_iter()
            .nth(1)
            .map(Listing::into_things)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|thing| match thing {
                Thing::Comment(comment) => Some(comment),
                Thing::Link(_) => None,
            })
            .collect();
        Ok(comments)
    }

    /// Submit a self post to `subreddit` with a fresh password-grant token.
    ///
    /// Any rejection (auth, HTTP or `json.errors`) is `PostFailed`; missing
    /// account credentials are a config error raised before any request.
    pub async fn submit_self_post(
        &self,
        subreddit: &str,
        title: &str,
        body: &str,
    ) -> Result<SubmittedPost, SimError> {
        let post_failed = |reason: String| SimError::PostFailed {
            subreddit: subreddit.to_string(),
            reason,
        };

        let token = match self.password_token().await {
            Ok(token) => token,
            Err(err @ SimError::Config(_)) => return Err(err),
            Err(err) => return Err(post_failed(format!("authentication failed: {err}"))),
        };

        let title = truncate_chars(title.trim(), MAX_TITLE_CHARS);
        let response = self
            .client
            .post(format!("{}/api/submit", self.api_base))
            .bearer_auth(&token)
            .form(&[
                ("sr", subreddit),
                ("kind", "self"),
                ("title", title),
                ("text", body),
                ("api_type", "json"),
                ("resubmit", "true"),
            ])
            .send()
            .await
            .map_err(|e| post_failed(sanitize_upstream_error(&e.to_string())))?;

        if !response.status().is_success() {
            return Err(post_failed(describe_failure(response).await));
        }

        let submitted: SubmitResponse = response
            .json()
            .await
            .map_err(|e| post_failed(format!("unreadable submit response: {e}")))?;
        if let Some(reason) = submitted.json.error_summary() {
            return Err(post_failed(reason));
        }

        let data = submitted.json.data;
        let post = SubmittedPost {
            id: data.as_ref().and_then(|d| d.name.clone()),
            url: data.and_then(|d| d.url),
        };
        tracing::info!(subreddit, url = ?post.url, "post submitted");
        Ok(post)
    }
}

/// Map a read response onto the error taxonomy: missing, private and
/// redirected targets are `NotFound`.
async fn check_read(response: Response, missing: &str) -> Result<Response, SimError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND
        || status == StatusCode::FORBIDDEN
        || status.is_redirection()
    {
        tracing::debug!(%status, subject = missing, "reddit target unavailable");
        return Err(SimError::NotFound {
            target: missing.to_string(),
        });
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(rate_limited(&response));
    }
    Err(SimError::upstream(SERVICE, describe_failure(response).await))
}

fn rate_limited(response: &Response) -> SimError {
    SimError::RateLimited {
        service: SERVICE.to_string(),
        retry_after_secs: retry_after_secs(response.headers()),
    }
}

fn transport_error(err: reqwest::Error) -> SimError {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    SimError::upstream(
        SERVICE,
        format!("{kind}: {}", sanitize_upstream_error(&err.to_string())),
    )
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SimError> {
    response
        .json::<T>()
        .await
        .map_err(|e| SimError::upstream(SERVICE, format!("undecodable response: {e}")))
}
