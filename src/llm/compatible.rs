//! OpenAI-compatible `/chat/completions` provider. Groq speaks this format.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::traits::{CompletionRequest, Provider};
use crate::config::LlmConfig;
use crate::error::{ConfigError, SimError};
use crate::http_client::{build_client, retry_after_secs};
use crate::scrub::{describe_failure, sanitize_upstream_error};

const USER_AGENT: &str = concat!("seattle-simulator/", env!("CARGO_PKG_VERSION"));

pub struct OpenAiCompatibleProvider {
    name: String,
    /// Pre-computed `Bearer <key>` header value.
    cached_auth: Option<String>,
    /// Pre-computed chat completions URL.
    cached_chat_url: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        name: &str,
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, SimError> {
        let base_url = base_url.trim_end_matches('/');
        let cached_chat_url = if base_url.ends_with("/chat/completions") {
            base_url.to_string()
        } else {
            format!("{base_url}/chat/completions")
        };
        let client = build_client(timeout_secs, USER_AGENT)
            .map_err(|e| SimError::upstream(name, format!("http client: {e}")))?;

        Ok(Self {
            name: name.to_string(),
            cached_auth: api_key.map(|k| format!("Bearer {k}")),
            cached_chat_url,
            client,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, SimError> {
        Self::new(
            &config.provider,
            &config.base_url,
            config.api_key.as_deref(),
            config.timeout_secs,
        )
    }

    fn chat_completions_url(&self) -> &str {
        &self.cached_chat_url
    }

    async fn call_chat_completions(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, SimError> {
        let Some(auth) = &self.cached_auth else {
            return Err(ConfigError::MissingCredential("GROQ_API_KEY").into());
        };

        let response = self
            .client
            .post(self.chat_completions_url())
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timed out" } else { "request failed" };
                SimError::upstream(
                    &self.name,
                    format!("{kind}: {}", sanitize_upstream_error(&e.to_string())),
                )
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SimError::RateLimited {
                service: self.name.clone(),
                retry_after_secs: retry_after_secs(response.headers()),
            });
        }
        if !status.is_success() {
            return Err(SimError::upstream(&self.name, describe_failure(response).await));
        }

        response.json().await.map_err(|e| {
            SimError::upstream(&self.name, format!("chat completions JSON decode failed: {e}"))
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<ChatUsage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, SimError> {
        let chat = ChatRequest {
            model: request.model,
            messages: [
                Message {
                    role: "system",
                    content: request.system,
                },
                Message {
                    role: "user",
                    content: request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self.call_chat_completions(&chat).await?;
        if let Some(usage) = &response.usage {
            tracing::debug!(
                provider = %self.name,
                model = response.model.as_deref().unwrap_or(request.model),
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion usage"
            );
        }

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}
