use std::sync::Arc;

use super::compatible::OpenAiCompatibleProvider;
use super::traits::{CompletionRequest, Provider};
use crate::config::LlmConfig;
use crate::error::SimError;
use crate::prompt::Prompt;

pub const UNTITLED_POST: &str = "Untitled Seattle Post";

/// Sampling knobs sent with every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for SamplingConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Non-empty completion text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
}

/// A completion split into the `TITLE:` / `BODY:` sections the personas ask
/// for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPost {
    pub title: String,
    pub body: String,
}

impl GeneratedPost {
    /// A missing title becomes [`UNTITLED_POST`]; a missing body becomes the
    /// whole text.
    pub fn parse(text: &str) -> Self {
        let mut title = String::new();
        let mut body_lines: Vec<&str> = Vec::new();
        let mut in_body = false;

        for line in text.lines() {
            if let Some(rest) = section(line, "TITLE:") {
                if title.is_empty() {
                    title = rest.to_string();
                }
            } else if let Some(rest) = section(line, "BODY:") {
                in_body = true;
                if !rest.is_empty() {
                    body_lines.push(rest);
                }
            } else if in_body {
                body_lines.push(line);
            }
        }

        let body = body_lines.join("\n").trim().to_string();
        Self {
            title: if title.is_empty() {
                UNTITLED_POST.to_string()
            } else {
                title
            },
            body: if body.is_empty() {
                text.trim().to_string()
            } else {
                body
            },
        }
    }
}

/// Matches `TITLE: x`, `**TITLE:** x` and `Title: x`.
fn section<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let bare = line.trim_start().trim_start_matches('*');
    let head = bare.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }
    Some(bare[label.len()..].trim_start_matches('*').trim())
}

/// Sends prompts to the completion endpoint.
pub struct Generator {
    provider: Arc<dyn Provider>,
    sampling: SamplingConfig,
}

impl Generator {
    pub fn new(provider: Arc<dyn Provider>, sampling: SamplingConfig) -> Self {
        Self { provider, sampling }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, SimError> {
        let provider = OpenAiCompatibleProvider::from_config(config)?;
        Ok(Self::new(Arc::new(provider), SamplingConfig::from(config)))
    }

    pub fn sampling(&self) -> &SamplingConfig {
        &self.sampling
    }

    /// Exactly one request; no retries.
    pub async fn generate(&self, prompt: &Prompt) -> Result<Completion, SimError> {
        let request = CompletionRequest {
            system: prompt.system(),
            user: prompt.user(),
            model: &self.sampling.model,
            temperature: self.sampling.temperature,
            max_tokens: self.sampling.max_tokens,
        };

        tracing::debug!(
            provider = self.provider.name(),
            model = %self.sampling.model,
            "requesting completion"
        );
        let text = self.provider.complete(&request).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SimError::EmptyCompletion {
                model: self.sampling.model.clone(),
            });
        }
        Ok(Completion {
            text: text.to_string(),
        })
    }
}
