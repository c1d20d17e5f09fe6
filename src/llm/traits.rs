use async_trait::async_trait;

use crate::error::SimError;

/// One chat-completion call: persona as the system message, request as the
/// user message.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub model: &'a str,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Label used in logs and errors.
    fn name(&self) -> &str;

    /// Raw completion text. May be empty; callers decide what that means.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, SimError>;
}
