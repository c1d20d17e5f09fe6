use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A chat message received from a channel.
///
/// `sender` is the platform user ID and `sender_name` its display handle.
/// `channel_id` is where replies go.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub id: String,
    pub sender: String,
    pub sender_name: String,
    pub content: String,
    pub channel: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A chat platform the bot can listen on and reply through.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Send `message` to `recipient`, threading it under `reply_to` when the
    /// platform supports replies.
    async fn send(
        &self,
        message: &str,
        recipient: &str,
        reply_to: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Long-running; returns when the connection drops.
    async fn listen(&self, tx: tokio::sync::mpsc::Sender<ChannelMessage>) -> anyhow::Result<()>;

    async fn health_check(&self) -> bool {
        true
    }

    fn max_message_length(&self) -> usize {
        usize::MAX
    }

    async fn send_typing(&self, _recipient: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
