pub mod gateway;
pub mod http_client;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use self::gateway::{DiscordGateway, DiscordGatewayState, GatewayEvent};
use self::http_client::DiscordHttpClient;
use self::types::{API_BASE, DEFAULT_INTENTS, MAX_MESSAGE_LENGTH};
use super::traits::{Channel, ChannelMessage};
use crate::config::DiscordConfig;
use crate::error::ConfigError;

pub struct DiscordChannel {
    http: Arc<DiscordHttpClient>,
    gateway_state: Arc<DiscordGatewayState>,
    bot_token: String,
    config: DiscordConfig,
    bot_user_id: std::sync::Mutex<Option<String>>,
}

struct MessageCreateParams<'a> {
    tx: &'a tokio::sync::mpsc::Sender<ChannelMessage>,
    message_id: String,
    channel_id: String,
    guild_id: Option<String>,
    author_id: String,
    author_name: String,
    author_is_bot: bool,
    content: String,
}

impl DiscordChannel {
    /// Fails with a missing-credential error when no bot token is configured.
    pub fn new(config: DiscordConfig) -> anyhow::Result<Self> {
        Self::with_api_base(config, API_BASE)
    }

    pub fn with_api_base(config: DiscordConfig, api_base: &str) -> anyhow::Result<Self> {
        let bot_token = config
            .bot_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingCredential("DISCORD_TOKEN"))?;
        Ok(Self {
            http: Arc::new(DiscordHttpClient::with_api_base(&bot_token, api_base)?),
            gateway_state: Arc::new(DiscordGatewayState::default()),
            bot_token,
            config,
            bot_user_id: std::sync::Mutex::new(None),
        })
    }

    fn is_user_allowed(&self, user_id: &str) -> bool {
        self.config
            .allowed_users
            .iter()
            .any(|allowed| allowed == "*" || allowed == user_id)
    }

    fn intents(&self) -> u64 {
        self.config.intents.unwrap_or(DEFAULT_INTENTS)
    }

    fn matches_guild_filter(&self, guild_id: Option<&str>) -> bool {
        match &self.config.guild_id {
            Some(gid) => guild_id.is_some_and(|g| g == gid),
            None => true,
        }
    }

    fn set_bot_user_id(&self, user_id: &str) {
        if let Ok(mut guard) = self.bot_user_id.lock() {
            *guard = Some(user_id.to_string());
        }
    }

    fn is_bot_user(&self, user_id: &str) -> bool {
        self.bot_user_id
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .is_some_and(|id| id == user_id)
    }

    async fn handle_gateway_event(
        &self,
        event: GatewayEvent,
        tx: &tokio::sync::mpsc::Sender<ChannelMessage>,
    ) {
        match event {
            GatewayEvent::Ready { user_id, .. } => {
                self.set_bot_user_id(&user_id);
                tracing::info!("Discord: connected as user {user_id}");
            }
            GatewayEvent::MessageCreate {
                message_id,
                channel_id,
                guild_id,
                author_id,
                author_name,
                author_is_bot,
                content,
            } => {
                self.handle_message_create(MessageCreateParams {
                    tx,
                    message_id,
                    channel_id,
                    guild_id,
                    author_id,
                    author_name,
                    author_is_bot,
                    content,
                })
                .await;
            }
        }
    }

    async fn handle_message_create(&self, params: MessageCreateParams<'_>) {
        let MessageCreateParams {
            tx,
            message_id,
            channel_id,
            guild_id,
            author_id,
            author_name,
            author_is_bot,
            content,
        } = params;

        if author_is_bot || self.is_bot_user(&author_id) {
            return;
        }
        if !self.is_user_allowed(&author_id) {
            tracing::warn!("Discord: ignoring message from unauthorized user: {author_id}");
            return;
        }
        if !self.matches_guild_filter(guild_id.as_deref()) {
            return;
        }
        if content.trim().is_empty() {
            return;
        }

        let msg = ChannelMessage {
            id: message_id,
            sender: author_id,
            sender_name: author_name,
            content,
            channel: "discord".to_string(),
            channel_id,
            guild_id,
            timestamp: Utc::now(),
        };

        if tx.send(msg).await.is_err() {
            tracing::warn!("Discord: channel message receiver dropped");
        }
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    fn max_message_length(&self) -> usize {
        MAX_MESSAGE_LENGTH
    }

    async fn send(
        &self,
        message: &str,
        channel_id: &str,
        reply_to: Option<&str>,
    ) -> anyhow::Result<()> {
        self.http
            .send_message(channel_id, message, reply_to)
            .await
            .map(|_| ())
    }

    async fn listen(&self, tx: tokio::sync::mpsc::Sender<ChannelMessage>) -> anyhow::Result<()> {
        let gateway = DiscordGateway::new(
            self.bot_token.clone(),
            self.intents(),
            Arc::clone(&self.gateway_state),
        );

        let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<GatewayEvent>(100);

        let mut gateway_handle = {
            let http = Arc::clone(&self.http);
            tokio::spawn(async move { gateway.connect_and_listen(&http, &event_tx).await })
        };

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    self.handle_gateway_event(event, &tx).await;
                }
                result = &mut gateway_handle => {
                    match result {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => return Err(e),
                        Err(e) => anyhow::bail!("Discord gateway task panicked: {e}"),
                    }
                    break;
                }
            }
        }

        Ok(())
    }

    async fn send_typing(&self, recipient: &str) -> anyhow::Result<()> {
        self.http.send_typing(recipient).await
    }

    async fn health_check(&self) -> bool {
        self.http.get_current_user().await.is_ok()
    }
}
