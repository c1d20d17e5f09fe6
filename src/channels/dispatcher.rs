//! Routes chat commands to the pipeline and posts the results back.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::traits::{Channel, ChannelMessage};
use crate::commands::{Command, CommandSet};
use crate::error::SimError;
use crate::llm::GeneratedPost;
use crate::pipeline::Pipeline;
use crate::target::Target;
use crate::utils::text::truncate_chars;

/// Cap for the generated part of a reply, whatever the channel allows.
pub const MAX_REPLY_POST_CHARS: usize = 1900;

/// Typing indicators expire after about ten seconds.
const TYPING_REFRESH: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Processing,
}

/// One recognised command and where its reply goes.
#[derive(Debug)]
struct Trigger {
    command: Command,
    message: ChannelMessage,
    state: TriggerState,
}

impl Trigger {
    fn transition(&mut self, to: TriggerState) {
        tracing::debug!(
            message_id = %self.message.id,
            from = ?self.state,
            to = ?to,
            "trigger state"
        );
        self.state = to;
    }
}

pub struct ChatDispatcher {
    channel: Arc<dyn Channel>,
    pipeline: Arc<Pipeline>,
    commands: CommandSet,
    default_subreddit: String,
}

impl ChatDispatcher {
    pub fn new(
        channel: Arc<dyn Channel>,
        pipeline: Arc<Pipeline>,
        commands: CommandSet,
        default_subreddit: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            pipeline,
            commands,
            default_subreddit: default_subreddit.into(),
        }
    }

    /// Consume messages until every sender is dropped. Each trigger runs
    /// on its own task so a slow generation never blocks the next command.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<ChannelMessage>) {
        let mut tasks = tokio::task::JoinSet::new();
        while let Some(message) = rx.recv().await {
            let Some(command) = self.commands.parse(&message.content) else {
                continue;
            };
            let this = Arc::clone(&self);
            tasks.spawn(async move {
                this.handle(command, message).await;
            });
            // reap finished triggers so the set stays small
            while tasks.try_join_next().is_some() {}
        }
        while tasks.join_next().await.is_some() {}
    }

    /// Answer one command. Returns the reply text that was sent.
    pub async fn handle(&self, command: Command, message: ChannelMessage) -> String {
        let mut trigger = Trigger {
            command,
            message,
            state: TriggerState::Idle,
        };
        trigger.transition(TriggerState::Processing);

        let reply = match &trigger.command {
            Command::Help => self.commands.help_text(),
            Command::Simulate { target } => {
                tracing::info!(
                    user = %trigger.message.sender_name,
                    channel_id = %trigger.message.channel_id,
                    requested = target.as_deref().unwrap_or(""),
                    "simulate command received"
                );
                match self
                    .simulate(target.as_deref(), &trigger.message.channel_id)
                    .await
                {
                    Ok(reply) => reply,
                    Err(e) => {
                        tracing::warn!(
                            channel_id = %trigger.message.channel_id,
                            error = %e,
                            "simulation failed"
                        );
                        e.user_message()
                    }
                }
            }
        };

        if let Err(e) = self
            .channel
            .send(
                &reply,
                &trigger.message.channel_id,
                Some(trigger.message.id.as_str()),
            )
            .await
        {
            tracing::error!(
                channel = self.channel.name(),
                channel_id = %trigger.message.channel_id,
                "failed to send reply: {e:#}"
            );
        }

        trigger.transition(TriggerState::Idle);
        reply
    }

    async fn simulate(&self, requested: Option<&str>, channel_id: &str) -> Result<String, SimError> {
        let target = Target::parse(requested.unwrap_or_default(), &self.default_subreddit)?;

        let run = self.pipeline.run(&target);
        tokio::pin!(run);
        let mut typing = tokio::time::interval(TYPING_REFRESH);
        let simulation = loop {
            tokio::select! {
                result = &mut run => break result?,
                _ = typing.tick() => {
                    if let Err(e) = self.channel.send_typing(channel_id).await {
                        tracing::debug!(channel_id, "typing indicator failed: {e:#}");
                    }
                }
            }
        };

        Ok(format_reply(
            &target,
            &simulation.post,
            self.channel.max_message_length(),
        ))
    }
}

/// `**Simulating r/x:**` header over the bolded title and body, cut with
/// `...` so the whole reply fits in `max_chars`.
pub fn format_reply(target: &Target, post: &GeneratedPost, max_chars: usize) -> String {
    let header = format!("**Simulating {}:**\n\n", target.display_name());
    let text = format!("**{}**\n\n{}", post.title, post.body);
    let budget = max_chars
        .saturating_sub(header.chars().count() + 3)
        .min(MAX_REPLY_POST_CHARS);
    if text.chars().count() > budget {
        format!("{header}{}...", truncate_chars(&text, budget))
    } else {
        format!("{header}{text}")
    }
}
