use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::reddit_harness::{
    completion_body, completion_server, config, link, listing, mount_listing, reddit_server,
};
use seattle_simulator::{Config, Pipeline};
use seattle_simulator::channels::{Channel, ChannelMessage, ChatDispatcher};
use seattle_simulator::commands::{Command, CommandSet};

#[derive(Debug, Clone, PartialEq, Eq)]
struct SentReply {
    content: String,
    recipient: String,
    reply_to: Option<String>,
}

#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<SentReply>>,
    typing: Mutex<Vec<String>>,
    max_len: Option<usize>,
}

impl RecordingChannel {
    fn with_max_len(max_len: usize) -> Self {
        Self {
            max_len: Some(max_len),
            ..Self::default()
        }
    }

    fn replies(&self) -> Vec<SentReply> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(
        &self,
        message: &str,
        recipient: &str,
        reply_to: Option<&str>,
    ) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(SentReply {
            content: message.to_string(),
            recipient: recipient.to_string(),
            reply_to: reply_to.map(str::to_string),
        });
        Ok(())
    }

    async fn listen(&self, _tx: tokio::sync::mpsc::Sender<ChannelMessage>) -> anyhow::Result<()> {
        Ok(())
    }

    fn max_message_length(&self) -> usize {
        self.max_len.unwrap_or(usize::MAX)
    }

    async fn send_typing(&self, recipient: &str) -> anyhow::Result<()> {
        self.typing.lock().unwrap().push(recipient.to_string());
        Ok(())
    }
}

fn message(id: &str, content: &str) -> ChannelMessage {
    ChannelMessage {
        id: id.into(),
        sender: "user-1".into(),
        sender_name: "rainy".into(),
        content: content.into(),
        channel: "recording".into(),
        channel_id: "chan-9".into(),
        guild_id: Some("guild-1".into()),
        timestamp: chrono::Utc::now(),
    }
}

async fn dispatcher(
    reddit: &MockServer,
    llm: &MockServer,
) -> (Arc<ChatDispatcher>, Arc<RecordingChannel>) {
    let channel = Arc::new(RecordingChannel::default());
    (dispatcher_on(&config(reddit, llm), channel.clone()), channel)
}

fn dispatcher_on(config: &Config, channel: Arc<RecordingChannel>) -> Arc<ChatDispatcher> {
    let pipeline = Arc::new(Pipeline::from_config(config).unwrap());
    Arc::new(ChatDispatcher::new(
        channel,
        pipeline,
        CommandSet::from(&config.discord),
        config.default_subreddit.clone(),
    ))
}

const GENERIC_FAILURE: &str = "Something went wrong generating that post. Try again later.";

#[tokio::test]
async fn simulate_command_replies_with_generated_post() {
    let reddit = reddit_server().await;
    mount_listing(
        &reddit,
        "/r/SeattleWA/new",
        listing((0..3).map(|i| link("SeattleWA", i)).collect()),
    )
    .await;
    let llm = completion_server("TITLE: Traffic on I-5\nBODY: Still there.", 1).await;
    let (dispatcher, channel) = dispatcher(&reddit, &llm).await;

    let command = CommandSet::default().parse("!seattleaf SeattleWA").unwrap();
    let reply = dispatcher
        .handle(command, message("m-1", "!seattleaf SeattleWA"))
        .await;

    assert_eq!(
        reply,
        "**Simulating r/SeattleWA:**\n\n**Traffic on I-5**\n\nStill there."
    );
    assert_eq!(
        channel.replies(),
        vec![SentReply {
            content: reply,
            recipient: "chan-9".into(),
            reply_to: Some("m-1".into()),
        }]
    );
    assert!(channel.typing.lock().unwrap().contains(&"chan-9".to_string()));
}

#[tokio::test]
async fn upstream_failure_replies_generically_and_keeps_serving() {
    let reddit = reddit_server().await;
    mount_listing(&reddit, "/r/Seattle/new", listing(vec![link("Seattle", 1)])).await;
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model overloaded"))
        .mount(&llm)
        .await;
    let (dispatcher, channel) = dispatcher(&reddit, &llm).await;

    let (tx, rx) = tokio::sync::mpsc::channel(8);
    tx.send(message("m-1", "!seattleaf")).await.unwrap();
    tx.send(message("m-2", "just chatting about the rain")).await.unwrap();
    tx.send(message("m-3", "!seattlehelp")).await.unwrap();
    drop(tx);
    dispatcher.run(rx).await;

    let mut replies = channel.replies();
    replies.sort_by(|a, b| a.reply_to.cmp(&b.reply_to));
    assert_eq!(replies.len(), 2);

    assert_eq!(replies[0].reply_to.as_deref(), Some("m-1"));
    assert_eq!(replies[0].content, GENERIC_FAILURE);
    assert!(!replies[0].content.contains("overloaded"));

    assert_eq!(replies[1].reply_to.as_deref(), Some("m-3"));
    assert!(replies[1].content.contains("`!seattleaf u/<username>`"));
}

#[tokio::test]
async fn invalid_target_reply_names_the_input() {
    let reddit = reddit_server().await;
    let llm = completion_server("unused", 0).await;
    let (dispatcher, channel) = dispatcher(&reddit, &llm).await;

    let reply = dispatcher
        .handle(
            Command::Simulate {
                target: Some("u/x".into()),
            },
            message("m-7", "!seattleaf u/x"),
        )
        .await;

    assert!(reply.contains("`u/x`"));
    assert_eq!(channel.replies().len(), 1);
}

#[tokio::test]
async fn completion_timeout_replies_generically_and_keeps_serving() {
    let reddit = reddit_server().await;
    mount_listing(&reddit, "/r/Seattle/new", listing(vec![link("Seattle", 1)])).await;
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("TITLE: Late\nBODY: Too late."))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&llm)
        .await;
    let mut config = config(&reddit, &llm);
    config.llm.timeout_secs = 1;
    let channel = Arc::new(RecordingChannel::default());
    let dispatcher = dispatcher_on(&config, channel.clone());

    let (tx, rx) = tokio::sync::mpsc::channel(8);
    tx.send(message("m-1", "!seattleaf")).await.unwrap();
    tx.send(message("m-2", "!seattlehelp")).await.unwrap();
    drop(tx);
    dispatcher.run(rx).await;

    let mut replies = channel.replies();
    replies.sort_by(|a, b| a.reply_to.cmp(&b.reply_to));
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].reply_to.as_deref(), Some("m-1"));
    assert_eq!(replies[0].content, GENERIC_FAILURE);
    assert_eq!(replies[1].reply_to.as_deref(), Some("m-2"));
    assert!(replies[1].content.contains("!seattleaf"));
}

#[tokio::test]
async fn reply_fits_channel_message_limit() {
    let reddit = reddit_server().await;
    mount_listing(&reddit, "/r/Seattle/new", listing(vec![link("Seattle", 1)])).await;
    let body = "drizzle ".repeat(200);
    let llm = completion_server(&format!("TITLE: Forecast\nBODY: {body}"), 1).await;
    let channel = Arc::new(RecordingChannel::with_max_len(300));
    let dispatcher = dispatcher_on(&config(&reddit, &llm), channel.clone());

    let reply = dispatcher
        .handle(
            Command::Simulate { target: None },
            message("m-4", "!seattleaf"),
        )
        .await;

    assert_eq!(reply.chars().count(), 300);
    assert!(reply.starts_with("**Simulating r/Seattle:**\n\n**Forecast**"));
    assert!(reply.ends_with("..."));
    assert_eq!(channel.replies()[0].content, reply);
}
