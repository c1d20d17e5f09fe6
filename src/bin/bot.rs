#![warn(clippy::all, clippy::pedantic)]

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use seattle_simulator::channels::{
    Channel, ChannelMessage, ChatDispatcher, DiscordChannel, backoff_settings,
    spawn_supervised_listener,
};
use seattle_simulator::commands::CommandSet;
use seattle_simulator::{Config, Pipeline};

const MESSAGE_BUFFER: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    let config = Config::load(None)?;

    let level = config.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let channel: Arc<dyn Channel> = Arc::new(DiscordChannel::new(config.discord.clone())?);
    if !channel.health_check().await {
        tracing::warn!("Discord health check failed; check DISCORD_TOKEN");
    }

    let pipeline = Arc::new(Pipeline::from_config(&config)?);
    let commands = CommandSet::from(&config.discord);
    tracing::info!(
        prefix = %commands.prefix,
        simulate = %commands.simulate,
        default = %config.default_subreddit,
        "Seattle-Simulator bot starting"
    );

    let dispatcher = Arc::new(ChatDispatcher::new(
        Arc::clone(&channel),
        pipeline,
        commands,
        config.default_subreddit.clone(),
    ));

    let (tx, rx) = tokio::sync::mpsc::channel::<ChannelMessage>(MESSAGE_BUFFER);
    let (initial_backoff, max_backoff) = backoff_settings(&config.discord);
    let listener = spawn_supervised_listener(channel, tx, initial_backoff, max_backoff);

    tokio::select! {
        () = dispatcher.run(rx) => {
            tracing::warn!("message stream ended");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("listen for ctrl-c")?;
            tracing::info!("shutting down");
        }
    }

    listener.abort();
    Ok(())
}
