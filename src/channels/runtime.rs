use std::sync::Arc;
use std::time::Duration;

use super::traits::{Channel, ChannelMessage};
use crate::config::DiscordConfig;

/// `(initial, max)` reconnect backoff, never below one second.
pub fn backoff_settings(config: &DiscordConfig) -> (u64, u64) {
    let initial = config.initial_backoff_secs.max(1);
    (initial, config.max_backoff_secs.max(initial))
}

/// Keep `ch.listen` running until the receiving side of `tx` goes away,
/// doubling the pause between restarts up to `max_backoff_secs`.
pub fn spawn_supervised_listener(
    ch: Arc<dyn Channel>,
    tx: tokio::sync::mpsc::Sender<ChannelMessage>,
    initial_backoff_secs: u64,
    max_backoff_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let component = format!("channel:{}", ch.name());
        let mut backoff = initial_backoff_secs.max(1);
        let max_backoff = max_backoff_secs.max(backoff);

        loop {
            tracing::debug!(component, "channel listener starting");
            let result = ch.listen(tx.clone()).await;

            if tx.is_closed() {
                break;
            }

            match result {
                Ok(()) => {
                    tracing::warn!("Channel {} disconnected; reconnecting", ch.name());
                    // clean exit means the session was healthy
                    backoff = initial_backoff_secs.max(1);
                }
                Err(e) => {
                    tracing::error!("Channel {} error: {e:#}; restarting in {backoff}s", ch.name());
                }
            }

            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = backoff.saturating_mul(2).min(max_backoff);
        }
    })
}
