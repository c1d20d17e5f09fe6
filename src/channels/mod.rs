pub mod discord;
pub mod dispatcher;
pub mod runtime;
pub mod traits;

pub use discord::DiscordChannel;
pub use dispatcher::{ChatDispatcher, TriggerState, format_reply};
pub use runtime::{backoff_settings, spawn_supervised_listener};
pub use traits::{Channel, ChannelMessage};
