//! Discord API constants and the gateway opcodes this bot speaks.

/// Discord REST base URL (v10).
pub const API_BASE: &str = "https://discord.com/api/v10";

/// Used when `gateway/bot` omits a URL.
pub const FALLBACK_GATEWAY_URL: &str = "wss://gateway.discord.gg";

/// Default Gateway intents bitmask.
///
/// GUILDS (1) | `GUILD_MESSAGES` (512) | `DIRECT_MESSAGES` (4096)
/// | `MESSAGE_CONTENT` (32768) = 37377
pub const DEFAULT_INTENTS: u64 = 37377;

/// Default heartbeat interval when server does not provide one (ms).
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 41250;

/// Discord maximum message length (characters).
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Gateway opcodes used in the Discord WebSocket protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GatewayOpcode {
    /// An event was dispatched (server → client).
    Dispatch = 0,
    Heartbeat = 1,
    Identify = 2,
    Resume = 6,
    /// Server is telling the client to reconnect.
    Reconnect = 7,
    InvalidSession = 9,
    /// Sent immediately after connecting; contains heartbeat interval.
    Hello = 10,
    HeartbeatAck = 11,
}

impl GatewayOpcode {
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            6 => Some(Self::Resume),
            7 => Some(Self::Reconnect),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }
}

/// Gateway intent flags.
pub mod intents {
    pub const GUILDS: u64 = 1 << 0;
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    pub const DIRECT_MESSAGES: u64 = 1 << 12;
    pub const MESSAGE_CONTENT: u64 = 1 << 15;
}
