use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Errors surfaced by the fetch → prompt → generate pipeline and its
/// dispatchers.
///
/// Every stage returns one of these to its immediate caller; nothing recovers
/// locally. The binaries wrap them in `anyhow` only at the outermost layer.
#[derive(Debug, Error)]
pub enum SimError {
    // ── Context fetch ───────────────────────────────────────────────────
    #[error("{target} not found or has no visible content")]
    NotFound { target: String },

    // ── Any upstream (Reddit, completion endpoint) ──────────────────────
    #[error("{service} unavailable: {message}")]
    UpstreamUnavailable { service: String, message: String },

    #[error("{service} rate-limited{}", retry_hint(*.retry_after_secs))]
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },

    // ── Generation ──────────────────────────────────────────────────────
    #[error("{model} returned an empty completion")]
    EmptyCompletion { model: String },

    // ── Posting ─────────────────────────────────────────────────────────
    #[error("post to r/{subreddit} rejected: {reason}")]
    PostFailed { subreddit: String, reason: String },

    // ── Input ───────────────────────────────────────────────────────────
    #[error("invalid target '{input}': {reason}")]
    InvalidTarget { input: String, reason: String },

    // ── Config ──────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

fn retry_hint(retry_after_secs: Option<u64>) -> String {
    retry_after_secs
        .map(|secs| format!(" (retry after {secs}s)"))
        .unwrap_or_default()
}

impl SimError {
    pub fn upstream(service: &str, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_target(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// Short message safe to show in a chat reply. Never carries upstream
    /// bodies or credentials.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { target } => {
                format!("Couldn't find any recent posts for {target}. Does it exist?")
            }
            Self::InvalidTarget { input, .. } => format!(
                "`{input}` doesn't look like a subreddit or `u/username`. Try `!seattlehelp`."
            ),
            Self::RateLimited { .. } => {
                "Too many requests right now. Give it a minute and try again.".to_string()
            }
            Self::EmptyCompletion { .. } => {
                "The model came back with nothing. Try again.".to_string()
            }
            Self::UpstreamUnavailable { .. } | Self::PostFailed { .. } | Self::Config(_) => {
                "Something went wrong generating that post. Try again later.".to_string()
            }
        }
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, SimError>;
