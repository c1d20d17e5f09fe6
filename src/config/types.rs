use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::target::Target;

/// Process-wide settings, loaded once at startup and passed explicitly to
/// every component constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path the config was read from - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Community simulated when no target is given.
    #[serde(default = "default_subreddit")]
    pub default_subreddit: String,

    /// Home community that `--post` submits to.
    #[serde(default = "default_post_subreddit")]
    pub post_subreddit: String,

    /// Maximum number of context items fetched per invocation.
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    /// Top-level comments fetched per community post (0 disables).
    #[serde(default = "default_comments_per_post")]
    pub comments_per_post: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub reddit: RedditConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub prompt: PromptConfig,

    #[serde(default)]
    pub discord: DiscordConfig,
}

fn default_subreddit() -> String {
    "Seattle".into()
}

fn default_post_subreddit() -> String {
    "circlejerkseattle".into()
}

fn default_result_limit() -> usize {
    25
}

fn default_comments_per_post() -> usize {
    2
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            default_subreddit: default_subreddit(),
            post_subreddit: default_post_subreddit(),
            result_limit: default_result_limit(),
            comments_per_post: default_comments_per_post(),
            log_level: default_log_level(),
            reddit: RedditConfig::default(),
            llm: LlmConfig::default(),
            prompt: PromptConfig::default(),
            discord: DiscordConfig::default(),
        }
    }
}

pub(crate) const MAX_RESULT_LIMIT: usize = 100;

impl Config {
    /// Rewrite the community settings to bare names, so `r/SeattleWA` is
    /// stored as `SeattleWA`. Blank values and user targets are rejected.
    pub fn normalize(&mut self) -> Result<(), ConfigError> {
        self.default_subreddit = bare_community("default_subreddit", &self.default_subreddit)?;
        self.post_subreddit = bare_community("post_subreddit", &self.post_subreddit)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.result_limit == 0 || self.result_limit > MAX_RESULT_LIMIT {
            return Err(ConfigError::Validation(format!(
                "result_limit must be between 1 and {MAX_RESULT_LIMIT}, got {}",
                self.result_limit
            )));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Validation(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "llm.max_tokens must be greater than zero".into(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Validation("llm.model is empty".into()));
        }
        for (field, value) in [
            ("default_subreddit", &self.default_subreddit),
            ("post_subreddit", &self.post_subreddit),
        ] {
            Target::community(value)
                .map_err(|e| ConfigError::Validation(format!("{field}: {e}")))?;
        }
        if self.discord.simulate_command.trim().is_empty()
            || self.discord.help_command.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "discord command names must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn bare_community(field: &str, value: &str) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} is empty")));
    }
    match Target::parse(value, value) {
        Ok(Target::Community(name)) => Ok(name),
        Ok(Target::User(_)) => Err(ConfigError::Validation(format!(
            "{field} must be a community, not a user"
        ))),
        Err(e) => Err(ConfigError::Validation(format!("{field}: {e}"))),
    }
}

// ─── Reddit ──────────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Account used only for `--post`.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_reddit_api_base")]
    pub api_base: String,
    #[serde(default = "default_reddit_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_user_agent() -> String {
    "SeattleSimulator/1.0".into()
}

fn default_reddit_api_base() -> String {
    "https://oauth.reddit.com".into()
}

fn default_reddit_auth_url() -> String {
    "https://www.reddit.com/api/v1/access_token".into()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            user_agent: default_user_agent(),
            username: None,
            password: None,
            api_base: default_reddit_api_base(),
            auth_url: default_reddit_auth_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for RedditConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("user_agent", &self.user_agent)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("auth_url", &self.auth_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ─── Completion endpoint ─────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    /// Label used in logs and errors.
    #[serde(default = "default_provider_name")]
    pub provider: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "groq".into()
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}

fn default_model() -> String {
    "llama-3.1-8b-instant".into()
}

fn default_temperature() -> f64 {
    0.9
}

fn default_max_tokens() -> u32 {
    500
}

fn default_llm_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider_name(),
            base_url: default_llm_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ─── Prompt rendering ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Per-item text cap in the context block.
    #[serde(default = "default_max_item_chars")]
    pub max_item_chars: usize,
    /// Cap for the whole context block.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

fn default_max_item_chars() -> usize {
    300
}

fn default_max_context_chars() -> usize {
    4000
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_item_chars: default_max_item_chars(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

// ─── Discord ─────────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default = "default_allowed_users")]
    pub allowed_users: Vec<String>,
    #[serde(default)]
    pub intents: Option<u64>,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    #[serde(default = "default_simulate_command")]
    pub simulate_command: String,
    #[serde(default = "default_help_command")]
    pub help_command: String,
    #[serde(default = "default_backoff_secs")]
    pub initial_backoff_secs: u64,
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

fn default_allowed_users() -> Vec<String> {
    vec!["*".into()]
}

fn default_command_prefix() -> String {
    "!".into()
}

fn default_simulate_command() -> String {
    "seattleaf".into()
}

fn default_help_command() -> String {
    "seattlehelp".into()
}

fn default_backoff_secs() -> u64 {
    2
}

fn default_max_backoff_secs() -> u64 {
    60
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            guild_id: None,
            allowed_users: default_allowed_users(),
            intents: None,
            command_prefix: default_command_prefix(),
            simulate_command: default_simulate_command(),
            help_command: default_help_command(),
            initial_backoff_secs: default_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("guild_id", &self.guild_id)
            .field("allowed_users", &self.allowed_users)
            .field("intents", &self.intents)
            .field("command_prefix", &self.command_prefix)
            .field("simulate_command", &self.simulate_command)
            .field("help_command", &self.help_command)
            .finish_non_exhaustive()
    }
}
