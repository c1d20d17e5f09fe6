use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::ConfigError;

/// Seattle Simulator - satirical posts in the style of Seattle-area Reddit.
#[derive(Parser, Debug)]
#[command(name = "seattle-simulator")]
#[command(version)]
#[command(about = "Generate a satirical post parodying a subreddit or Reddit user.", long_about = None)]
pub struct Cli {
    /// Subreddit (`Seattle`, `r/SeattleWA`) or user (`u/someone`); defaults to the configured community
    pub target: Option<String>,

    /// Submit the generated post to Reddit after confirmation
    #[arg(long)]
    pub post: bool,

    /// Community to submit to with --post (default: config `post_subreddit`)
    #[arg(long, value_name = "NAME")]
    pub subreddit: Option<String>,

    /// Skip the confirmation prompt for --post
    #[arg(short, long)]
    pub yes: bool,

    /// Maximum number of context items to fetch (1-100)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Completion model to use
    #[arg(long)]
    pub model: Option<String>,

    /// Path to config.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Fold command-line overrides into the loaded config and re-validate.
    pub fn apply_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
        if let Some(limit) = self.limit {
            config.result_limit = limit;
        }
        if let Some(model) = &self.model {
            config.llm.model.clone_from(model);
        }
        if let Some(subreddit) = &self.subreddit {
            config.post_subreddit.clone_from(subreddit);
        }
        if self.verbose {
            config.log_level = "debug".into();
        }
        config.normalize()?;
        config.validate()
    }
}
