use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;

use super::args::Cli;
use crate::config::Config;
use crate::llm::GeneratedPost;
use crate::pipeline::Pipeline;
use crate::reddit::{RedditClient, SubmittedPost};
use crate::target::Target;

const RULE_WIDTH: usize = 60;

/// What a CLI invocation ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Printed,
    Posted(SubmittedPost),
    Cancelled,
}

/// Run one CLI invocation. The post goes to `out`; progress goes to stderr
/// through `tracing`. `confirm` is asked before posting unless `--yes`.
pub async fn execute<W, C>(
    cli: &Cli,
    config: &Config,
    pipeline: &Pipeline,
    out: &mut W,
    confirm: C,
) -> anyhow::Result<Outcome>
where
    W: Write,
    C: FnOnce(&str) -> anyhow::Result<bool>,
{
    let target = Target::parse(cli.target.as_deref().unwrap_or_default(), &config.default_subreddit)?;
    tracing::info!(
        "Fetching {target} {}...",
        if target.is_user() { "history" } else { "posts" }
    );

    let simulation = pipeline.run(&target).await?;
    render(out, &simulation.post)?;

    if !cli.post {
        return Ok(Outcome::Printed);
    }

    let subreddit = &config.post_subreddit;
    if !cli.yes && !confirm(&format!("Post to r/{subreddit}?"))? {
        writeln!(out, "Cancelled.")?;
        return Ok(Outcome::Cancelled);
    }

    let reddit = RedditClient::from_config(&config.reddit)?;
    let submitted = reddit
        .submit_self_post(subreddit, &simulation.post.title, &simulation.post.body)
        .await?;
    match &submitted.url {
        Some(url) => writeln!(out, "Posted! {url}")?,
        None => writeln!(out, "Posted to r/{subreddit}.")?,
    }
    Ok(Outcome::Posted(submitted))
}

fn render<W: Write>(out: &mut W, post: &GeneratedPost) -> anyhow::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "\n{rule}")?;
    writeln!(out, "TITLE: {}", post.title)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "{}", post.body)?;
    writeln!(out, "{rule}")?;
    out.flush().context("failed to write post")
}

/// Process status for a finished invocation. A failure's full error chain
/// goes to `err_out` as `Error: ...`; nothing is written on success.
pub fn report<T, W: Write>(result: anyhow::Result<T>, err_out: &mut W) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            // stderr may already be gone; the status still reports failure
            let _ = writeln!(err_out, "Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
