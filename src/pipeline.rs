//! The shared fetch → prompt → generate sequence behind both front ends.

use std::sync::Arc;

use crate::config::Config;
use crate::context::ContextFetcher;
use crate::error::SimError;
use crate::llm::{Completion, GeneratedPost, Generator};
use crate::prompt::PromptBuilder;
use crate::reddit::RedditContextFetcher;
use crate::target::Target;

/// Result of one successful run.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub target: Target,
    pub item_count: usize,
    pub post: GeneratedPost,
    pub completion: Completion,
}

/// Stateless between runs; share it behind an `Arc`.
pub struct Pipeline {
    fetcher: Arc<dyn ContextFetcher>,
    builder: PromptBuilder,
    generator: Generator,
    limit: usize,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn ContextFetcher>,
        builder: PromptBuilder,
        generator: Generator,
        limit: usize,
    ) -> Self {
        Self {
            fetcher,
            builder,
            generator,
            limit,
        }
    }

    /// Reddit fetcher plus the configured completion endpoint.
    pub fn from_config(config: &Config) -> Result<Self, SimError> {
        let fetcher = RedditContextFetcher::from_config(config)?;
        let builder = PromptBuilder::new(&config.prompt)?;
        let generator = Generator::from_config(&config.llm)?;
        Ok(Self::new(
            Arc::new(fetcher),
            builder,
            generator,
            config.result_limit,
        ))
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Any stage failure aborts the rest; nothing is retried.
    pub async fn run(&self, target: &Target) -> Result<Simulation, SimError> {
        let items = self.fetcher.fetch(target, self.limit).await?;
        tracing::info!(subject = %target, items = items.len(), "context fetched");

        let prompt = self.builder.build(target, &items);
        let completion = self.generator.generate(&prompt).await?;
        let post = GeneratedPost::parse(&completion.text);
        tracing::info!(subject = %target, title = %post.title, "post generated");

        Ok(Simulation {
            target: target.clone(),
            item_count: items.len(),
            post,
            completion,
        })
    }
}
