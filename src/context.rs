//! Context items: the recent posts and comments that seed a parody.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strum::{Display, EnumString};

use crate::error::SimError;
use crate::target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SourceType {
    Post,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextItem {
    pub source_type: SourceType,
    pub author: String,
    pub text: String,
    pub score: i64,
    pub subreddit: String,
    pub created_utc: DateTime<Utc>,
}

/// Sort newest-first and cap at `limit`.
pub fn newest_first(mut items: Vec<ContextItem>, limit: usize) -> Vec<ContextItem> {
    items.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
    items.truncate(limit);
    items
}

/// Source of recent activity for a target.
#[async_trait]
pub trait ContextFetcher: Send + Sync {
    /// Recent items for `target`, newest first, at most `limit` long.
    ///
    /// Fails with `NotFound` when the target is missing or has nothing
    /// visible.
    async fn fetch(&self, target: &Target, limit: usize) -> Result<Vec<ContextItem>, SimError>;
}
