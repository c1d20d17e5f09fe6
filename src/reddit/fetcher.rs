use async_trait::async_trait;
use futures_util::stream::{self, StreamExt, TryStreamExt};

use super::client::RedditClient;
use super::types::{LinkData, MAX_COMMENT_CHARS, Thing};
use crate::config::Config;
use crate::context::{ContextFetcher, ContextItem, newest_first};
use crate::error::SimError;
use crate::target::Target;

/// Submissions fetched alongside a user's comments.
const USER_SUBMISSION_CAP: usize = 10;
/// Concurrent comment-tree requests per community fetch.
const COMMENT_FETCH_CONCURRENCY: usize = 4;

/// [`ContextFetcher`] backed by the Reddit OAuth API.
pub struct RedditContextFetcher {
    client: RedditClient,
    comments_per_post: usize,
}

impl RedditContextFetcher {
    pub fn new(client: RedditClient, comments_per_post: usize) -> Self {
        Self {
            client,
            comments_per_post,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, SimError> {
        Ok(Self::new(
            RedditClient::from_config(&config.reddit)?,
            config.comments_per_post,
        ))
    }

    pub fn client(&self) -> &RedditClient {
        &self.client
    }

    async fn fetch_community(
        &self,
        token: &str,
        name: &str,
        limit: usize,
    ) -> Result<Vec<ContextItem>, SimError> {
        let display = format!("r/{name}");
        let things = self
            .client
            .listing(
                token,
                &format!("/r/{name}/new"),
                &[("limit", limit.to_string())],
                &display,
            )
            .await?;

        let links: Vec<LinkData> = things
            .into_iter()
            .filter_map(|thing| match thing {
                Thing::Link(link) => Some(link),
                Thing::Comment(_) => None,
            })
            .collect();

        let mut items: Vec<ContextItem> = links.iter().map(LinkData::to_item).collect();
        if self.comments_per_post > 0 {
            items.extend(self.comments_for(token, name, &links).await?);
        }
        Ok(items)
    }

    async fn comments_for(
        &self,
        token: &str,
        name: &str,
        links: &[LinkData],
    ) -> Result<Vec<ContextItem>, SimError> {
        let requests: Vec<_> = links
            .iter()
            .map(|link| self.comment_batch(token, name, link))
            .collect();
        let batches: Vec<Vec<ContextItem>> =
            stream::iter(requests)
                .buffered(COMMENT_FETCH_CONCURRENCY)
                .try_collect()
                .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    async fn comment_batch(
        &self,
        token: &str,
        name: &str,
        link: &LinkData,
    ) -> Result<Vec<ContextItem>, SimError> {
        let per_post = self.comments_per_post;
        match self
            .client
            .top_comments(token, name, &link.id, per_post * 2)
            .await
        {
            Ok(comments) => Ok(comments
                .iter()
                .filter(|c| c.is_visible() && c.body.chars().count() < MAX_COMMENT_CHARS)
                .take(per_post)
                .map(|c| c.to_item())
                .collect()),
            // Post vanished between the listing and this request.
            Err(SimError::NotFound { .. }) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    async fn fetch_user(
        &self,
        token: &str,
        handle: &str,
        limit: usize,
    ) -> Result<Vec<ContextItem>, SimError> {
        let display = format!("u/{handle}");
        let comments_path = format!("/user/{handle}/comments");
        let submitted_path = format!("/user/{handle}/submitted");
        let comments_query = [("sort", "new".to_string()), ("limit", limit.to_string())];
        let submitted_query = [
            ("sort", "new".to_string()),
            ("limit", limit.min(USER_SUBMISSION_CAP).to_string()),
        ];

        let (comments, submitted) = tokio::try_join!(
            self.client
                .listing(token, &comments_path, &comments_query, &display),
            self.client
                .listing(token, &submitted_path, &submitted_query, &display),
        )?;

        let items = comments
            .into_iter()
            .chain(submitted)
            .filter_map(|thing| match thing {
                Thing::Comment(comment) if comment.is_visible() => Some(comment.to_item()),
                Thing::Comment(_) => None,
                Thing::Link(link) => Some(link.to_item()),
            })
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl ContextFetcher for RedditContextFetcher {
    async fn fetch(&self, target: &Target, limit: usize) -> Result<Vec<ContextItem>, SimError> {
        let token = self.client.app_token().await?;
        let items = match target {
            Target::Community(name) => self.fetch_community(&token, name, limit).await?,
            Target::User(handle) => self.fetch_user(&token, handle, limit).await?,
        };

        let items = newest_first(items, limit);
        if items.is_empty() {
            return Err(SimError::NotFound {
                target: target.display_name(),
            });
        }
        tracing::debug!(subject = %target, count = items.len(), "fetched context");
        Ok(items)
    }
}
