//! Reddit OAuth client and the [`ContextFetcher`](crate::context::ContextFetcher)
//! built on it.

mod client;
mod fetcher;
mod types;

pub use client::RedditClient;
pub use fetcher::RedditContextFetcher;
pub use types::{MAX_COMMENT_CHARS, MAX_SELFTEXT_CHARS, MAX_TITLE_CHARS, SubmittedPost};
