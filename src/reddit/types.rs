//! Reddit API wire types.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::context::{ContextItem, SourceType};
use crate::utils::text::truncate_chars;

/// Longest self-text kept for a post.
pub const MAX_SELFTEXT_CHARS: usize = 500;
/// Longest comment body kept.
pub const MAX_COMMENT_CHARS: usize = 300;
/// Reddit rejects titles longer than this.
pub const MAX_TITLE_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: Option<String>,
    pub(crate) error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    pub(crate) data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData {
    #[serde(default)]
    pub(crate) children: Vec<RawThing>,
}

/// A listing child before its `kind` is inspected. Listings mix `t3`
/// links, `t1` comments and `more` stubs.
#[derive(Debug, Deserialize)]
pub(crate) struct RawThing {
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) data: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LinkData {
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) selftext: String,
    #[serde(default = "deleted_author")]
    pub(crate) author: String,
    #[serde(default)]
    pub(crate) score: i64,
    #[serde(default)]
    pub(crate) created_utc: f64,
    #[serde(default)]
    pub(crate) subreddit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommentData {
    #[serde(default)]
    pub(crate) body: String,
    #[serde(default = "deleted_author")]
    pub(crate) author: String,
    #[serde(default)]
    pub(crate) score: i64,
    #[serde(default)]
    pub(crate) created_utc: f64,
    #[serde(default)]
    pub(crate) subreddit: String,
}

fn deleted_author() -> String {
    "[deleted]".into()
}

#[derive(Debug)]
pub(crate) enum Thing {
    Link(LinkData),
    Comment(CommentData),
}

impl Listing {
    /// Typed children; `more` stubs and undecodable entries are dropped.
    pub(crate) fn into_things(self) -> Vec<Thing> {
        self.data
            .children
            .into_iter()
            .filter_map(|raw| match raw.kind.as_str() {
                "t3" => serde_json::from_value(raw.data).ok().map(Thing::Link),
                "t1" => serde_json::from_value(raw.data).ok().map(Thing::Comment),
                _ => None,
            })
            .collect()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn timestamp(created_utc: f64) -> DateTime<Utc> {
    DateTime::from_timestamp(created_utc.trunc() as i64, 0).unwrap_or_default()
}

fn is_removed(body: &str) -> bool {
    matches!(body.trim(), "" | "[deleted]" | "[removed]")
}

impl LinkData {
    pub(crate) fn to_item(&self) -> ContextItem {
        let mut text = format!("Title: {}", self.title.trim());
        let body = self.selftext.trim();
        if !is_removed(body) {
            text.push_str("\nBody: ");
            text.push_str(truncate_chars(body, MAX_SELFTEXT_CHARS));
        }
        ContextItem {
            source_type: SourceType::Post,
            author: self.author.clone(),
            text,
            score: self.score,
            subreddit: self.subreddit.clone(),
            created_utc: timestamp(self.created_utc),
        }
    }
}

impl CommentData {
    pub(crate) fn is_visible(&self) -> bool {
        !is_removed(&self.body)
    }

    pub(crate) fn to_item(&self) -> ContextItem {
        ContextItem {
            source_type: SourceType::Comment,
            author: self.author.clone(),
            text: truncate_chars(self.body.trim(), MAX_COMMENT_CHARS).to_string(),
            score: self.score,
            subreddit: self.subreddit.clone(),
            created_utc: timestamp(self.created_utc),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    pub(crate) json: SubmitJson,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitJson {
    #[serde(default)]
    pub(crate) errors: Vec<Vec<Value>>,
    #[serde(default)]
    pub(crate) data: Option<SubmitData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitData {
    #[serde(default)]
    pub(crate) url: Option<String>,
    #[serde(default)]
    pub(crate) name: Option<String>,
}

impl SubmitJson {
    /// `[["SUBREDDIT_NOTALLOWED", "you aren't allowed to post there.", "sr"]]`
    /// becomes `SUBREDDIT_NOTALLOWED: you aren't allowed to post there.`
    pub(crate) fn error_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        let rendered = self
            .errors
            .iter()
            .map(|entry| {
                entry
                    .iter()
                    .take(2)
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(": ")
            })
            .collect::<Vec<_>>()
            .join("; ");
        Some(rendered)
    }
}

/// A post accepted by Reddit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedPost {
    pub id: Option<String>,
    pub url: Option<String>,
}
