//! Who gets parodied: a subreddit or a Reddit user.

use std::fmt;

use crate::error::SimError;

const COMMUNITY_MIN_LEN: usize = 2;
const COMMUNITY_MAX_LEN: usize = 21;
const HANDLE_MIN_LEN: usize = 3;
const HANDLE_MAX_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Community(String),
    User(String),
}

impl Target {
    /// Parse a target specifier.
    ///
    /// Blank input selects `default_community`. `u/name` and `/u/name` select
    /// a user; `r/name`, `/r/name` and bare names select a community.
    pub fn parse(input: &str, default_community: &str) -> Result<Self, SimError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::community(default_community);
        }

        let without_slash = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if let Some(handle) = strip_kind_prefix(without_slash, 'u') {
            return Self::user(handle).map_err(|e| retag(e, trimmed));
        }
        if let Some(name) = strip_kind_prefix(without_slash, 'r') {
            return Self::community(name).map_err(|e| retag(e, trimmed));
        }
        Self::community(trimmed)
    }

    pub fn community(name: &str) -> Result<Self, SimError> {
        let name = name.trim().trim_end_matches('/');
        let len = name.chars().count();
        if !(COMMUNITY_MIN_LEN..=COMMUNITY_MAX_LEN).contains(&len) {
            return Err(SimError::invalid_target(
                name,
                format!(
                    "community names are {COMMUNITY_MIN_LEN}-{COMMUNITY_MAX_LEN} characters"
                ),
            ));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(SimError::invalid_target(
                name,
                "community names use only letters, digits and underscores",
            ));
        }
        Ok(Self::Community(name.to_string()))
    }

    pub fn user(handle: &str) -> Result<Self, SimError> {
        let handle = handle.trim().trim_end_matches('/');
        let len = handle.chars().count();
        if !(HANDLE_MIN_LEN..=HANDLE_MAX_LEN).contains(&len) {
            return Err(SimError::invalid_target(
                handle,
                format!("usernames are {HANDLE_MIN_LEN}-{HANDLE_MAX_LEN} characters"),
            ));
        }
        if !handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(SimError::invalid_target(
                handle,
                "usernames use only letters, digits, '-' and '_'",
            ));
        }
        Ok(Self::User(handle.to_string()))
    }

    /// Bare name without the `r/` / `u/` prefix.
    pub fn name(&self) -> &str {
        match self {
            Self::Community(name) | Self::User(name) => name,
        }
    }

    pub fn display_name(&self) -> String {
        self.to_string()
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Community(name) => write!(f, "r/{name}"),
            Self::User(handle) => write!(f, "u/{handle}"),
        }
    }
}

fn strip_kind_prefix(input: &str, kind: char) -> Option<&str> {
    let mut chars = input.chars();
    let first = chars.next()?;
    if !first.eq_ignore_ascii_case(&kind) || chars.next()? != '/' {
        return None;
    }
    Some(&input[2..])
}

fn retag(err: SimError, original: &str) -> SimError {
    match err {
        SimError::InvalidTarget { reason, .. } => SimError::invalid_target(original, reason),
        other => other,
    }
}
