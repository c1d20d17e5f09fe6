//! Redaction for upstream error bodies before they reach logs or errors.

use std::borrow::Cow;

use crate::utils::text::truncate_chars;

const MAX_UPSTREAM_ERROR_CHARS: usize = 200;
const REDACTED: &str = "[REDACTED]";

/// Key prefixes used by Groq and other OpenAI-compatible hosts.
const PREFIX_PATTERNS: [&str; 3] = ["gsk_", "sk-", "xai-"];

/// Markers followed by a credential value.
const MARKER_PATTERNS: [&str; 10] = [
    "Authorization: Bearer ",
    "authorization: bearer ",
    "Bearer ",
    "api_key=",
    "access_token=",
    "password=",
    "client_secret=",
    "\"access_token\":\"",
    "\"access_token\": \"",
    "\"api_key\":\"",
];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | '/' | '=')
}

fn token_end(input: &str, from: usize) -> usize {
    input[from..]
        .char_indices()
        .find(|(_, c)| !is_secret_char(*c))
        .map_or(input.len(), |(i, _)| from + i)
}

/// Key prefixes only count at the start of a word (`task-list` is not `sk-`).
fn inside_word(input: &str, at: usize) -> bool {
    input[..at]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn redact_after(scrubbed: &mut String, marker: &str, keep_marker: bool) {
    let mut search_from = 0;
    while let Some(rel) = scrubbed[search_from..].find(marker) {
        let start = search_from + rel;
        let value_start = start + marker.len();
        let end = token_end(scrubbed, value_start);
        if end == value_start || (!keep_marker && inside_word(scrubbed, start)) {
            search_from = value_start;
            continue;
        }
        let replace_from = if keep_marker { value_start } else { start };
        scrubbed.replace_range(replace_from..end, REDACTED);
        search_from = replace_from + REDACTED.len();
    }
}

/// Replace credential-looking substrings with `[REDACTED]`.
pub fn scrub_secrets(input: &str) -> Cow<'_, str> {
    let hit = PREFIX_PATTERNS
        .iter()
        .chain(MARKER_PATTERNS.iter())
        .any(|p| input.contains(p));
    if !hit {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    for marker in MARKER_PATTERNS {
        redact_after(&mut scrubbed, marker, true);
    }
    for prefix in PREFIX_PATTERNS {
        redact_after(&mut scrubbed, prefix, false);
    }
    Cow::Owned(scrubbed)
}

/// Scrub and bound an upstream error body.
pub fn sanitize_upstream_error(input: &str) -> String {
    let scrubbed = scrub_secrets(input.trim());
    if scrubbed.chars().count() <= MAX_UPSTREAM_ERROR_CHARS {
        return scrubbed.into_owned();
    }
    format!("{}...", truncate_chars(&scrubbed, MAX_UPSTREAM_ERROR_CHARS))
}

/// Status line plus sanitized body of a failed response.
pub async fn describe_failure(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    let body = sanitize_upstream_error(&body);
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_is_borrowed() {
        assert!(matches!(
            scrub_secrets("model not found"),
            Cow::Borrowed("model not found")
        ));
    }

    #[test]
    fn groq_key_is_redacted() {
        let out = scrub_secrets("Invalid API Key: gsk_abc123XYZ provided");
        assert_eq!(out, "Invalid API Key: [REDACTED] provided");
    }

    #[test]
    fn bearer_value_is_redacted_but_marker_kept() {
        let out = scrub_secrets("sent Authorization: Bearer tok.en-value");
        assert!(out.contains("Authorization: Bearer [REDACTED]"));
        assert!(!out.contains("tok.en-value"));
    }

    #[test]
    fn json_access_token_is_redacted() {
        let out = scrub_secrets(r#"{"access_token":"abc.def","token_type":"bearer"}"#);
        assert!(!out.contains("abc.def"));
        assert!(out.contains("token_type"));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let long = "e".repeat(500);
        let out = sanitize_upstream_error(&long);
        assert_eq!(out.chars().count(), MAX_UPSTREAM_ERROR_CHARS + 3);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn key_prefix_inside_a_word_is_kept() {
        assert_eq!(scrub_secrets("see task-list and desk-top"), "see task-list and desk-top");
        assert_eq!(
            scrub_secrets("task-list, key sk-abc123, api_key=xai-Z9"),
            "task-list, key [REDACTED], api_key=[REDACTED]"
        );
    }

    #[test]
    fn bare_marker_without_value_is_left_alone() {
        assert_eq!(scrub_secrets("password= missing"), "password= missing");
    }
}
