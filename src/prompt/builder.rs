use std::fmt;

use tera::Context;

use super::engine::TeraEngine;
use crate::config::PromptConfig;
use crate::context::ContextItem;
use crate::error::ConfigError;
use crate::target::Target;
use crate::utils::text::{single_line, truncate_chars};

const COMMUNITY_PERSONA_NAME: &str = "community_persona";
const USER_PERSONA_NAME: &str = "user_persona";
const GENERIC_PERSONA_NAME: &str = "generic_persona";
const REQUEST_NAME: &str = "request";

const OUTPUT_FORMAT: &str = "\
Return EXACTLY in this format:
TITLE: [your title here]
BODY: [your post body here]";

const SEATTLE_THEMES: [&str; 11] = [
    "Housing costs and rent that is too damn high",
    "Homeless encampment discourse",
    "\"I saw the mountain today\" posts",
    "Tech bro culture",
    "The passive-aggressive Seattle freeze",
    "Rain appreciation or rain complaints",
    "Traffic on I-5 and 405",
    "Amazon and Microsoft drama",
    "\"Moving to Seattle, what should I know?\"",
    "Sunset photos from Kerry Park",
    "Complaining about California transplants",
];

const COMMUNITY_PERSONA: &str = "\
You are a satirical Reddit post generator that parodies {{ display }}.
Write a funny, exaggerated post that captures the stereotypical themes, complaints and vibes of this community. Be creative and amusing, never mean-spirited.

Common Seattle subreddit themes to riff on:
{% for theme in themes %}- {{ theme }}
{% endfor %}
{{ output_format }}";

const USER_PERSONA: &str = "\
You are a satirical Reddit commenter that parodies {{ display }}.
Based on their posting history, write a funny, exaggerated post in their style. Capture their usual topics, tone and quirks. Be amusing, never cruel.

{{ output_format }}";

const GENERIC_PERSONA: &str = "\
You are a satirical Reddit post generator for Seattle-area communities.
There is no recent activity to draw on for {{ display }}, so lean on the classic local themes:
{% for theme in themes %}- {{ theme }}
{% endfor %}
{{ output_format }}";

const REQUEST: &str = "\
{% if context_block %}{{ context_block }}

{% endif %}Now generate a satirical Reddit post that parodies {{ display }}. Include both a title and a body.";

const FALLBACK_SYSTEM: &str = "\
You are a satirical Reddit post generator for Seattle-area communities.

Return EXACTLY in this format:
TITLE: [your title here]
BODY: [your post body here]";

/// A rendered prompt: persona preamble plus request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    system: String,
    user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Persona preamble, sent as the system message.
    pub fn system(&self) -> &str {
        &self.system
    }

    /// Request with the optional context block, sent as the user message.
    pub fn user(&self) -> &str {
        &self.user
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\n{}", self.system, self.user)
    }
}

/// Renders context items into a satirical [`Prompt`].
pub struct PromptBuilder {
    engine: TeraEngine,
    max_item_chars: usize,
    max_context_chars: usize,
}

impl PromptBuilder {
    /// Compile every template up front so [`build`](Self::build) cannot hit a
    /// syntax error.
    pub fn new(config: &PromptConfig) -> Result<Self, ConfigError> {
        let mut engine = TeraEngine::new();
        for (name, content) in [
            (COMMUNITY_PERSONA_NAME, COMMUNITY_PERSONA),
            (USER_PERSONA_NAME, USER_PERSONA),
            (GENERIC_PERSONA_NAME, GENERIC_PERSONA),
            (REQUEST_NAME, REQUEST),
        ] {
            engine
                .add_template(name, content)
                .map_err(|e| ConfigError::Validation(format!("prompt template {name}: {e}")))?;
        }
        Ok(Self {
            engine,
            max_item_chars: config.max_item_chars,
            max_context_chars: config.max_context_chars,
        })
    }

    /// Deterministic: identical inputs give identical prompts.
    pub fn build(&self, target: &Target, items: &[ContextItem]) -> Prompt {
        match self.render(target, items) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::error!(error = %e, subject = %target, "prompt render failed; using fallback");
                Prompt::new(
                    FALLBACK_SYSTEM,
                    format!("Generate a satirical Reddit post that parodies {target}."),
                )
            }
        }
    }

    fn render(&self, target: &Target, items: &[ContextItem]) -> anyhow::Result<Prompt> {
        let persona = match (items.is_empty(), target) {
            (true, _) => GENERIC_PERSONA_NAME,
            (false, Target::Community(_)) => COMMUNITY_PERSONA_NAME,
            (false, Target::User(_)) => USER_PERSONA_NAME,
        };

        let mut ctx = Context::new();
        ctx.insert("display", &target.display_name());
        ctx.insert("themes", &SEATTLE_THEMES);
        ctx.insert("output_format", OUTPUT_FORMAT);
        ctx.insert("context_block", &self.context_block(target, items));

        let system = self.engine.render(persona, &ctx)?;
        let user = self.engine.render(REQUEST_NAME, &ctx)?;
        Ok(Prompt::new(system.trim_end(), user.trim_end()))
    }

    /// Header plus one line per item, capped at `max_context_chars` by
    /// dropping trailing lines. Empty when there are no items.
    fn context_block(&self, target: &Target, items: &[ContextItem]) -> String {
        if items.is_empty() {
            return String::new();
        }

        let mut block = format!("Here's recent content from {target}:");
        for item in items {
            let line = self.item_line(item);
            if block.chars().count() + 1 + line.chars().count() > self.max_context_chars {
                break;
            }
            block.push('\n');
            block.push_str(&line);
        }
        block
    }

    fn item_line(&self, item: &ContextItem) -> String {
        let text = single_line(&item.text);
        format!(
            "- [{}] u/{} ({} pts, r/{}): {}",
            item.source_type,
            item.author,
            item.score,
            item.subreddit,
            truncate_chars(&text, self.max_item_chars)
        )
    }
}
