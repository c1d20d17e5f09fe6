mod builder;
mod engine;

pub use builder::{Prompt, PromptBuilder};
pub use engine::TeraEngine;
