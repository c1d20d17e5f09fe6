pub mod compatible;
pub mod generator;
pub mod traits;

pub use compatible::OpenAiCompatibleProvider;
pub use generator::{Completion, GeneratedPost, Generator, SamplingConfig, UNTITLED_POST};
pub use traits::{CompletionRequest, Provider};
