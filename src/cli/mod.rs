mod args;
mod run;

pub use args::Cli;
pub use run::{Outcome, execute, report};
