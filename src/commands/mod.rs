//! Chat command parsing.

mod parser;

pub use parser::{Command, CommandSet};
