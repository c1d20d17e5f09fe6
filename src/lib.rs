#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod channels;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod http_client;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod reddit;
pub mod scrub;
pub mod target;
pub mod utils;

pub use config::Config;
pub use error::{ConfigError, SimError};
pub use pipeline::{Pipeline, Simulation};
pub use target::Target;
