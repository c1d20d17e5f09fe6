#![warn(clippy::all, clippy::pedantic)]

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use dialoguer::Confirm;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use seattle_simulator::cli::{Cli, execute, report};
use seattle_simulator::{Config, Pipeline};

#[tokio::main]
async fn main() -> ExitCode {
    report(run().await, &mut std::io::stderr())
}

async fn run() -> Result<()> {
    dotenv::dotenv().ok();

    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config)?;

    // progress goes to stderr so stdout carries only the post
    let level = config.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let pipeline = Pipeline::from_config(&config)?;
    let mut stdout = std::io::stdout().lock();
    execute(&cli, &config, &pipeline, &mut stdout, |question| {
        Ok(Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()?)
    })
    .await?;
    Ok(())
}
