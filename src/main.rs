//! scenecast CLI entry point.

use anyhow::Result;
use clap::Parser;
use scenecast::cli::{commands, Cli, Commands};
use scenecast::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("scenecast={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match &cli.command {
        Some(Commands::Doctor) => {
            commands::run_doctor(&settings)?;
        }

        Some(Commands::Config { action }) => {
            commands::run_config(action, &settings, cli.config.as_deref())?;
        }

        None => {
            std::fs::create_dir_all(settings.work_dir())?;

            let concept = cli
                .concept
                .clone()
                .unwrap_or_else(|| settings.agent.default_prompt.clone());
            let recursion_limit = cli.recursion_limit.unwrap_or(settings.agent.recursion_limit);

            commands::run_generate(&concept, recursion_limit, settings).await?;
        }
    }

    Ok(())
}
