//! CLI module for scenecast.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// scenecast - narrated math animations from a single prompt
///
/// Give a concept or a question; an LLM agent writes a Manim scene, renders
/// it and adds a voice-over.
#[derive(Parser, Debug)]
#[command(name = "scenecast")]
#[command(version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Concept or question to explain (defaults to agent.default_prompt)
    pub concept: Option<String>,

    /// Maximum number of agent steps before aborting
    #[arg(long)]
    pub recursion_limit: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check external tools and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the current configuration to the default location
    Init,

    /// Show configuration file path
    Path,
}
