//! scenecast - narrated math animations from a single prompt
//!
//! A CLI tool that asks an LLM agent to turn a concept into a Manim scene,
//! renders it, adds a synthesized voice-over and writes the resulting video
//! to a working directory.
//!
//! # Overview
//!
//! A run is a tool-calling conversation. The agent model decides when to:
//! - generate a Manim script for the concept (`generate_manim_script`)
//! - render it with narration (`execute_manim_with_audio`)
//! - search the web for a fix after a failed render (`search_solution`)
//!
//! Failed tool results are detected after every dispatch and the model is
//! told to restart from script generation.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `llm` - Message model and the chat model abstraction
//! - `script` - Script generation and reply scraping
//! - `render` - Rendering, narration and muxing through external tools
//! - `search` - Web search used to look up render errors
//! - `agent` - The conversation loop and tool dispatch
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scenecast::agent::{Agent, ToolContext};
//! use scenecast::config::{Prompts, Settings};
//! use scenecast::llm::OpenAIChatModel;
//! use scenecast::render::Renderer;
//! use scenecast::script::ScriptGenerator;
//! use scenecast::search::DuckDuckGoSearch;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let prompts = Prompts::default();
//!
//!     let agent_model = Arc::new(OpenAIChatModel::from_settings(&settings.llm, None)?);
//!     let script_model = Arc::new(OpenAIChatModel::from_settings(
//!         &settings.llm,
//!         Some(settings.generator_model()),
//!     )?);
//!
//!     let tools = ToolContext::new(
//!         Arc::new(ScriptGenerator::new(script_model, prompts.clone())),
//!         Arc::new(Renderer::from_settings(&settings.render, settings.work_dir())),
//!         Arc::new(DuckDuckGoSearch::from_settings(&settings.search)?),
//!     );
//!
//!     let agent = Agent::new(agent_model, tools, prompts);
//!     let transcript = agent.run("limite d'une fonction", 50).await?;
//!     println!("{} messages", transcript.len());
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod openai;
pub mod render;
pub mod script;
pub mod search;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, ScenecastError};
