//! Generate command: run the agent on a concept and print the transcript.

use crate::agent::{Agent, ToolContext};
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::error::ScenecastError;
use crate::llm::OpenAIChatModel;
use crate::render::Renderer;
use crate::script::ScriptGenerator;
use crate::search::DuckDuckGoSearch;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Run the agent until it stops calling tools, then print every message.
pub async fn run_generate(concept: &str, recursion_limit: usize, settings: Settings) -> Result<()> {
    // Missing tools are reported, not fatal: the agent sees the render error too
    for problem in preflight::check(&settings.render) {
        Output::warning(&problem.to_string());
    }

    if settings.llm.api_key().is_none() {
        Output::warning(&format!(
            "{} is not set; requests may be rejected",
            settings.llm.api_key_env
        ));
    }

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;

    let agent_model = Arc::new(OpenAIChatModel::from_settings(&settings.llm, None)?);
    let script_model = Arc::new(OpenAIChatModel::from_settings(
        &settings.llm,
        Some(settings.generator_model()),
    )?);

    let renderer = Arc::new(Renderer::from_settings(&settings.render, settings.work_dir()));
    let output_dir = renderer.work_dir().to_path_buf();

    let tools = ToolContext::new(
        Arc::new(ScriptGenerator::new(script_model, prompts.clone())),
        renderer,
        Arc::new(DuckDuckGoSearch::from_settings(&settings.search)?),
    );

    let agent = Agent::new(agent_model, tools, prompts);

    info!(concept, recursion_limit, "Starting run");
    Output::info(&format!("Concept: {}", concept));

    let spinner = Output::spinner("Agent working...");
    let result = agent.run(concept, recursion_limit).await;
    spinner.finish_and_clear();

    match result {
        Ok(messages) => {
            Output::transcript(&messages);
            println!();
            Output::success(&format!(
                "Done in {} message(s). Output directory: {}",
                messages.len(),
                output_dir.display()
            ));
            Ok(())
        }
        Err(e @ ScenecastError::RecursionLimit { .. }) => {
            Output::error(&e.to_string());
            Output::info("Raise it with --recursion-limit or agent.recursion_limit.");
            Err(e.into())
        }
        Err(e) => {
            Output::error(&format!("Agent failed: {}", e.chain()));
            Err(e.into())
        }
    }
}
