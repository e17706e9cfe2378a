//! Configuration module for scenecast.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, GeneratorPrompts, Prompts};
pub use settings::{
    AgentSettings, GeneralSettings, GeneratorSettings, LlmSettings, OutputNaming,
    PromptSettings, RenderSettings, SearchSettings, Settings,
};
