//! Manim script generation.
//!
//! Asks the chat model for a scene script and scrapes the reply into a
//! [`ScriptResult`]. Failures come back as a sentinel result rather than an
//! error so the agent loop can react to them like any other tool output.

mod extract;

pub use extract::{declared_classes, extract_script};

use crate::config::Prompts;
use crate::llm::{ChatModel, Message};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Prefix of the code field in a failed [`ScriptResult`].
pub const ERROR_MARKER: &str = "# Erreur";

/// Entry point of a failed [`ScriptResult`].
pub const ERROR_SCENE: &str = "ErrorScene";

/// A generated scene script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptResult {
    /// Python source of the scene.
    pub code: String,
    /// Narration text, one cue per line. May be empty.
    #[serde(default)]
    pub narration: String,
    /// Scene class to render.
    pub class_name: String,
}

impl ScriptResult {
    /// The sentinel returned when no script could be produced.
    pub fn error(detail: &str) -> Self {
        Self {
            code: format!("{}\n{}", ERROR_MARKER, detail),
            narration: String::new(),
            class_name: ERROR_SCENE.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.code.trim_start().starts_with(ERROR_MARKER)
    }
}

/// Generates Manim scripts from a concept.
pub struct ScriptGenerator {
    model: Arc<dyn ChatModel>,
    prompts: Prompts,
}

impl ScriptGenerator {
    /// Create a generator that asks `model` using the generator prompts.
    pub fn new(model: Arc<dyn ChatModel>, prompts: Prompts) -> Self {
        Self { model, prompts }
    }

    /// Generate a script for `concept`.
    ///
    /// A transport error from the model is reported through the sentinel too.
    #[instrument(skip(self), fields(model = %self.model.model()))]
    pub async fn generate(&self, concept: &str) -> ScriptResult {
        let mut vars = HashMap::new();
        vars.insert("concept".to_string(), concept.to_string());

        let messages = vec![
            Message::system(self.prompts.generator.system.clone()),
            Message::human(
                self.prompts
                    .render_with_custom(&self.prompts.generator.user, &vars),
            ),
        ];

        let reply = match self.model.invoke(&messages, &[]).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Script generation request failed: {}", e);
                return ScriptResult::error(&e.to_string());
            }
        };

        let result = extract_script(&reply.content);
        if !result.is_error() {
            info!("Generated scene {}", result.class_name);
        }
        result
    }
}
