//! Tool definitions and dispatch for the agent.

use crate::error::{Result, ScenecastError};
use crate::llm::ToolSpec;
use crate::render::Renderer;
use crate::script::ScriptGenerator;
use crate::search::SearchProvider;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Available tools for the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    /// Generate a Manim script for a concept.
    GenerateManimScript { concept: String },

    /// Render a script with narration.
    ExecuteManimWithAudio {
        code: String,
        math_scene: String,
        #[serde(default)]
        narration: String,
    },

    /// Search the web for a fix.
    SearchSolution { query: String },
}

/// Services the tools run against.
pub struct ToolContext {
    pub generator: Arc<ScriptGenerator>,
    pub renderer: Arc<Renderer>,
    pub search: Arc<dyn SearchProvider>,
}

impl ToolContext {
    /// Create a new tool context.
    pub fn new(
        generator: Arc<ScriptGenerator>,
        renderer: Arc<Renderer>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        Self {
            generator,
            renderer,
            search,
        }
    }

    /// Execute a tool call and return the result as a JSON string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        let output = match tool {
            ToolCall::GenerateManimScript { concept } => {
                serde_json::to_value(self.generator.generate(concept).await)?
            }
            ToolCall::ExecuteManimWithAudio {
                code,
                math_scene,
                narration,
            } => serde_json::to_value(self.renderer.render(code, math_scene, narration).await)?,
            ToolCall::SearchSolution { query } => self.search.search(query).await?.to_tool_output(),
        };
        Ok(output.to_string())
    }
}

/// Tool definitions advertised to the model.
pub fn tool_definitions() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "generate_manim_script".to_string(),
            description: "ÉTAPE 1/2 - Génère un script Python Manim avec narration pour un concept. \
                Retourne code, narration et class_name."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "concept": {
                        "type": "string",
                        "description": "Le concept à expliquer"
                    }
                },
                "required": ["concept"]
            }),
        },
        ToolSpec {
            name: "execute_manim_with_audio".to_string(),
            description: "ÉTAPE 2/2 - Exécute le code Manim retourné par generate_manim_script \
                et ajoute la narration. Retourne success, video_path et message."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "Le code Python retourné"
                    },
                    "math_scene": {
                        "type": "string",
                        "description": "Le class_name retourné"
                    },
                    "narration": {
                        "type": "string",
                        "description": "La narration retournée (optionnelle)"
                    }
                },
                "required": ["code", "math_scene"]
            }),
        },
        ToolSpec {
            name: "search_solution".to_string(),
            description: "Effectue une recherche sur Internet pour trouver des solutions à des \
                erreurs techniques. Utilise cet outil quand l'exécution de Manim échoue."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "La recherche à effectuer"
                    }
                },
                "required": ["query"]
            }),
        },
    ]
}

/// Parse a tool call from its name and JSON arguments.
pub fn parse_tool_call(name: &str, args: &Value) -> Result<ToolCall> {
    if !args.is_object() {
        return Err(ScenecastError::Agent(format!("Invalid tool arguments: {}", args)));
    }

    match name {
        "generate_manim_script" => Ok(ToolCall::GenerateManimScript {
            concept: required_str(args, "concept")?,
        }),
        "execute_manim_with_audio" => {
            let code = required_str(args, "code")?;
            // Models sometimes echo the generator's field name.
            let math_scene = args["math_scene"]
                .as_str()
                .or_else(|| args["class_name"].as_str())
                .ok_or_else(|| ScenecastError::Agent("Missing 'math_scene' argument".to_string()))?
                .to_string();
            let narration = args["narration"].as_str().unwrap_or_default().to_string();
            Ok(ToolCall::ExecuteManimWithAudio {
                code,
                math_scene,
                narration,
            })
        }
        "search_solution" => Ok(ToolCall::SearchSolution {
            query: required_str(args, "query")?,
        }),
        _ => Err(ScenecastError::Agent(format!("Unknown tool: {}", name))),
    }
}

fn required_str(args: &Value, key: &str) -> Result<String> {
    args[key]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ScenecastError::Agent(format!("Missing '{}' argument", key)))
}
