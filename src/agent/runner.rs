//! Agent runner with tool calling loop.

use super::recovery::parse_embedded_call;
use super::sense::failed_tool_result;
use super::tools::{parse_tool_call, tool_definitions, ToolContext};
use crate::config::Prompts;
use crate::error::{Result, ScenecastError};
use crate::llm::{ChatModel, Message, ToolInvocation, ToolSpec};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Loop states. Each visit counts as one step against the recursion limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitModel,
    DispatchTool,
    SenseError,
}

/// Agent that turns a concept into a video by calling tools.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: ToolContext,
    prompts: Prompts,
    definitions: Vec<ToolSpec>,
}

impl Agent {
    /// Create a new agent with the given model, tool context and prompts.
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolContext, prompts: Prompts) -> Self {
        Self {
            model,
            tools,
            prompts,
            definitions: tool_definitions(),
        }
    }

    /// Run the agent from a human prompt until the model stops calling tools.
    ///
    /// Returns the whole transcript. Fails with
    /// [`ScenecastError::RecursionLimit`] if more than `recursion_limit`
    /// steps would be needed.
    #[instrument(skip(self, initial_prompt), fields(model = %self.model.model()))]
    pub async fn run(&self, initial_prompt: &str, recursion_limit: usize) -> Result<Vec<Message>> {
        let mut messages = vec![Message::human(initial_prompt)];
        let mut state = State::AwaitModel;
        let mut steps = 0;

        loop {
            steps += 1;
            if steps > recursion_limit {
                warn!("Recursion limit of {} reached", recursion_limit);
                return Err(ScenecastError::RecursionLimit {
                    limit: recursion_limit,
                });
            }

            debug!("Step {}: {:?}", steps, state);

            state = match state {
                State::AwaitModel => {
                    self.await_model(&mut messages).await?;
                    let wants_tools = messages
                        .last()
                        .is_some_and(|m| !m.tool_calls().is_empty());
                    if !wants_tools {
                        info!("Agent finished after {} steps", steps);
                        return Ok(messages);
                    }
                    State::DispatchTool
                }
                State::DispatchTool => {
                    self.dispatch_tools(&mut messages).await;
                    State::SenseError
                }
                State::SenseError => {
                    self.sense_error(&mut messages);
                    State::AwaitModel
                }
            };
        }
    }

    async fn await_model(&self, messages: &mut Vec<Message>) -> Result<()> {
        if !messages.iter().any(Message::is_system) {
            messages.insert(0, Message::system(self.prompts.agent.system.clone()));
        }

        let mut reply = self.model.invoke(messages.as_slice(), &self.definitions).await?;

        if reply.tool_calls.is_empty() && !reply.content.is_empty() {
            if let Some(call) = parse_embedded_call(&reply.content) {
                info!("Recovered tool call {} from message content", call.name);
                reply.tool_calls.push(call);
                reply.content.clear();
            }
        }

        messages.push(reply.into());
        Ok(())
    }

    /// Run each requested tool in order, appending one tool message per call.
    async fn dispatch_tools(&self, messages: &mut Vec<Message>) {
        let calls = messages
            .last()
            .map(|m| m.tool_calls().to_vec())
            .unwrap_or_default();

        for call in &calls {
            let result = self.execute_tool_call(call).await;
            messages.push(Message::tool(&call.id, &call.name, result));
        }
    }

    async fn execute_tool_call(&self, call: &ToolInvocation) -> String {
        info!("Agent calling tool: {}", call.name);
        debug!("Tool arguments: {}", call.arguments);

        match parse_tool_call(&call.name, &call.arguments) {
            Ok(tool) => match self.tools.execute(&tool).await {
                Ok(output) => output,
                Err(e) => format!("Tool error: {}", e),
            },
            Err(e) => format!("Failed to parse tool call: {}", e),
        }
    }

    fn sense_error(&self, messages: &mut Vec<Message>) {
        let Some(details) = failed_tool_result(messages) else {
            return;
        };
        warn!("Tool reported a failure: {}", details);

        let mut vars = HashMap::new();
        vars.insert("details".to_string(), details.to_string());
        let retry = self.prompts.render_with_custom(&self.prompts.agent.retry, &vars);

        messages.push(Message::ai(retry));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::AiReply;
    use crate::render::Renderer;
    use crate::script::ScriptGenerator;
    use crate::testing::{FakeToolchain, ScriptedChatModel, StaticSearch};
    use serde_json::{json, Value};
    use std::path::Path;

    const LIMITE_CODE: &str = "from manim import *\n\nclass LimiteVisualization(Scene):\n    def construct(self):\n        # AUDIO: \"La limite d'une fonction.\"\n        self.wait(3)";

    fn call(id: &str, name: &str, arguments: Value) -> ToolInvocation {
        ToolInvocation {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }
    }

    fn agent(
        model: Arc<ScriptedChatModel>,
        script_reply: &str,
        toolchain: FakeToolchain,
        work_dir: &Path,
    ) -> Agent {
        let script_model = Arc::new(
            ScriptedChatModel::new(Vec::new()).with_fallback(AiReply::text(script_reply)),
        );
        let tools = ToolContext::new(
            Arc::new(ScriptGenerator::new(script_model, Prompts::default())),
            Arc::new(Renderer::new(Arc::new(toolchain), work_dir.to_path_buf())),
            Arc::new(StaticSearch {
                snippets: vec!["Use Text instead of Tex".to_string()],
            }),
        );
        Agent::new(model, tools, Prompts::default())
    }

    fn limite_reply() -> String {
        format!(
            "===CODE===\n```python\n{}\n```\n===NARRATION===\nLa limite d'une fonction.\n===CLASS_NAME===\nLimiteVisualization",
            LIMITE_CODE
        )
    }

    #[tokio::test]
    async fn test_final_answer_without_tools() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedChatModel::new(vec![AiReply::text("Bonjour !")]));
        let agent = agent(model.clone(), "", FakeToolchain::default(), dir.path());

        let transcript = agent.run("Salut", 50).await.unwrap();

        assert_eq!(transcript.len(), 3);
        assert!(transcript[0].is_system());
        assert_eq!(transcript[1], Message::human("Salut"));
        assert_eq!(transcript[2], Message::ai("Bonjour !"));
        assert!(model.requests()[0][0].is_system());
    }

    #[tokio::test]
    async fn test_limite_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedChatModel::new(vec![
            AiReply::default().with_tool_call(call(
                "call_1",
                "generate_manim_script",
                json!({"concept": "limite d'une fonction"}),
            )),
            AiReply::default().with_tool_call(call(
                "call_2",
                "execute_manim_with_audio",
                json!({"code": LIMITE_CODE, "math_scene": "LimiteVisualization"}),
            )),
            AiReply::text("La vidéo est prête."),
        ]));
        let agent = agent(model.clone(), &limite_reply(), FakeToolchain::default(), dir.path());

        let transcript = agent.run("limite d'une fonction", 50).await.unwrap();

        let script: Value = serde_json::from_str(transcript[3].content()).unwrap();
        assert_eq!(script["class_name"], "LimiteVisualization");
        assert_eq!(script["code"], LIMITE_CODE);

        let render: Value = serde_json::from_str(transcript[5].content()).unwrap();
        assert_eq!(render["success"], true);
        let video = render["video_path"].as_str().unwrap();
        assert!(Path::new(video).exists());

        assert_eq!(transcript.last().unwrap(), &Message::ai("La vidéo est prête."));
        assert!(!transcript
            .iter()
            .any(|m| m.content().contains("REPRENDRE LE PROCESSUS")));
        assert_eq!(model.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_render_injects_retry_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedChatModel::new(vec![
            AiReply::default().with_tool_call(call(
                "call_1",
                "execute_manim_with_audio",
                json!({"code": "class Broken(Scene:", "math_scene": "Broken"}),
            )),
            AiReply::text("Échec."),
        ]));
        let toolchain = FakeToolchain {
            render_stderr: Some("SyntaxError: invalid syntax".to_string()),
            ..FakeToolchain::default()
        };
        let agent = agent(model.clone(), "", toolchain, dir.path());

        let transcript = agent.run("vecteurs", 50).await.unwrap();

        let render: Value = serde_json::from_str(transcript[3].content()).unwrap();
        assert_eq!(render["success"], false);
        assert_eq!(render["video_path"], Value::Null);
        assert!(render["message"].as_str().unwrap().contains("Erreur Manim:"));

        match &transcript[4] {
            Message::Ai {
                content,
                tool_calls,
            } => {
                assert!(content.contains("REPRENDRE LE PROCESSUS"));
                assert!(content.contains("SyntaxError"));
                assert!(tool_calls.is_empty());
            }
            other => panic!("Expected retry instruction, got {:?}", other),
        }

        // The model sees the retry instruction on its next turn.
        let second = &model.requests()[1];
        assert!(second.last().unwrap().content().contains("REPRENDRE"));
    }

    #[tokio::test]
    async fn test_sentinel_script_is_sensed() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedChatModel::new(vec![
            AiReply::default().with_tool_call(call(
                "call_1",
                "generate_manim_script",
                json!({"concept": "?"}),
            )),
            AiReply::text("Abandon."),
        ]));
        let agent = agent(model, "Je ne sais pas.", FakeToolchain::default(), dir.path());

        let transcript = agent.run("?", 50).await.unwrap();

        assert!(transcript[3].content().contains("ErrorScene"));
        assert!(transcript[4].content().contains("REPRENDRE LE PROCESSUS"));
    }

    #[tokio::test]
    async fn test_recursion_limit_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedChatModel::new(Vec::new()).with_fallback(
            AiReply::default().with_tool_call(call(
                "call_loop",
                "search_solution",
                json!({"query": "manim"}),
            )),
        ));
        let agent = agent(model.clone(), "", FakeToolchain::default(), dir.path());

        let err = agent.run("boucle", 10).await.unwrap_err();

        assert!(matches!(err, ScenecastError::RecursionLimit { limit: 10 }));
        // Steps 1, 4, 7 and 10 are model turns.
        assert_eq!(model.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_finishes_exactly_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedChatModel::new(vec![
            AiReply::default().with_tool_call(call(
                "call_1",
                "search_solution",
                json!({"query": "manim"}),
            )),
            AiReply::text("Fini."),
        ]));
        let agent = agent(model, "", FakeToolchain::default(), dir.path());

        // One tool round (3 steps) plus the final model turn.
        assert!(agent.run("recherche", 4).await.is_ok());
    }

    #[tokio::test]
    async fn test_embedded_call_is_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedChatModel::new(vec![
            AiReply::text(
                r#"Je cherche : {"name": "search_solution", "parameters": {"query": "MathTex"}}"#,
            ),
            AiReply::text("Trouvé."),
        ]));
        let agent = agent(model, "", FakeToolchain::default(), dir.path());

        let transcript = agent.run("erreur MathTex", 50).await.unwrap();

        match &transcript[2] {
            Message::Ai {
                content,
                tool_calls,
            } => {
                assert!(content.is_empty());
                assert_eq!(tool_calls[0].name, "search_solution");
            }
            other => panic!("Expected recovered tool call, got {:?}", other),
        }
        match &transcript[3] {
            Message::Tool {
                tool_call_id,
                content,
                ..
            } => {
                assert_eq!(tool_call_id, transcript[2].tool_calls()[0].id.as_str());
                assert!(content.contains("Use Text instead of Tex"));
            }
            other => panic!("Expected tool message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multiple_calls_dispatched_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedChatModel::new(vec![
            AiReply::default()
                .with_tool_call(call("call_a", "search_solution", json!({"query": "a"})))
                .with_tool_call(call("call_b", "unknown_tool", json!({})))
                .with_tool_call(call("call_c", "search_solution", json!({"query": "c"}))),
            AiReply::text("Ok."),
        ]));
        let agent = agent(model, "", FakeToolchain::default(), dir.path());

        let transcript = agent.run("plusieurs", 50).await.unwrap();

        let tool_ids: Vec<_> = transcript
            .iter()
            .filter_map(|m| match m {
                Message::Tool { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(tool_ids, vec!["call_a", "call_b", "call_c"]);
        assert!(transcript[4].content().starts_with("Failed to parse tool call"));
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedChatModel::new(Vec::new()));
        let agent = agent(model, "", FakeToolchain::default(), dir.path());

        let err = agent.run("x", 50).await.unwrap_err();
        assert!(matches!(err, ScenecastError::Llm(_)));
    }
}
