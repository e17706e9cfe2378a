//! Chat model backed by an OpenAI-compatible chat completions API.

use super::message::{AiReply, Message, ToolInvocation, ToolSpec};
use super::ChatModel;
use crate::config::LlmSettings;
use crate::error::{Result, ScenecastError};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall,
    FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

/// Sampling options fixed when the model handle is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl ModelOptions {
    /// Options from settings, optionally overriding the model identifier.
    pub fn from_settings(settings: &LlmSettings, model: Option<&str>) -> Self {
        Self {
            model: model.unwrap_or(&settings.model).to_string(),
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_tokens: settings.max_tokens,
        }
    }
}

/// Chat model using `async-openai` against any compatible endpoint.
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    options: ModelOptions,
}

impl OpenAIChatModel {
    /// Create a model handle from an existing client.
    pub fn new(client: Client<OpenAIConfig>, options: ModelOptions) -> Self {
        Self { client, options }
    }

    /// Build the client and options from settings.
    pub fn from_settings(settings: &LlmSettings, model: Option<&str>) -> Result<Self> {
        Ok(Self::new(
            create_client(settings)?,
            ModelOptions::from_settings(settings, model),
        ))
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip_all, fields(model = %self.options.model, messages = messages.len()))]
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<AiReply> {
        let request_messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.options.model)
            .messages(request_messages)
            .temperature(self.options.temperature)
            .top_p(self.options.top_p)
            .max_completion_tokens(self.options.max_tokens);

        if !tools.is_empty() {
            builder.tools(tools.iter().map(to_tool_definition).collect::<Vec<_>>());
        }

        let request = builder
            .build()
            .map_err(|e| ScenecastError::Llm(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ScenecastError::Llm(format!("Chat completion failed: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ScenecastError::Llm("No response from model".to_string()))?;

        let tool_calls: Vec<ToolInvocation> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .iter()
            .map(to_invocation)
            .collect();

        debug!("Model replied with {} tool call(s)", tool_calls.len());

        Ok(AiReply {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }

    fn model(&self) -> &str {
        &self.options.model
    }
}

/// Convert a transcript message into the request format.
fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let built: ChatCompletionRequestMessage = match message {
        Message::System { content } => ChatCompletionRequestSystemMessageArgs::default()
            .content(content.clone())
            .build()
            .map_err(|e| ScenecastError::Llm(e.to_string()))?
            .into(),
        Message::Human { content } => ChatCompletionRequestUserMessageArgs::default()
            .content(content.clone())
            .build()
            .map_err(|e| ScenecastError::Llm(e.to_string()))?
            .into(),
        Message::Ai {
            content,
            tool_calls,
        } => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if !content.is_empty() {
                args.content(content.clone());
            }
            if !tool_calls.is_empty() {
                args.tool_calls(tool_calls.iter().map(to_message_tool_call).collect::<Vec<_>>());
            }
            args.build()
                .map_err(|e| ScenecastError::Llm(e.to_string()))?
                .into()
        }
        Message::Tool {
            tool_call_id,
            content,
            ..
        } => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(tool_call_id.clone())
            .content(content.clone())
            .build()
            .map_err(|e| ScenecastError::Llm(e.to_string()))?
            .into(),
    };
    Ok(built)
}

fn to_message_tool_call(invocation: &ToolInvocation) -> ChatCompletionMessageToolCall {
    let arguments = match &invocation.arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    };
    ChatCompletionMessageToolCall {
        id: invocation.id.clone(),
        r#type: ChatCompletionToolType::Function,
        function: FunctionCall {
            name: invocation.name.clone(),
            arguments,
        },
    }
}

/// Keep malformed argument strings as `Value::String` so dispatch can report them.
fn to_invocation(call: &ChatCompletionMessageToolCall) -> ToolInvocation {
    let arguments = serde_json::from_str(&call.function.arguments)
        .unwrap_or_else(|_| Value::String(call.function.arguments.clone()));
    ToolInvocation {
        id: call.id.clone(),
        name: call.function.name.clone(),
        arguments,
    }
}

fn to_tool_definition(spec: &ToolSpec) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: spec.name.clone(),
            description: Some(spec.description.clone()),
            parameters: Some(spec.parameters.clone()),
            strict: None,
        },
    }
}
