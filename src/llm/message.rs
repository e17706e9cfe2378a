//! Conversation messages exchanged with the chat model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured request from the model to run a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Identifier echoed back in the matching tool message.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// JSON arguments. A non-object value means the model sent malformed arguments.
    pub arguments: Value,
}

/// A single message in a run's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    Human {
        content: String,
    },
    Ai {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolInvocation>,
    },
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    /// An assistant message without tool calls.
    pub fn ai(content: impl Into<String>) -> Self {
        Message::Ai {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::Tool {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    /// Text content of the message.
    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::Human { content }
            | Message::Ai { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }

    /// Tool calls requested by this message. Empty for anything but `Ai`.
    pub fn tool_calls(&self) -> &[ToolInvocation] {
        match self {
            Message::Ai { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Short type label used when printing transcripts.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::System { .. } => "SystemMessage",
            Message::Human { .. } => "HumanMessage",
            Message::Ai { .. } => "AIMessage",
            Message::Tool { .. } => "ToolMessage",
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Message::System { .. })
    }
}

/// A model reply before it is appended to the transcript.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiReply {
    pub content: String,
    pub tool_calls: Vec<ToolInvocation>,
}

impl AiReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_call(mut self, invocation: ToolInvocation) -> Self {
        self.tool_calls.push(invocation);
        self
    }
}

impl From<AiReply> for Message {
    fn from(reply: AiReply) -> Self {
        Message::Ai {
            content: reply.content,
            tool_calls: reply.tool_calls,
        }
    }
}

/// A tool the model may call, described with a JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}
