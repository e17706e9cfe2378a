//! Chat model abstraction.
//!
//! The agent loop and the script generator talk to the model through
//! [`ChatModel`], so the provider client is constructed once and passed in.

mod message;
mod openai;

pub use message::{AiReply, Message, ToolInvocation, ToolSpec};
pub use openai::{ModelOptions, OpenAIChatModel};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for chat completion backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the full history and return the model's reply.
    ///
    /// `tools` may be empty, in which case no tool definitions are sent.
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<AiReply>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
