//! Tool-calling conversation loop.
//!
//! The agent alternates between the model and the tools it asks for, and
//! injects a restart instruction whenever a tool reports a failure.

mod recovery;
mod runner;
mod sense;
mod tools;

pub use recovery::parse_embedded_call;
pub use runner::Agent;
pub use sense::{failed_tool_result, is_failure};
pub use tools::{parse_tool_call, tool_definitions, ToolCall, ToolContext};
