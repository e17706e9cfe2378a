//! Detecting failed tool results.

use crate::llm::Message;
use crate::script::ERROR_MARKER;
use serde_json::Value;

/// Whether a tool message's content reports a failure.
///
/// Only JSON objects are inspected: `success: false`, or a `code` field
/// starting with the script error marker. Any code string with that prefix
/// counts, even if the script was otherwise fine.
pub fn is_failure(content: &str) -> bool {
    let Ok(Value::Object(data)) = serde_json::from_str::<Value>(content) else {
        return false;
    };

    if data.get("success") == Some(&Value::Bool(false)) {
        return true;
    }

    match data.get("code") {
        Some(Value::String(code)) => code.trim().starts_with(ERROR_MARKER),
        Some(other) if !other.is_null() => other.to_string().trim().starts_with(ERROR_MARKER),
        _ => false,
    }
}

/// Content of the last message when it is a failed tool result.
pub fn failed_tool_result(messages: &[Message]) -> Option<&str> {
    match messages.last()? {
        Message::Tool { content, .. } if is_failure(content) => Some(content),
        _ => None,
    }
}
