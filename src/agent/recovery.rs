//! Recovery of tool calls written as plain text.
//!
//! Some backends answer with `{"name": ..., "parameters": {...}}` in the
//! message body instead of a native tool call.

use crate::llm::ToolInvocation;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Find the first JSON object in `text` that looks like a tool call.
///
/// Surrounding prose is ignored. Returns `None` when nothing parses. JSON
/// quoted as an example is not told apart from a real call.
pub fn parse_embedded_call(text: &str) -> Option<ToolInvocation> {
    text.match_indices('{').find_map(|(start, _)| {
        let value = serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Value>()
            .next()?
            .ok()?;
        as_invocation(&value)
    })
}

fn as_invocation(value: &Value) -> Option<ToolInvocation> {
    let object = value.as_object()?;
    let name = object.get("name")?.as_str()?;
    let parameters = object.get("parameters")?;
    if !parameters.is_object() || name.is_empty() {
        return None;
    }

    let mut hasher = DefaultHasher::new();
    value.to_string().hash(&mut hasher);

    Some(ToolInvocation {
        id: format!("call_{:016x}", hasher.finish()),
        name: name.to_string(),
        arguments: parameters.clone(),
    })
}
