//! CLI output formatting utilities.

use crate::llm::Message;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Characters of message content shown in a transcript.
const TRANSCRIPT_PREVIEW_CHARS: usize = 500;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print every message of a run.
    pub fn transcript(messages: &[Message]) {
        for message in messages {
            print!("{}", format_message(message));
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// One transcript entry: separator, type, content preview and tool names.
fn format_message(message: &Message) -> String {
    let mut out = format!("\n{}\n", "=".repeat(50));
    out.push_str(&format!("Type: {}\n", message.kind()));

    let content = message.content();
    if !content.is_empty() {
        out.push_str(&format!("Content: {}\n", content_preview(content, TRANSCRIPT_PREVIEW_CHARS)));
    }

    let calls = message.tool_calls();
    if !calls.is_empty() {
        let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
        out.push_str(&format!("Tool calls: {:?}\n", names));
    }
    out
}

/// Truncate content with ellipsis, counting characters.
fn content_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        format!("{}...", content.chars().take(max_chars).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{AiReply, ToolInvocation};

    #[test]
    fn test_format_ai_message_with_tool_calls() {
        let message: Message = AiReply::default()
            .with_tool_call(ToolInvocation {
                id: "call_1".to_string(),
                name: "generate_manim_script".to_string(),
                arguments: serde_json::json!({"concept": "limite"}),
            })
            .into();

        let text = format_message(&message);
        assert!(text.contains("Type: AIMessage"));
        assert!(!text.contains("Content:"));
        assert!(text.contains(r#"Tool calls: ["generate_manim_script"]"#));
    }

    #[test]
    fn test_content_preview_truncates() {
        let long = "à".repeat(600);
        let preview = content_preview(&long, 500);
        assert_eq!(preview.chars().count(), 503);
        assert!(preview.ends_with("..."));
        assert_eq!(content_preview("court", 500), "court");
    }
}
