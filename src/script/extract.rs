//! Scraping a script out of a free-form model reply.
//!
//! Extraction runs strict marker sections first, then fenced code blocks and
//! class declarations, and finally returns the error sentinel.

use super::ScriptResult;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static CODE_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)===CODE===\s*(.*?)\s*===(?:NARRATION|CLASS_NAME)===").expect("Invalid regex")
});

static NARRATION_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)===NARRATION===\s*(.*?)\s*(?:===CLASS_NAME===|\z)").expect("Invalid regex")
});

static CLASS_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"===CLASS_NAME===\s*[`\[*"']*(\w+)"#).expect("Invalid regex")
});

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:python|py)?[ \t]*\r?\n?(.*?)\s*```").expect("Invalid regex")
});

static CLASS_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bclass\s+(\w+)\s*\(").expect("Invalid regex"));

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```(?:python|py)?\s*").expect("Invalid regex"));

static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```$").expect("Invalid regex"));

/// Extract code, narration and entry point from a model reply.
///
/// Never fails: an unrecoverable reply yields [`ScriptResult::error`].
pub fn extract_script(reply: &str) -> ScriptResult {
    let narration = first_capture(&NARRATION_SECTION, reply).unwrap_or_default();

    // Markers, with per-field fallback to the first fenced block and its class line.
    let code = first_capture(&CODE_SECTION, reply).or_else(|| first_capture(&FENCED_BLOCK, reply));
    let class_name = first_capture(&CLASS_SECTION, reply)
        .or_else(|| code.as_deref().and_then(|c| first_capture(&CLASS_DECL, c)));

    if let (Some(code), Some(class_name)) = (code, class_name) {
        debug!("Extracted script from delimited sections");
        return finish(strip_fences(&code), class_name, narration);
    }

    // Any fenced block and any class declaration anywhere in the reply.
    let code = first_capture(&FENCED_BLOCK, reply);
    let class_name = first_capture(&CLASS_DECL, reply);

    if let (Some(code), Some(class_name)) = (code, class_name) {
        debug!("Extracted script with loose fallback, class {}", class_name);
        return finish(strip_fences(&code), class_name, narration);
    }

    warn!("No script could be recovered from the model reply");
    ScriptResult::error(reply)
}

/// Names of all classes declared in `code`, in order.
pub fn declared_classes(code: &str) -> Vec<String> {
    CLASS_DECL
        .captures_iter(code)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn finish(code: String, class_name: String, narration: String) -> ScriptResult {
    let declared = declared_classes(&code);
    let class_name = if declared.is_empty() || declared.contains(&class_name) {
        class_name
    } else {
        warn!(
            "Class {} is not declared in the script, using {}",
            class_name, declared[0]
        );
        declared[0].clone()
    };

    ScriptResult {
        code,
        class_name,
        narration,
    }
}

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn strip_fences(code: &str) -> String {
    let code = LEADING_FENCE.replace(code.trim(), "");
    TRAILING_FENCE.replace(&code, "").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{ERROR_MARKER, ERROR_SCENE};

    const LIMITE_CODE: &str = r#"from manim import *

class LimiteVisualization(Scene):
    def construct(self):
        # === SEGMENT 1 ===
        # AUDIO: "Bienvenue dans cette explication sur les limites."
        title = Text("Limite", font_size=48)
        self.play(Write(title))
        self.wait(4)"#;

    #[test]
    fn test_strict_sections() {
        let reply = format!(
            "Voici le script.\n===CODE===\n```python\n{}\n```\n===NARRATION===\nBienvenue.\nLa limite.\n===CLASS_NAME===\nLimiteVisualization\n",
            LIMITE_CODE
        );

        let result = extract_script(&reply);
        assert_eq!(result.code, LIMITE_CODE);
        assert_eq!(result.class_name, "LimiteVisualization");
        assert_eq!(result.narration, "Bienvenue.\nLa limite.");
        assert!(!result.is_error());
    }

    #[test]
    fn test_sections_without_narration() {
        let reply = format!("===CODE===\n{}\n===CLASS_NAME===\nLimiteVisualization", LIMITE_CODE);

        let result = extract_script(&reply);
        assert_eq!(result.code, LIMITE_CODE);
        assert_eq!(result.class_name, "LimiteVisualization");
        assert_eq!(result.narration, "");
    }

    #[test]
    fn test_fenced_block_fallback_derives_class() {
        let reply = format!("Bien sûr !\n\n```python\n{}\n```\n\nBon rendu.", LIMITE_CODE);

        let result = extract_script(&reply);
        assert_eq!(result.code, LIMITE_CODE);
        assert_eq!(result.class_name, "LimiteVisualization");
    }

    #[test]
    fn test_loose_fallback_finds_class_outside_block() {
        let reply = "La scène s'appelle class VecteurUnitaire(Scene) :\n```\nself.play(Create(Arrow()))\n```";

        let result = extract_script(reply);
        assert_eq!(result.code, "self.play(Create(Arrow()))");
        assert_eq!(result.class_name, "VecteurUnitaire");
    }

    #[test]
    fn test_unrecoverable_reply_is_sentinel() {
        let reply = "Désolé, je ne peux pas générer ce script.";

        let result = extract_script(reply);
        assert!(result.is_error());
        assert_eq!(result.class_name, ERROR_SCENE);
        assert!(result.code.starts_with(ERROR_MARKER));
        assert!(result.code.contains(reply));
    }

    #[test]
    fn test_marker_class_not_declared_uses_declared_class() {
        let reply = format!("===CODE===\n{}\n===CLASS_NAME===\nLimite", LIMITE_CODE);

        let result = extract_script(&reply);
        assert_eq!(result.class_name, "LimiteVisualization");
    }

    #[test]
    fn test_class_marker_tolerates_decoration() {
        let reply = format!("===CODE===\n{}\n===CLASS_NAME===\n`LimiteVisualization`", LIMITE_CODE);
        assert_eq!(extract_script(&reply).class_name, "LimiteVisualization");
    }

    #[test]
    fn test_declared_classes() {
        let code = "class A(Scene):\n    pass\n\nclass B(VoiceoverScene):\n    pass\n";
        assert_eq!(declared_classes(code), vec!["A", "B"]);
    }
}
