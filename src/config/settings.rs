//! Configuration settings for scenecast.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub generator: GeneratorSettings,
    pub agent: AgentSettings,
    pub render: RenderSettings,
    pub search: SearchSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Working directory for the generated script and the final video.
    pub work_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            work_dir: "~/.scenecast/scene".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Chat model settings shared by the agent and the script generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of an OpenAI-compatible chat completions API.
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus-sampling threshold.
    pub top_p: f32,
    /// Maximum number of tokens in a completion.
    pub max_tokens: u32,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: "https://integrate.api.nvidia.com/v1".to_string(),
            api_key_env: "NVIDIA_API_KEY".to_string(),
            model: "meta/llama-3.3-70b-instruct".to_string(),
            temperature: 0.2,
            top_p: 0.7,
            max_tokens: 8192,
            timeout_secs: 300,
        }
    }
}

impl LlmSettings {
    /// Read the API key from the configured environment variable.
    ///
    /// A missing key is not an error here; the first request fails instead.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

/// Script generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Model used for script generation. Falls back to `llm.model`.
    pub model: Option<String>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            model: Some("meta/llama-3.1-70b-instruct".to_string()),
        }
    }
}

/// Conversation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum number of loop steps before the run is aborted.
    pub recursion_limit: usize,
    /// Concept used when none is given on the command line.
    pub default_prompt: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            recursion_limit: 50,
            default_prompt: "Explique le repere cartesien et la notion de vecteur unitaire"
                .to_string(),
        }
    }
}

/// How the final video file is named.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputNaming {
    /// `<scene>_<YYYYmmdd_HHMMSS>.mp4`
    #[default]
    Timestamped,
    /// `video.mp4`, overwritten on every run.
    Fixed,
}

impl std::fmt::Display for OutputNaming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputNaming::Timestamped => write!(f, "timestamped"),
            OutputNaming::Fixed => write!(f, "fixed"),
        }
    }
}

/// Rendering and media tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Manim executable.
    pub manim: String,
    /// Manim quality letter (l, m, h, p, k).
    pub quality: String,
    /// ffmpeg executable.
    pub ffmpeg: String,
    /// ffprobe executable.
    pub ffprobe: String,
    /// Text-to-speech executable (gTTS command-line interface).
    pub tts: String,
    /// Narration language.
    pub language: String,
    /// Final video naming scheme.
    pub output_naming: OutputNaming,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            manim: "manim".to_string(),
            quality: "m".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            tts: "gtts-cli".to_string(),
            language: "fr".to_string(),
            output_naming: OutputNaming::Timestamped,
        }
    }
}

/// Web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// DuckDuckGo Instant Answer endpoint.
    pub endpoint: String,
    /// Maximum number of snippets returned to the model.
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.duckduckgo.com/".to_string(),
            max_results: 5,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ScenecastError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scenecast")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded working directory path.
    pub fn work_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.work_dir)
    }

    /// Model used by the script generator.
    pub fn generator_model(&self) -> &str {
        self.generator
            .model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.llm.model)
    }
}
