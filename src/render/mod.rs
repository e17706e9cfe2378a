//! Rendering generated scripts into narrated videos.
//!
//! The renderer never returns an error: every failure, expected or not, is
//! folded into a [`RenderResult`] with `success: false` so the agent loop can
//! decide what to do next.

mod narration;
mod toolchain;
mod workspace;

pub use narration::{extract_cues, synthesize_narration, NarrationTrack};
pub use toolchain::{ExternalToolchain, MediaToolchain, ProcessOutput};
pub use workspace::{find_file, ScratchGuard};

use crate::config::{OutputNaming, RenderSettings};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use workspace::move_file;

/// Prefix of every failure message.
pub const RENDER_ERROR_PREFIX: &str = "Erreur Manim: ";

/// Maximum number of characters of diagnostics kept in a failure message.
const MAX_DIAGNOSTIC_CHARS: usize = 500;

/// File the script is written to inside the working directory.
const SCRIPT_FILE: &str = "scene.py";

/// Outcome of a render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderResult {
    pub success: bool,
    pub video_path: Option<PathBuf>,
    pub message: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RenderResult {
    /// A successful render of `video_path`.
    pub fn success(video_path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            success: true,
            video_path: Some(video_path),
            message: message.into(),
            metadata: Map::new(),
        }
    }

    /// A failure whose message starts with [`RENDER_ERROR_PREFIX`].
    pub fn failure(detail: &str) -> Self {
        Self {
            success: false,
            video_path: None,
            message: format!("{}{}", RENDER_ERROR_PREFIX, truncate_chars(detail, MAX_DIAGNOSTIC_CHARS)),
            metadata: Map::new(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Renders scripts through a [`MediaToolchain`] inside a reused working directory.
///
/// The working directory is not locked; one render at a time.
pub struct Renderer {
    toolchain: Arc<dyn MediaToolchain>,
    work_dir: PathBuf,
    output_naming: OutputNaming,
}

impl Renderer {
    /// Create a renderer working in `work_dir`.
    ///
    /// A relative `work_dir` is resolved against the current directory: the
    /// render command runs from inside it and receives paths below it.
    pub fn new(toolchain: Arc<dyn MediaToolchain>, work_dir: PathBuf) -> Self {
        let work_dir = std::path::absolute(&work_dir).unwrap_or(work_dir);
        Self {
            toolchain,
            work_dir,
            output_naming: OutputNaming::default(),
        }
    }

    /// Renderer using the installed binaries named in settings.
    pub fn from_settings(settings: &RenderSettings, work_dir: PathBuf) -> Self {
        Self::new(Arc::new(ExternalToolchain::from_settings(settings)), work_dir)
            .with_output_naming(settings.output_naming)
    }

    /// Set how the final video file is named.
    pub fn with_output_naming(mut self, naming: OutputNaming) -> Self {
        self.output_naming = naming;
        self
    }

    /// Absolute directory the script and videos are written to.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Render `code` with `entry_point` as the scene, narrated with `narration`.
    #[instrument(skip(self, code, narration), fields(scene = %entry_point))]
    pub async fn render(&self, code: &str, entry_point: &str, narration: &str) -> RenderResult {
        match self.try_render(code, entry_point, narration).await {
            Ok(result) => result,
            Err(e) => {
                error!("Render aborted: {}", e);
                RenderResult::failure(&e.to_string())
                    .with_metadata("scene", json!(entry_point))
                    .with_metadata("trace", json!(e.chain()))
            }
        }
    }

    async fn try_render(&self, code: &str, entry_point: &str, narration: &str) -> Result<RenderResult> {
        std::fs::create_dir_all(&self.work_dir)?;

        let media_dir = self.work_dir.join("media");
        let audio_dir = self.work_dir.join("audio");
        let _scratch = ScratchGuard::acquire(vec![media_dir.clone(), audio_dir.clone()]);

        let mut metadata = Map::new();
        metadata.insert("scene".to_string(), json!(entry_point));

        let cues = extract_cues(code, narration);
        let track = if cues.is_empty() {
            None
        } else {
            match synthesize_narration(self.toolchain.as_ref(), &cues, &audio_dir).await {
                Ok(track) => Some(track),
                Err(e) => {
                    warn!("Narration unavailable, rendering silent video: {}", e);
                    metadata.insert("narration_error".to_string(), json!(e.to_string()));
                    None
                }
            }
        };
        metadata.insert(
            "segments".to_string(),
            json!(track.as_ref().map_or(0, |t| t.segments)),
        );
        if let Some(track) = &track {
            metadata.insert("audio_duration".to_string(), json!(track.duration));
        }

        let script_path = self.work_dir.join(SCRIPT_FILE);
        std::fs::write(&script_path, code)?;
        info!("Script written to {:?}", script_path);

        let video_name = self.video_file_name(entry_point);
        let output = self
            .toolchain
            .render_scene(&script_path, entry_point, &video_name, &self.work_dir)
            .await?;

        if !output.success {
            warn!("Render command exited with an error");
            return Ok(merge(RenderResult::failure(&output.stderr), metadata));
        }

        let Some(rendered) = find_file(&media_dir, &video_name) else {
            return Ok(merge(
                RenderResult::failure(&format!("artifact not found ({})", video_name)),
                metadata,
            ));
        };

        let final_path = self.work_dir.join(&video_name);
        move_file(&rendered, &final_path)?;

        let mut message = "Vidéo générée avec succès".to_string();
        if let Some(track) = &track {
            let narrated = audio_dir.join(format!("narrated_{}", video_name));
            match self.toolchain.mux(&final_path, &track.path, &narrated).await {
                Ok(()) => move_file(&narrated, &final_path)?,
                Err(e) => {
                    warn!("Muxing failed, keeping silent video: {}", e);
                    metadata.insert("mux_error".to_string(), json!(e.to_string()));
                    message.push_str(" (sans narration)");
                }
            }
        }

        match self.toolchain.probe_duration(&final_path).await {
            Ok(duration) => {
                metadata.insert("video_duration".to_string(), json!(duration));
            }
            Err(e) => warn!("Could not probe video duration: {}", e),
        }

        info!("Video ready at {:?}", final_path);
        Ok(merge(RenderResult::success(final_path, message), metadata))
    }

    fn video_file_name(&self, entry_point: &str) -> String {
        match self.output_naming {
            OutputNaming::Timestamped => format!(
                "{}_{}.mp4",
                entry_point,
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            ),
            OutputNaming::Fixed => "video.mp4".to_string(),
        }
    }
}

fn merge(mut result: RenderResult, metadata: Map<String, Value>) -> RenderResult {
    for (key, value) in metadata {
        result.metadata.entry(key).or_insert(value);
    }
    result
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeToolchain;

    const CODE: &str = r#"from manim import *

class LimiteVisualization(Scene):
    def construct(self):
        # AUDIO: "La limite d'une fonction."
        self.wait(2)
        # AUDIO: "Elle tend vers une valeur."
        self.wait(2)
"#;

    fn renderer(toolchain: FakeToolchain, dir: &Path) -> Renderer {
        Renderer::new(Arc::new(toolchain), dir.to_path_buf())
    }

    #[tokio::test]
    async fn test_successful_render_with_narration() {
        let dir = tempfile::tempdir().unwrap();
        let result = renderer(FakeToolchain::default(), dir.path())
            .render(CODE, "LimiteVisualization", "")
            .await;

        assert!(result.success, "{}", result.message);
        let video = result.video_path.unwrap();
        assert!(video.exists());
        assert_eq!(video.parent().unwrap(), dir.path());
        assert!(video
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("LimiteVisualization_"));
        assert_eq!(std::fs::read(&video).unwrap(), b"muxed");
        assert_eq!(result.metadata["segments"], json!(2));
        assert_eq!(result.metadata["scene"], json!("LimiteVisualization"));
        assert!(result.metadata.contains_key("audio_duration"));

        assert_eq!(std::fs::read_to_string(dir.path().join("scene.py")).unwrap(), CODE);
        assert!(!dir.path().join("media").exists());
        assert!(!dir.path().join("audio").exists());
    }

    /// `path` spelled relative to the current directory.
    #[cfg(unix)]
    fn relative_to_cwd(path: &Path) -> PathBuf {
        let cwd = std::env::current_dir().unwrap().canonicalize().unwrap();
        let mut relative = PathBuf::new();
        for _ in cwd.components().skip(1) {
            relative.push("..");
        }
        relative.join(path.canonicalize().unwrap().strip_prefix("/").unwrap())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_relative_work_dir_renders() {
        let dir = tempfile::tempdir().unwrap();
        let work_dir = relative_to_cwd(dir.path()).join("scene");
        assert!(work_dir.is_relative());

        let renderer = Renderer::new(Arc::new(FakeToolchain::default()), work_dir);
        assert!(renderer.work_dir().is_absolute());

        let result = renderer.render(CODE, "LimiteVisualization", "").await;

        assert!(result.success, "{}", result.message);
        let video = result.video_path.unwrap();
        assert!(video.is_absolute());
        assert_eq!(std::fs::read(&video).unwrap(), b"muxed");
        assert!(dir.path().join("scene").join("scene.py").exists());
    }

    #[tokio::test]
    async fn test_render_command_failure_truncates_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let stderr = format!("SyntaxError: invalid syntax{}", "x".repeat(1000));
        let toolchain = FakeToolchain {
            render_stderr: Some(stderr.clone()),
            ..FakeToolchain::default()
        };

        let result = renderer(toolchain, dir.path())
            .render("class Broken(Scene:\n", "Broken", "")
            .await;

        assert!(!result.success);
        assert_eq!(result.video_path, None);
        assert!(result.message.starts_with("Erreur Manim:"));
        let expected: String = stderr.chars().take(500).collect();
        assert_eq!(result.message, format!("Erreur Manim: {}", expected));
        assert!(!dir.path().join("media").exists());
    }

    #[tokio::test]
    async fn test_missing_artifact_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = FakeToolchain {
            skip_artifact: true,
            ..FakeToolchain::default()
        };

        let result = renderer(toolchain, dir.path()).render(CODE, "LimiteVisualization", "").await;

        assert!(!result.success);
        assert!(result.message.contains("artifact not found"));
    }

    #[tokio::test]
    async fn test_mux_failure_keeps_silent_video() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = FakeToolchain {
            fail_mux: true,
            ..FakeToolchain::default()
        };

        let result = renderer(toolchain, dir.path())
            .with_output_naming(OutputNaming::Fixed)
            .render(CODE, "LimiteVisualization", "")
            .await;

        assert!(result.success);
        let video = result.video_path.unwrap();
        assert_eq!(video, dir.path().join("video.mp4"));
        assert_eq!(std::fs::read(&video).unwrap(), b"silent");
        assert!(result.metadata.contains_key("mux_error"));
    }

    #[tokio::test]
    async fn test_narration_failure_degrades_to_silent_render() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = FakeToolchain {
            fail_speech: true,
            ..FakeToolchain::default()
        };

        let result = renderer(toolchain, dir.path()).render(CODE, "LimiteVisualization", "").await;

        assert!(result.success);
        assert_eq!(result.metadata["segments"], json!(0));
        assert!(result.metadata.contains_key("narration_error"));
    }

    #[tokio::test]
    async fn test_unexpected_fault_is_captured_with_trace() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = FakeToolchain {
            missing_renderer: true,
            ..FakeToolchain::default()
        };

        let result = renderer(toolchain, dir.path()).render(CODE, "LimiteVisualization", "").await;

        assert!(!result.success);
        assert!(result.message.starts_with(RENDER_ERROR_PREFIX));
        assert!(result.message.contains("manim"));
        assert!(result.metadata["trace"].as_str().unwrap().contains("External tool not found"));
    }

    #[test]
    fn test_failure_truncates_by_characters() {
        let detail = "é".repeat(600);
        let result = RenderResult::failure(&detail);
        assert_eq!(result.message.chars().count(), RENDER_ERROR_PREFIX.chars().count() + 500);
    }
}
