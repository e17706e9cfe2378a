//! External media tools: manim, ffmpeg, ffprobe and a text-to-speech command.

use crate::config::RenderSettings;
use crate::error::{Result, ScenecastError};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Exit status and diagnostics of a finished process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutput {
    pub success: bool,
    pub stderr: String,
}

/// Trait for the external programs the renderer drives.
#[async_trait]
pub trait MediaToolchain: Send + Sync {
    /// Render `scene` from `script` into a file named `output_name`,
    /// with intermediate files under `<work_dir>/media`.
    ///
    /// A non-zero exit is returned as `ProcessOutput { success: false, .. }`.
    async fn render_scene(
        &self,
        script: &Path,
        scene: &str,
        output_name: &str,
        work_dir: &Path,
    ) -> Result<ProcessOutput>;

    /// Synthesize `text` into an audio file at `dest`.
    async fn synthesize_speech(&self, text: &str, dest: &Path) -> Result<()>;

    /// Duration of a media file in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Concatenate the files listed in an ffmpeg concat list into `dest`.
    async fn concat_audio(&self, list_file: &Path, dest: &Path) -> Result<()>;

    /// Combine a silent video and an audio track into `dest`.
    async fn mux(&self, video: &Path, audio: &Path, dest: &Path) -> Result<()>;
}

/// Toolchain that shells out to installed binaries.
#[derive(Debug, Clone)]
pub struct ExternalToolchain {
    manim: String,
    quality: String,
    ffmpeg: String,
    ffprobe: String,
    tts: String,
    language: String,
}

impl ExternalToolchain {
    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self {
            manim: settings.manim.clone(),
            quality: settings.quality.clone(),
            ffmpeg: settings.ffmpeg.clone(),
            ffprobe: settings.ffprobe.clone(),
            tts: settings.tts.clone(),
            language: settings.language.clone(),
        }
    }
}

#[async_trait]
impl MediaToolchain for ExternalToolchain {
    async fn render_scene(
        &self,
        script: &Path,
        scene: &str,
        output_name: &str,
        work_dir: &Path,
    ) -> Result<ProcessOutput> {
        debug!("Running {} on {:?} for scene {}", self.manim, script, scene);

        let result = Command::new(&self.manim)
            .arg(format!("-q{}", self.quality))
            .arg("--media_dir").arg(work_dir.join("media"))
            .arg("-o").arg(output_name)
            .arg(script)
            .arg(scene)
            .current_dir(work_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScenecastError::ToolNotFound(self.manim.clone()));
            }
            Err(e) => {
                return Err(ScenecastError::Render(format!("{} execution failed: {e}", self.manim)));
            }
        };

        Ok(ProcessOutput {
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn synthesize_speech(&self, text: &str, dest: &Path) -> Result<()> {
        let result = Command::new(&self.tts)
            .arg("--lang").arg(&self.language)
            .arg("--output").arg(dest)
            .arg("--")
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        check_output(&self.tts, result)
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let result = Command::new(&self.ffprobe)
            .arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg(path)
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScenecastError::ToolNotFound(self.ffprobe.clone()));
            }
            Err(e) => {
                return Err(ScenecastError::ToolFailed(format!("ffprobe failed: {e}")));
            }
        };

        if !output.status.success() {
            return Err(ScenecastError::ToolFailed("ffprobe returned error".into()));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        parse_probe_duration(&json_str)
    }

    async fn concat_audio(&self, list_file: &Path, dest: &Path) -> Result<()> {
        let result = Command::new(&self.ffmpeg)
            .arg("-f").arg("concat")
            .arg("-safe").arg("0")
            .arg("-i").arg(list_file)
            .arg("-c").arg("copy")
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(dest)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        check_output(&self.ffmpeg, result)
    }

    async fn mux(&self, video: &Path, audio: &Path, dest: &Path) -> Result<()> {
        let result = Command::new(&self.ffmpeg)
            .arg("-i").arg(video)
            .arg("-i").arg(audio)
            .arg("-map").arg("0:v:0")
            .arg("-map").arg("1:a:0")
            .arg("-c:v").arg("copy")
            .arg("-c:a").arg("aac")
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(dest)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        check_output(&self.ffmpeg, result)
    }
}

fn check_output(tool: &str, result: std::io::Result<std::process::Output>) -> Result<()> {
    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(ScenecastError::ToolFailed(format!("{tool} failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ScenecastError::ToolNotFound(tool.to_string()))
        }
        Err(e) => Err(ScenecastError::ToolFailed(format!("{tool} error: {e}"))),
    }
}

/// Extract `format.duration` from ffprobe JSON output.
fn parse_probe_duration(json_str: &str) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|_| ScenecastError::ToolFailed("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| ScenecastError::ToolFailed("Could not determine media duration".into()))
}
