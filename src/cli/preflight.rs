//! Pre-flight checks before a run.
//!
//! Missing tools are reported up front, but the run still starts: the
//! renderer reports the same problem to the agent as a failed tool result.

use crate::config::RenderSettings;
use crate::error::{Result, ScenecastError};
use std::process::Command;

/// External programs a full render needs.
pub fn required_tools(settings: &RenderSettings) -> Vec<&str> {
    vec![
        settings.manim.as_str(),
        settings.ffmpeg.as_str(),
        settings.ffprobe.as_str(),
        settings.tts.as_str(),
    ]
}

/// Return every missing or broken tool as an error.
pub fn check(settings: &RenderSettings) -> Vec<ScenecastError> {
    required_tools(settings)
        .into_iter()
        .filter_map(|tool| check_tool(tool).err())
        .collect()
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg(version_arg(name)).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(ScenecastError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ScenecastError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(ScenecastError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

/// ffmpeg and ffprobe use -version (single dash), others use --version.
pub fn version_arg(name: &str) -> &'static str {
    let base = std::path::Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name);
    match base {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    }
}
