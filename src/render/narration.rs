//! Narration cues and voice-over synthesis.

use super::toolchain::MediaToolchain;
use crate::error::{Result, ScenecastError};
use futures::future::join_all;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, instrument};

static AUDIO_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*#\s*AUDIO\s*:\s*"(.+)"\s*$"#).expect("Invalid regex")
});

/// A concatenated narration track.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationTrack {
    pub path: PathBuf,
    pub segments: usize,
    pub duration: f64,
}

/// Collect narration cues, one per segment.
///
/// `# AUDIO: "..."` comment lines in the script take precedence over the
/// free-form narration text, which is split by line.
pub fn extract_cues(code: &str, narration: &str) -> Vec<String> {
    let cues: Vec<String> = AUDIO_CUE
        .captures_iter(code)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if !cues.is_empty() {
        return cues;
    }

    narration
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Synthesize one clip per cue and concatenate them into `audio_dir/narration.mp3`.
///
/// Clips are synthesized concurrently on the current task and awaited together.
#[instrument(skip(toolchain, cues), fields(cues = cues.len()))]
pub async fn synthesize_narration(
    toolchain: &dyn MediaToolchain,
    cues: &[String],
    audio_dir: &Path,
) -> Result<NarrationTrack> {
    if cues.is_empty() {
        return Err(ScenecastError::InvalidInput("No narration cues".to_string()));
    }

    std::fs::create_dir_all(audio_dir)?;

    let clips: Vec<PathBuf> = (0..cues.len())
        .map(|i| audio_dir.join(format!("segment_{:03}.mp3", i)))
        .collect();

    let results = join_all(
        cues.iter()
            .zip(&clips)
            .map(|(cue, clip)| toolchain.synthesize_speech(cue, clip)),
    )
    .await;

    for (i, result) in results.into_iter().enumerate() {
        result.map_err(|e| ScenecastError::Render(format!("Narration segment {} failed: {}", i + 1, e)))?;
    }

    debug!("Synthesized {} narration clips", clips.len());

    let list_file = audio_dir.join("concat.txt");
    std::fs::write(&list_file, concat_list(&clips))?;

    let track = audio_dir.join("narration.mp3");
    toolchain.concat_audio(&list_file, &track).await?;

    let duration = toolchain.probe_duration(&track).await?;
    info!("Narration track: {} segments, {:.1}s", clips.len(), duration);

    Ok(NarrationTrack {
        path: track,
        segments: clips.len(),
        duration,
    })
}

/// Body of an ffmpeg concat demuxer list written next to the clips.
///
/// ffmpeg resolves entries against the list's own directory, so only file
/// names are written.
fn concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .filter_map(|clip| clip.file_name())
        .map(|name| format!("file '{}'\n", name.to_string_lossy().replace('\'', r"'\''")))
        .collect()
}
