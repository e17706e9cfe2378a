//! In-process doubles for the chat model, media tools and search.

use crate::error::{Result, ScenecastError};
use crate::llm::{AiReply, ChatModel, Message, ToolSpec};
use crate::render::{MediaToolchain, ProcessOutput};
use crate::search::{SearchProvider, SearchResults};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

/// Replays queued replies, then `fallback` forever if set.
pub struct ScriptedChatModel {
    replies: Mutex<VecDeque<AiReply>>,
    fallback: Option<AiReply>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedChatModel {
    pub fn new(replies: Vec<AiReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fallback(mut self, reply: AiReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Every history the model was invoked with.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn invoke(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<AiReply> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let next = self.replies.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| ScenecastError::Llm("no scripted reply left".to_string()))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Toolchain that writes placeholder files instead of running binaries.
#[derive(Debug, Default)]
pub struct FakeToolchain {
    /// Render exits non-zero with this stderr.
    pub render_stderr: Option<String>,
    /// Render succeeds without producing a video.
    pub skip_artifact: bool,
    /// Render fails as if manim were not installed.
    pub missing_renderer: bool,
    pub fail_speech: bool,
    pub fail_mux: bool,
}

#[async_trait]
impl MediaToolchain for FakeToolchain {
    async fn render_scene(
        &self,
        script: &Path,
        _scene: &str,
        output_name: &str,
        work_dir: &Path,
    ) -> Result<ProcessOutput> {
        if self.missing_renderer {
            return Err(ScenecastError::ToolNotFound("manim".to_string()));
        }
        if let Some(stderr) = &self.render_stderr {
            return Ok(ProcessOutput {
                success: false,
                stderr: stderr.clone(),
            });
        }
        // The real command runs with `work_dir` as its current directory.
        let script = work_dir.join(script);
        if !script.exists() {
            return Ok(ProcessOutput {
                success: false,
                stderr: format!("cannot open {}", script.display()),
            });
        }

        if !self.skip_artifact {
            let media_dir = work_dir.join(work_dir.join("media"));
            let out_dir = media_dir.join("videos").join("scene").join("720p30");
            std::fs::create_dir_all(&out_dir)?;
            std::fs::write(out_dir.join(output_name), b"silent")?;
        }
        Ok(ProcessOutput {
            success: true,
            stderr: String::new(),
        })
    }

    async fn synthesize_speech(&self, text: &str, dest: &Path) -> Result<()> {
        if self.fail_speech {
            return Err(ScenecastError::ToolFailed("gtts-cli failed: offline".to_string()));
        }
        std::fs::write(dest, text)?;
        Ok(())
    }

    async fn probe_duration(&self, _path: &Path) -> Result<f64> {
        Ok(2.5)
    }

    async fn concat_audio(&self, _list_file: &Path, dest: &Path) -> Result<()> {
        std::fs::write(dest, b"audio")?;
        Ok(())
    }

    async fn mux(&self, _video: &Path, _audio: &Path, dest: &Path) -> Result<()> {
        if self.fail_mux {
            return Err(ScenecastError::ToolFailed("ffmpeg failed: bad stream".to_string()));
        }
        std::fs::write(dest, b"muxed")?;
        Ok(())
    }
}

/// Search provider returning fixed snippets.
pub struct StaticSearch {
    pub snippets: Vec<String>,
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str) -> Result<SearchResults> {
        Ok(SearchResults {
            query: query.to_string(),
            snippets: self.snippets.clone(),
        })
    }
}
