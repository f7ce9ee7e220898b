use std::path::PathBuf;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::gemini::AudioClip;

/// Plays a clip; the returned future resolves when playback has finished.
///
/// Dropping the future stops playback.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, clip: &AudioClip) -> anyhow::Result<()>;
}

/// Headless output: waits out the clip's length and optionally keeps a copy on disk.
#[derive(Debug, Clone, Default)]
pub struct PacedOutput {
    save_dir: Option<PathBuf>,
}

impl PacedOutput {
    pub fn new(save_dir: Option<PathBuf>) -> Self {
        Self { save_dir }
    }
}

#[async_trait]
impl AudioOutput for PacedOutput {
    async fn play(&self, clip: &AudioClip) -> anyhow::Result<()> {
        let duration = clip
            .duration()
            .with_context(|| format!("unknown length for audio type {}", clip.mime_type))?;

        if let Some(dir) = &self.save_dir {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create audio dir: {}", dir.display()))?;
            let ext = if clip.mime_type.contains("wav") { "wav" } else { "pcm" };
            let path = dir.join(format!("narration-{}.{ext}", uuid::Uuid::new_v4().simple()));
            tokio::fs::write(&path, &clip.data)
                .await
                .with_context(|| format!("write audio: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "saved narration audio");
        }

        tracing::debug!(duration_ms = duration.as_millis() as u64, "playing narration");
        tokio::time::sleep(duration).await;
        Ok(())
    }
}
