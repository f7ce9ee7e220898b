use std::sync::Arc;

use async_trait::async_trait;

use crate::gemini::{AudioClip, GeminiClient};

/// Best-effort narration. `Ok(None)` and `Err(_)` both mean "no audio for this page".
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> anyhow::Result<Option<AudioClip>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSpeech;

#[async_trait]
impl SpeechSynthesizer for DisabledSpeech {
    async fn synthesize(&self, _text: &str) -> anyhow::Result<Option<AudioClip>> {
        Ok(None)
    }
}

#[derive(Debug, Clone)]
pub struct GeminiSpeech {
    client: GeminiClient,
}

impl GeminiSpeech {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiSpeech {
    async fn synthesize(&self, text: &str) -> anyhow::Result<Option<AudioClip>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.client.synthesize_speech(text).await
    }
}

/// Gemini synthesis when it is switched on and a key is configured, otherwise disabled.
pub fn from_client(client: &GeminiClient) -> Arc<dyn SpeechSynthesizer> {
    let config = client.config();
    if config.tts_enabled && config.api_key.is_some() {
        tracing::info!(model = %config.tts_model, voice = %config.voice, "speech synthesis enabled");
        Arc::new(GeminiSpeech::new(client.clone()))
    } else {
        tracing::debug!("speech synthesis disabled");
        Arc::new(DisabledSpeech)
    }
}

/// Collapses every failure into "unavailable".
pub async fn narrate(synthesizer: &dyn SpeechSynthesizer, text: &str) -> Option<AudioClip> {
    match synthesizer.synthesize(text).await {
        Ok(clip) => clip,
        Err(err) => {
            tracing::debug!(error = %format!("{err:#}"), "speech synthesis unavailable");
            None
        }
    }
}
