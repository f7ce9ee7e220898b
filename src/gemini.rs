use std::time::Duration;

use anyhow::Context as _;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Kore";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub tts_model: String,
    pub voice: String,
    pub tts_enabled: bool,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            tts_model: DEFAULT_TTS_MODEL.to_owned(),
            voice: DEFAULT_VOICE.to_owned(),
            tts_enabled: false,
            timeout: Duration::from_secs(120),
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Self {
            api_key: var("GEMINI_API_KEY"),
            base_url: var("STORYBOOK_GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            model: var("STORYBOOK_GEMINI_MODEL").unwrap_or(defaults.model),
            tts_model: var("STORYBOOK_GEMINI_TTS_MODEL").unwrap_or(defaults.tts_model),
            voice: var("STORYBOOK_TTS_VOICE").unwrap_or(defaults.voice),
            tts_enabled: var("STORYBOOK_TTS_ENABLED")
                .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
            timeout: var("STORYBOOK_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn require_api_key(&self) -> anyhow::Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY is not set"))
    }
}

/// Image attached to a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data_base64: String,
}

impl InlineImage {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data_base64: BASE64.encode(bytes),
        }
    }

    /// Accepts `data:<mime>;base64,<data>` as produced by a browser file reader.
    /// A bare payload without the `data:` prefix is taken as base64 JPEG.
    pub fn from_data_url(data_url: &str) -> anyhow::Result<Self> {
        let data_url = data_url.trim();
        let (mime_type, data) = match data_url.split_once(',') {
            Some((header, data)) => {
                let mime = header
                    .strip_prefix("data:")
                    .and_then(|rest| rest.split(';').next())
                    .filter(|mime| !mime.is_empty())
                    .unwrap_or("image/jpeg");
                (mime.to_owned(), data)
            }
            None => ("image/jpeg".to_owned(), data_url),
        };
        if data.is_empty() {
            anyhow::bail!("image data is empty");
        }
        if !mime_type.starts_with("image/") {
            anyhow::bail!("unsupported image type: {mime_type}");
        }
        Ok(Self {
            mime_type,
            data_base64: data.to_owned(),
        })
    }
}

/// Synthesized narration returned by the TTS model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl AudioClip {
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.data))
    }

    /// Playback length, when the encoding tells us.
    ///
    /// Handles raw `audio/L16;rate=N` PCM (what Gemini TTS returns) and canonical WAV.
    pub fn duration(&self) -> Option<Duration> {
        let mime = self.mime_type.to_ascii_lowercase();
        if mime.starts_with("audio/l16") || mime.starts_with("audio/pcm") {
            let rate = mime
                .split(';')
                .filter_map(|param| param.trim().strip_prefix("rate="))
                .find_map(|rate| rate.parse::<u64>().ok())
                .unwrap_or(24_000);
            let bytes_per_sec = rate.checked_mul(2).filter(|rate| *rate > 0)?;
            let millis = (self.data.len() as u64).checked_mul(1000)? / bytes_per_sec;
            return Some(Duration::from_millis(millis));
        }
        if self.data.len() >= 44 && &self.data[0..4] == b"RIFF" && &self.data[8..12] == b"WAVE" {
            let byte_rate = u32::from_le_bytes(self.data[28..32].try_into().ok()?) as u64;
            if byte_rate == 0 {
                return None;
            }
            let payload = (self.data.len() - 44) as u64;
            return Some(Duration::from_millis(payload.checked_mul(1000)? / byte_rate));
        }
        None
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build http client")?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub async fn generate_text(
        &self,
        prompt: &str,
        image: Option<&InlineImage>,
    ) -> anyhow::Result<String> {
        let api_key = self.config.require_api_key()?;
        let endpoint = generate_content_endpoint(&self.config.base_url, &self.config.model);

        let mut parts = vec![serde_json::json!({ "text": prompt })];
        if let Some(image) = image {
            parts.push(serde_json::json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": image.data_base64,
                }
            }));
        }
        let body = serde_json::json!({
            "contents": [ { "parts": parts } ],
            "generationConfig": {
                "temperature": 0.9,
                "maxOutputTokens": 8000,
                "topK": 40,
                "topP": 0.95,
            },
        });

        tracing::info!(
            model = %self.config.model,
            has_image = image.is_some(),
            prompt_chars = prompt.chars().count(),
            "gemini generate"
        );
        let value = self.post(&endpoint, api_key, &body).await?;
        extract_text(&value).context("extract generated text")
    }

    pub async fn synthesize_speech(&self, text: &str) -> anyhow::Result<Option<AudioClip>> {
        let api_key = self.config.require_api_key()?;
        let endpoint = generate_content_endpoint(&self.config.base_url, &self.config.tts_model);
        let body = serde_json::json!({
            "contents": [ { "parts": [ { "text": text } ] } ],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.config.voice }
                    }
                }
            },
        });

        tracing::debug!(
            model = %self.config.tts_model,
            text_chars = text.chars().count(),
            "gemini synthesize"
        );
        let value = self.post(&endpoint, api_key, &body).await?;
        extract_audio(&value).context("extract synthesized audio")
    }

    async fn post(
        &self,
        endpoint: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let response = self
            .http
            .post(endpoint)
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {endpoint}"))?;

        let status = response.status();
        let raw = response.text().await.context("read Gemini response body")?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
            anyhow::bail!("Gemini API error ({status}): {message}");
        }

        serde_json::from_str(&raw).context("parse Gemini response")
    }
}

pub fn generate_content_endpoint(base_url: &str, model: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/models/{model}:generateContent")
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn first_candidate_parts(value: &serde_json::Value) -> anyhow::Result<&Vec<serde_json::Value>> {
    value
        .pointer("/candidates/0/content/parts")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("missing `candidates[0].content.parts` in response"))
}

fn extract_text(value: &serde_json::Value) -> anyhow::Result<String> {
    let parts = first_candidate_parts(value)?;

    let mut text = String::new();
    for part in parts {
        let Some(part_text) = part.get("text").and_then(|v| v.as_str()) else {
            continue;
        };
        text.push_str(part_text);
    }

    if text.trim().is_empty() {
        anyhow::bail!("Gemini output text is empty");
    }
    Ok(text)
}

fn extract_audio(value: &serde_json::Value) -> anyhow::Result<Option<AudioClip>> {
    let parts = first_candidate_parts(value)?;
    let Some(inline) = parts.iter().find_map(|part| part.get("inlineData")) else {
        return Ok(None);
    };
    let Some(data) = inline.get("data").and_then(|v| v.as_str()) else {
        return Ok(None);
    };
    let mime_type = inline
        .get("mimeType")
        .and_then(|v| v.as_str())
        .unwrap_or("audio/wav")
        .to_owned();
    let data = BASE64.decode(data).context("decode audio base64")?;
    if data.is_empty() {
        return Ok(None);
    }
    Ok(Some(AudioClip { mime_type, data }))
}
