use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use base64::Engine as _;
use serde_json::Value;

pub const STUB_KEY: &str = "test-key";

pub const STORY_JSON: &str = r#"{
  "title": "용감한 하루",
  "scenes": [
    { "description": "아침에 일어났어요.", "imagePrompt": "child waking up, watercolor" },
    { "description": "공원에 갔어요.", "imagePrompt": "child at the park, watercolor" },
    { "description": "친구를 도왔어요.", "imagePrompt": "child helping a friend, watercolor" }
  ],
  "growthPoint": "친구를 도울 줄 알게 되었어요.",
  "detectedMode": "hero"
}"#;

/// Cut mid-way through the third scene.
pub const TRUNCATED_STORY: &str = r#"{
  "title": "잘린 이야기",
  "scenes": [
    { "description": "첫 장면", "imagePrompt": "first" },
    { "description": "둘째 장면", "imagePrompt": "second" },
    { "description": "셋째 장"#;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum StoryBehavior {
    /// Valid story wrapped in a ```json fence with chatter around it.
    Fenced,
    Truncated,
    Garbage,
    /// 400 with a Gemini-style `{error:{message}}` body.
    ApiError,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum AudioBehavior {
    /// 100 ms of 24 kHz 16-bit PCM silence.
    Pcm,
    NoAudio,
    ApiError,
}

#[derive(Debug, Clone)]
pub struct GeminiStubConfig {
    pub story: StoryBehavior,
    pub audio: AudioBehavior,
}

impl Default for GeminiStubConfig {
    fn default() -> Self {
        Self {
            story: StoryBehavior::Fenced,
            audio: AudioBehavior::Pcm,
        }
    }
}

pub struct GeminiStub {
    pub base_url: String,
    requests: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

#[allow(dead_code)]
impl GeminiStub {
    pub fn spawn(config: GeminiStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start gemini stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1beta");

        let requests = Arc::new(AtomicUsize::new(0));
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_requests = Arc::clone(&requests);
        let thread_bodies = Arc::clone(&bodies);
        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };
                thread_requests.fetch_add(1, Ordering::SeqCst);

                let url = request.url().to_string();
                let (path, query) = url.split_once('?').unwrap_or((&url, ""));
                if request.method() != &tiny_http::Method::Post
                    || !path.starts_with("/v1beta/models/")
                    || !path.ends_with(":generateContent")
                {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }
                if !query.split('&').any(|pair| pair == format!("key={STUB_KEY}")) {
                    let _ = request.respond(json_response(
                        403,
                        &error_body("API key not valid. Please pass a valid API key."),
                    ));
                    continue;
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }
                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json").with_status_code(400),
                        );
                        continue;
                    }
                };
                thread_bodies
                    .lock()
                    .expect("lock stub bodies")
                    .push(parsed.clone());

                let wants_audio = parsed
                    .pointer("/generationConfig/responseModalities/0")
                    .and_then(|v| v.as_str())
                    == Some("AUDIO");
                let (status, response_body) = if wants_audio {
                    audio_response(config.audio)
                } else {
                    story_response(config.story)
                };
                let _ = request.respond(json_response(status, &response_body));
            }
        });

        Self {
            base_url,
            requests,
            bodies,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().expect("lock stub bodies").clone()
    }
}

impl Drop for GeminiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn json_response(status: u16, body: &Value) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("build header");
    tiny_http::Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(header)
}

fn error_body(message: &str) -> Value {
    serde_json::json!({ "error": { "code": 400, "message": message, "status": "INVALID_ARGUMENT" } })
}

fn text_candidate(text: &str) -> Value {
    serde_json::json!({
        "candidates": [
            { "content": { "role": "model", "parts": [ { "text": text } ] }, "finishReason": "STOP" }
        ]
    })
}

fn story_response(behavior: StoryBehavior) -> (u16, Value) {
    match behavior {
        StoryBehavior::Fenced => (
            200,
            text_candidate(&format!("여기 동화가 있어요!\n```json\n{STORY_JSON}\n```\n즐거운 시간 되세요.")),
        ),
        StoryBehavior::Truncated => (200, text_candidate(TRUNCATED_STORY)),
        StoryBehavior::Garbage => (200, text_candidate("오늘은 이야기를 만들 수 없어요.")),
        StoryBehavior::ApiError => (400, error_body("model overloaded")),
    }
}

fn audio_response(behavior: AudioBehavior) -> (u16, Value) {
    match behavior {
        AudioBehavior::Pcm => {
            let silence = vec![0u8; 4_800];
            let data = base64::engine::general_purpose::STANDARD.encode(silence);
            (
                200,
                serde_json::json!({
                    "candidates": [
                        {
                            "content": {
                                "parts": [
                                    { "inlineData": { "mimeType": "audio/L16;codec=pcm;rate=24000", "data": data } }
                                ]
                            }
                        }
                    ]
                }),
            )
        }
        AudioBehavior::NoAudio => (200, text_candidate("no audio today")),
        AudioBehavior::ApiError => (400, error_body("tts unavailable")),
    }
}
