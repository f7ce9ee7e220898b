//! JSON API consumed by the browser front end.

pub mod model;

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::app::model::{ErrorBody, GenerateAudioBody, GenerateAudioResponse, GenerateStoryBody};
use crate::formats::Narrative;
use crate::gemini::{GeminiClient, InlineImage};
use crate::generate::{GenerateError, StoryRequest, generate_story};
use crate::speech::{self, SpeechSynthesizer};

const MSG_MISSING_INPUT: &str = "이야기 내용을 입력해주세요.";
const MSG_MISSING_TEXT: &str = "텍스트가 필요합니다.";
const MSG_MISSING_KEY: &str = "Gemini API 키가 설정되지 않았습니다.";
const MSG_AUDIO_FAILED: &str = "음성 생성 중 오류가 발생했습니다.";

#[derive(Clone)]
pub struct AppState {
    gemini: GeminiClient,
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl AppState {
    pub fn new(gemini: GeminiClient) -> Self {
        let synthesizer = speech::from_client(&gemini);
        Self::with_synthesizer(gemini, synthesizer)
    }

    pub fn with_synthesizer(gemini: GeminiClient, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            gemini,
            synthesizer,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/generate-story", post(generate_story_handler))
        .route("/api/generate-audio", post(generate_audio_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorBody::new(message)))
}

/// Unreadable bodies get the same `{error}` shape as every other failure.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            tracing::info!(status = %rejection.status(), error = %rejection.body_text(), "rejected request body");
            Err(api_error(StatusCode::BAD_REQUEST, rejection.body_text()))
        }
    }
}

async fn generate_story_handler(
    State(state): State<AppState>,
    body: Result<Json<GenerateStoryBody>, JsonRejection>,
) -> Result<Json<Narrative>, ApiError> {
    let body = json_body(body)?;
    let request_id = uuid::Uuid::new_v4();
    let user_input = body.user_input.clone().unwrap_or_default();
    tracing::info!(
        %request_id,
        has_image = body.image().is_some(),
        input_chars = user_input.chars().count(),
        mode = ?body.mode(),
        "generate story request"
    );

    let image = body
        .image()
        .map(InlineImage::from_data_url)
        .transpose()
        .map_err(|err| api_error(StatusCode::BAD_REQUEST, format!("{err:#}")))?;
    let request = StoryRequest {
        user_input,
        image,
        mode: body.mode(),
    };

    match generate_story(&state.gemini, &request).await {
        Ok(narrative) => Ok(Json(narrative)),
        Err(GenerateError::InvalidInput(reason)) => {
            tracing::info!(%request_id, reason = %reason, "rejected story request");
            Err(api_error(StatusCode::BAD_REQUEST, MSG_MISSING_INPUT))
        }
        Err(GenerateError::MissingApiKey) => {
            tracing::error!(%request_id, "GEMINI_API_KEY is not set");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, MSG_MISSING_KEY))
        }
        Err(GenerateError::Upstream(err)) => {
            tracing::error!(%request_id, error = %format!("{err:#}"), "story generation failed");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{err:#}"),
            ))
        }
    }
}

async fn generate_audio_handler(
    State(state): State<AppState>,
    body: Result<Json<GenerateAudioBody>, JsonRejection>,
) -> Response {
    let body = match json_body(body) {
        Ok(body) => body,
        Err(err) => return err.into_response(),
    };
    let text = body.text.unwrap_or_default();
    if text.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, MSG_MISSING_TEXT).into_response();
    }
    if state.gemini.config().api_key.is_none() {
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, MSG_MISSING_KEY).into_response();
    }

    // Synthesis is best effort: every failure is still a 200 so the viewer keeps going.
    let response = match state.synthesizer.synthesize(&text).await {
        Ok(clip) => GenerateAudioResponse {
            audio_url: clip.map(|clip| clip.to_data_url()),
            error: None,
        },
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "speech synthesis failed");
            GenerateAudioResponse {
                audio_url: None,
                error: Some(MSG_AUDIO_FAILED.to_owned()),
            }
        }
    };
    Json(response).into_response()
}
