//! HTTP surface over [`Services`]

use std::sync::Arc;

use axum::body::Body;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::detect::UNDETERMINED;
use crate::error::{ParleyError, Result};
use crate::language::language_names;
use crate::services::Services;
use crate::transcribe::AudioInput;

type AppState = State<Arc<Services>>;

const DEFAULT_SPEECH_LANGUAGE: &str = "en";

/// Error body returned by every endpoint: `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<ParleyError> for ApiError {
    fn from(err: ParleyError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed: {}", self.message);
        } else {
            warn!("Rejected request: {}", self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct TranslateRequest {
    #[serde(default)]
    text: String,
    /// Empty or `auto` means detect it from the text
    #[serde(default)]
    source_lang: String,
    #[serde(default)]
    target_lang: String,
}

#[derive(Debug, Serialize)]
struct TranslateResponse {
    translated_text: String,
    source_lang: String,
    route: &'static str,
}

#[derive(Debug, Serialize)]
struct TranscribeResponse {
    text: String,
    detected_lang: String,
    engine: String,
}

fn default_speech_language() -> String {
    DEFAULT_SPEECH_LANGUAGE.to_string()
}

#[derive(Debug, Deserialize)]
struct SpeechRequest {
    #[serde(default)]
    text: String,
    #[serde(default = "default_speech_language")]
    lang: String,
}

#[derive(Debug, Deserialize)]
struct DetectRequest {
    #[serde(default)]
    text: String,
}

pub fn build_router(services: Arc<Services>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/languages", get(languages))
        .route("/api/pairs", get(pairs))
        .route("/api/translate", post(translate))
        .route("/api/stt", post(speech_to_text))
        .route("/api/tts", post(text_to_speech))
        .route("/api/detect-lang", post(detect_language))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(services)
}

/// Bind `config.bind` and serve until Ctrl-C
pub async fn serve(config: &ServerConfig, services: Arc<Services>) -> Result<()> {
    let app = build_router(services, config);
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn languages() -> impl IntoResponse {
    Json(language_names())
}

async fn pairs(State(services): AppState) -> Json<serde_json::Value> {
    let translator = &services.translator;
    let pairs: Vec<String> = translator
        .supported_pairs()
        .sorted()
        .iter()
        .map(ToString::to_string)
        .collect();

    Json(json!({
        "pivot": translator.pivot_language(),
        "pairs": pairs,
    }))
}

async fn translate(
    State(services): AppState,
    payload: std::result::Result<Json<TranslateRequest>, JsonRejection>,
) -> std::result::Result<Json<TranslateResponse>, ApiError> {
    let Json(request) = payload?;
    if request.text.is_empty() || request.target_lang.trim().is_empty() {
        return Err(ApiError::bad_request("Missing required fields"));
    }

    let source_lang = match request.source_lang.trim() {
        "" | "auto" => services
            .detector
            .detect(&request.text)
            .await?
            .ok_or_else(|| ApiError::bad_request("Could not determine the source language"))?,
        code => code.to_string(),
    };

    let translation = services
        .translator
        .translate(&request.text, &source_lang, &request.target_lang)
        .await?;

    Ok(Json(TranslateResponse {
        translated_text: translation.text,
        source_lang,
        route: translation.route.label(),
    }))
}

async fn speech_to_text(
    State(services): AppState,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<TranscribeResponse>, ApiError> {
    let mut multipart = multipart?;

    let mut audio = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("audio") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        audio = Some(AudioInput::new(bytes.to_vec(), file_name));
        break;
    }

    let audio = audio.ok_or_else(|| ApiError::bad_request("Missing audio file"))?;
    let transcript = services.transcriber.transcribe(&audio).await?;

    Ok(Json(TranscribeResponse {
        text: transcript.text,
        detected_lang: transcript
            .language
            .unwrap_or_else(|| UNDETERMINED.to_string()),
        engine: transcript.engine,
    }))
}

async fn text_to_speech(
    State(services): AppState,
    payload: std::result::Result<Json<SpeechRequest>, JsonRejection>,
) -> std::result::Result<Response, ApiError> {
    let Json(request) = payload?;
    if request.text.is_empty() {
        return Err(ApiError::bad_request("Missing text input"));
    }

    let artifact = services
        .synthesizer
        .synthesize(&request.text, &request.lang)
        .await?;
    let audio = artifact.read_bytes().await?;

    let headers = [
        (header::CONTENT_TYPE.as_str(), "audio/wav".to_string()),
        ("x-voice-language", artifact.voice_language.clone()),
        ("x-synthesis-engine", artifact.engine.clone()),
    ];
    Ok((headers, audio).into_response())
}

async fn detect_language(
    State(services): AppState,
    payload: std::result::Result<Json<DetectRequest>, JsonRejection>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let Json(request) = payload?;
    if request.text.is_empty() {
        return Err(ApiError::bad_request("Missing text input"));
    }

    let lang = services
        .detector
        .detect(&request.text)
        .await?
        .unwrap_or_else(|| UNDETERMINED.to_string());

    Ok(Json(json!({ "lang": lang })))
}
