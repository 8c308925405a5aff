//! REST API Server for the Merchant Intake Assistant
//!
//! Exposes the dialogue engine via HTTP endpoints for the voice frontend.
//! One session is hosted per process; its mutex serialises turns.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::agent::DialogueEngine;
use crate::document::{flatten_form_data, DocumentFiller};
use crate::error::IntakeError;
use crate::models::{DialoguePhase, TERMINAL_MARKER};
use crate::state::SessionState;
use crate::voice::{self, SpeechSynthesizer, Transcriber};

const DEFAULT_AUDIO_MIME: &str = "audio/webm";
const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SignatureRequest {
    pub signature_image: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub confirmed: bool,
    /// Values edited by the user on the review screen
    pub form_data: Option<serde_json::Map<String, Value>>,
}

/// =============================
/// Response Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub user_text: String,
    pub assistant_text: String,
    pub audio_base64: Option<String>,
    pub form_data: Value,
    pub phase: DialoguePhase,
    pub ended: bool,
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(data: T) -> ApiResult {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn fail(error: IntakeError) -> ApiResult {
    let status = match &error {
        IntakeError::InvalidInput(_) | IntakeError::DecodeError(_) => StatusCode::BAD_REQUEST,
        IntakeError::TranscriptionError(_) | IntakeError::LlmError(_) | IntakeError::HttpError(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!(%status, "Request failed: {}", error);
    (status, Json(ApiResponse::error(error.to_string())))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<DialogueEngine>,
    pub session: Arc<Mutex<SessionState>>,
    pub transcriber: Arc<dyn Transcriber>,
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    pub filler: Arc<dyn DocumentFiller>,
    pub signature_path: PathBuf,
    /// Where the filler writes; served by `/api/download`
    pub document_path: PathBuf,
}

impl ApiState {
    pub fn new(
        engine: Arc<DialogueEngine>,
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        filler: Arc<dyn DocumentFiller>,
        signature_path: PathBuf,
        document_path: PathBuf,
    ) -> Self {
        let session = Arc::new(Mutex::new(engine.new_session()));
        Self {
            engine,
            session,
            transcriber,
            synthesizer,
            filler,
            signature_path,
            document_path,
        }
    }

    async fn speak(&self, text: &str) -> Option<String> {
        voice::speak_base64(self.synthesizer.as_deref(), text).await
    }

    /// Run one utterance through the engine and package the reply
    async fn run_turn(&self, user_text: String, with_audio: bool) -> TurnResponse {
        let mut session = self.session.lock().await;
        let assistant_text = self.engine.process_utterance(&mut session, &user_text).await;
        let form_data = session.slots().to_json();
        let phase = session.phase();
        let ended = session.is_ended();
        drop(session);

        let audio_base64 = if with_audio {
            self.speak(&assistant_text).await
        } else {
            None
        };

        TurnResponse {
            user_text,
            assistant_text,
            audio_base64,
            form_data,
            phase,
            ended,
        }
    }

    async fn ended_response(&self) -> Option<TurnResponse> {
        let session = self.session.lock().await;
        session.is_ended().then(|| TurnResponse {
            user_text: String::new(),
            assistant_text: TERMINAL_MARKER.to_string(),
            audio_base64: None,
            form_data: session.slots().to_json(),
            phase: DialoguePhase::Ended,
            ended: true,
        })
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Conversation Endpoints
/// =============================

async fn initial_message(State(state): State<ApiState>) -> ApiResult {
    let greeting = {
        let mut session = state.session.lock().await;
        state.engine.start_session(&mut session)
    };
    let audio = state.speak(&greeting).await;

    ok(serde_json::json!({
        "assistant_text": greeting,
        "assistant_audio_base64": audio,
    }))
}

async fn voice_stream(State(state): State<ApiState>, mut multipart: Multipart) -> ApiResult {
    if let Some(done) = state.ended_response().await {
        return ok(done);
    }

    let mut upload: Option<(Vec<u8>, String)> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return fail(IntakeError::InvalidInput(format!("malformed upload: {}", e))),
        };
        if field.name() != Some("audio") {
            continue;
        }

        let mime = field
            .content_type()
            .unwrap_or(DEFAULT_AUDIO_MIME)
            .to_string();
        match field.bytes().await {
            Ok(bytes) => upload = Some((bytes.to_vec(), mime)),
            Err(e) => return fail(IntakeError::InvalidInput(format!("unreadable audio: {}", e))),
        }
    }

    let Some((audio, mime)) = upload else {
        return fail(IntakeError::InvalidInput("missing `audio` field".to_string()));
    };

    let user_text = match voice::transcribe_upload(state.transcriber.as_ref(), &audio, &mime).await {
        Ok(text) => text,
        Err(e) => return fail(e),
    };
    info!("User said: {}", user_text);

    let turn = state.run_turn(user_text, true).await;
    info!("Assistant reply: {}", turn.assistant_text);
    ok(turn)
}

async fn text_message(State(state): State<ApiState>, Json(req): Json<MessageRequest>) -> ApiResult {
    let text = req.text.trim();
    if text.is_empty() {
        return fail(IntakeError::InvalidInput("text must not be empty".to_string()));
    }

    if let Some(done) = state.ended_response().await {
        return ok(done);
    }

    ok(state.run_turn(text.to_string(), false).await)
}

async fn form_data(State(state): State<ApiState>) -> ApiResult {
    let session = state.session.lock().await;
    ok(session.slots().to_json())
}

async fn summary(State(state): State<ApiState>) -> ApiResult {
    let session = state.session.lock().await;
    ok(serde_json::json!({ "summary": state.engine.summary(&session) }))
}

async fn reset(State(state): State<ApiState>) -> ApiResult {
    let mut session = state.session.lock().await;
    state.engine.reset_session(&mut session);
    ok(serde_json::json!({ "status": "reset successful" }))
}

/// =============================
/// Document Endpoints
/// =============================

async fn upload_signature(
    State(state): State<ApiState>,
    Json(req): Json<SignatureRequest>,
) -> ApiResult {
    match save_signature(&state.signature_path, &req.signature_image).await {
        Ok(bytes) => {
            info!(bytes, path = %state.signature_path.display(), "Signature image saved");
            ok(serde_json::json!({ "status": "signature saved" }))
        }
        Err(e) => fail(e),
    }
}

async fn save_signature(path: &Path, image: &str) -> crate::Result<usize> {
    let encoded = image.strip_prefix(PNG_DATA_URL_PREFIX).unwrap_or(image).trim();
    if encoded.is_empty() {
        return Err(IntakeError::InvalidInput("signature image is empty".to_string()));
    }

    let bytes = BASE64.decode(encoded)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &bytes).await?;
    Ok(bytes.len())
}

async fn confirm(State(state): State<ApiState>, Json(req): Json<ConfirmRequest>) -> ApiResult {
    if !req.confirmed {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("not confirmed".to_string())),
        );
    }

    let values = match req.form_data {
        Some(edited) => flatten_form_data(edited.into_iter().map(|(k, v)| (k, json_text(v)))),
        None => {
            let session = state.session.lock().await;
            flatten_form_data(session.slots().to_map())
        }
    };

    let signature = tokio::fs::try_exists(&state.signature_path)
        .await
        .unwrap_or(false)
        .then_some(state.signature_path.as_path());

    match state.filler.fill(&values, signature).await {
        Ok(path) => ok(serde_json::json!({
            "status": "filled",
            "document": path.display().to_string(),
        })),
        Err(e) => fail(e),
    }
}

async fn download(State(state): State<ApiState>) -> Response {
    let bytes = match tokio::fs::read(&state.document_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("filled form has not been produced yet".to_string())),
            )
                .into_response();
        }
        Err(e) => return fail(IntakeError::from(e)).into_response(),
    };

    let filename = state
        .document_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("filled_form.json");
    info!(bytes = bytes.len(), "Serving filled form");

    (
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        bytes,
    )
        .into_response()
}

fn json_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/initial-message", get(initial_message))
        .route("/api/voice-stream", post(voice_stream))
        .route("/api/message", post(text_message))
        .route("/api/form-data", get(form_data))
        .route("/api/summary", get(summary))
        .route("/api/upload-signature", post(upload_signature))
        .route("/api/confirm", post(confirm))
        .route("/api/download", get(download))
        .route("/api/reset", post(reset))
        .with_state(state)
        .layer(DefaultBodyLimit::max(voice::MAX_AUDIO_BYTES + 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
