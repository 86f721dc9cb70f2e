//! HTTP surface: analyze, chat, enrich, health.
//!
//! Thin axum layer over [`Analyzer`]. Handlers parse the request, call
//! the library, and map errors to `{ "error": ... }` JSON bodies —
//! client mistakes get 4xx with the real message, server-side failures
//! get a generic 500 with the detail only in the logs.

use crate::analyze::Analyzer;
use crate::chat::{follow_up, ChatTurn};
use crate::enrich::condense;
use crate::error::PitchlensError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Uploaded decks can be image-heavy; 50 MiB covers anything sane.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/analyze", post(analyze_deck))
        .route("/chat", post(chat))
        .route("/enrich", post(enrich_company))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn run_server(analyzer: Arc<Analyzer>, bind: &str) -> Result<(), PitchlensError> {
    let app = router(AppState { analyzer });

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|source| PitchlensError::BindFailed {
            addr: bind.to_string(),
            source,
        })?;
    info!("Listening on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| PitchlensError::Internal(format!("server error: {e}")))
}

// ── Error mapping ────────────────────────────────────────────────────────

/// A handler failure, rendered as `{ "error": message }`.
struct AppError {
    status: StatusCode,
    message: String,
}

impl From<PitchlensError> for AppError {
    fn from(e: PitchlensError) -> Self {
        if e.is_client_error() {
            let status = match e {
                PitchlensError::CompanyNotFound { .. } => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            };
            AppError {
                status,
                message: e.to_string(),
            }
        } else {
            // Detail stays in the logs; clients get a stable message.
            error!("Request failed: {}", e);
            AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Error while processing the request".to_string(),
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AnalyzeResponse {
    success: bool,
    analysis: String,
}

/// `POST /analyze` — multipart with a required `file` part and an
/// optional `website` part.
async fn analyze_deck(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mut pdf_bytes: Option<Vec<u8>> = None;
    let mut website: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| AppError {
        status: StatusCode::BAD_REQUEST,
        message: format!("Malformed multipart request: {e}"),
    })? {
        match field.name() {
            Some("file") => {
                let data = field.bytes().await.map_err(|e| AppError {
                    status: StatusCode::BAD_REQUEST,
                    message: format!("Failed to read uploaded file: {e}"),
                })?;
                pdf_bytes = Some(data.to_vec());
            }
            Some("website") => {
                let value = field.text().await.unwrap_or_default();
                let value = value.trim();
                if !value.is_empty() {
                    website = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    let pdf_bytes = pdf_bytes.ok_or(PitchlensError::MissingUpload)?;
    let output = state
        .analyzer
        .analyze(&pdf_bytes, website.as_deref())
        .await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        analysis: output.analysis,
    }))
}

#[derive(Deserialize)]
struct ChatRequest {
    messages: Vec<ChatTurn>,
}

#[derive(Serialize)]
struct ChatReply {
    message: String,
}

/// `POST /chat` — stateless follow-up over a client-held history.
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let message = follow_up(
        state.analyzer.chat_client().as_ref(),
        &request.messages,
        state.analyzer.config(),
    )
    .await?;
    Ok(Json(ChatReply { message }))
}

#[derive(Deserialize)]
struct EnrichRequest {
    website: String,
}

#[derive(Serialize)]
struct EnrichResponse {
    success: bool,
    data: serde_json::Value,
}

/// `POST /enrich` — direct company lookup. Unlike the pipeline's
/// enrichment step this does not degrade: failure is the answer here.
async fn enrich_company(
    State(state): State<AppState>,
    Json(request): Json<EnrichRequest>,
) -> Result<Json<EnrichResponse>, AppError> {
    let client = state
        .analyzer
        .enrichment_client()
        .ok_or(PitchlensError::EnrichmentNotConfigured)?;

    let profile = client
        .fetch(&request.website)
        .await
        .map_err(PitchlensError::from)?
        .ok_or_else(|| PitchlensError::CompanyNotFound {
            domain: request.website.clone(),
        })?;

    let condensed = condense(
        &profile,
        state.analyzer.config().max_profile_employees,
    );
    let data = serde_json::to_value(&condensed)
        .map_err(|e| PitchlensError::Internal(format!("profile serialization: {e}")))?;

    Ok(Json(EnrichResponse {
        success: true,
        data,
    }))
}

/// `GET /health`
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
