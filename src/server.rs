//! HTTP JSON API for the browser UI.
//!
//! Exposes the ingestion and question-answering pipeline over a small
//! JSON surface. The browser front end (out of scope here) renders
//! ingestion controls, the source list, and the chat pane on top of
//! these endpoints.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ingest/web` | Ingest a web page: `{ "url": "..." }` |
//! | `POST` | `/ingest/youtube` | Ingest a video transcript: `{ "url": "..." }` |
//! | `POST` | `/ingest/file` | Ingest an uploaded file: `{ "filename": "...", "content_base64": "..." }` |
//! | `POST` | `/ask` | Answer a question: `{ "question": "..." }` |
//! | `GET`  | `/sources` | List ingested sources |
//! | `POST` | `/clear` | Remove everything from the knowledge base |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "url must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unsupported_file` (422),
//! `upstream_error` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a locally served
//! front end can call the API cross-origin.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::answer::{answer_question, Answer};
use crate::chat::OpenAiChat;
use crate::chunk::Chunker;
use crate::config::Config;
use crate::embedding::OpenAiEmbedder;
use crate::ingest::{ingest_source, IngestReport};
use crate::models::Source;
use crate::store::VectorStore;
use crate::{db, loader_file, loader_web, loader_youtube, migrate};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<VectorStore>,
}

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated. The database schema is applied on startup.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let store = VectorStore::new(pool, config.storage.collection.clone());

    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(store),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/ingest/web", post(handle_ingest_web))
        .route("/ingest/youtube", post(handle_ingest_youtube))
        .route("/ingest/file", post(handle_ingest_file))
        .route("/ask", post(handle_ask))
        .route("/sources", get(handle_sources))
        .route("/clear", post(handle_clear))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    tracing::info!(bind = %bind_addr, "knowledge-agent API listening");
    println!("knowledge-agent API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g. `"bad_request"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Maps pipeline errors to the most fitting HTTP status: input and
/// configuration problems become 400, unsupported uploads 422, failures
/// of the fetch/embedding/completion calls 502, everything else 500.
fn classify_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();

    if msg.contains("must not be empty")
        || msg.contains("cannot be ingested")
        || msg.contains("No chunks")
        || msg.contains("OPENAI_API_KEY")
        || msg.contains("Could not find a YouTube video id")
    {
        bad_request(msg)
    } else if msg.contains("unsupported file type") {
        AppError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: "unsupported_file".to_string(),
            message: msg,
        }
    } else if msg.contains("Failed to fetch")
        || msg.contains("HTTP")
        || msg.contains("API error")
        || msg.contains("No transcript")
        || msg.contains("request failed")
    {
        AppError {
            status: StatusCode::BAD_GATEWAY,
            code: "upstream_error".to_string(),
            message: msg,
        }
    } else {
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".to_string(),
            message: msg,
        }
    }
}

// ============ Request/response bodies ============

#[derive(Deserialize)]
struct UrlRequest {
    url: String,
}

#[derive(Deserialize)]
struct FileRequest {
    filename: String,
    content_base64: String,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<Source>,
    chunks: i64,
}

#[derive(Serialize)]
struct ClearResponse {
    cleared: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

// ============ Handlers ============

async fn handle_ingest_web(
    State(state): State<AppState>,
    Json(req): Json<UrlRequest>,
) -> Result<Json<IngestReport>, AppError> {
    let loaded = loader_web::load_webpage(&req.url)
        .await
        .map_err(classify_error)?;
    run_ingest(&state, loaded).await
}

async fn handle_ingest_youtube(
    State(state): State<AppState>,
    Json(req): Json<UrlRequest>,
) -> Result<Json<IngestReport>, AppError> {
    let loaded = loader_youtube::load_transcript(&req.url)
        .await
        .map_err(classify_error)?;
    run_ingest(&state, loaded).await
}

async fn handle_ingest_file(
    State(state): State<AppState>,
    Json(req): Json<FileRequest>,
) -> Result<Json<IngestReport>, AppError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(req.content_base64.trim())
        .map_err(|e| bad_request(format!("content_base64 is not valid base64: {}", e)))?;
    let loaded = loader_file::load_file(&req.filename, &bytes).map_err(classify_error)?;
    run_ingest(&state, loaded).await
}

async fn run_ingest(
    state: &AppState,
    loaded: crate::models::LoadedSource,
) -> Result<Json<IngestReport>, AppError> {
    let embedder = OpenAiEmbedder::new(&state.config.openai).map_err(classify_error)?;
    let chunker = Chunker::new(
        state.config.chunking.max_tokens,
        state.config.chunking.overlap_tokens,
    )
    .map_err(classify_error)?;

    let report = ingest_source(&state.store, &embedder, &chunker, loaded)
        .await
        .map_err(classify_error)?;

    Ok(Json(report))
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<Answer>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    // The no-context path must not require an API key, so clients are
    // built lazily only when the store holds chunks.
    let chunk_count = state.store.count_chunks().await.map_err(classify_error)?;
    if chunk_count == 0 {
        return Ok(Json(Answer {
            text: crate::answer::NO_CONTEXT_ANSWER.to_string(),
            citations: Vec::new(),
        }));
    }

    let embedder = OpenAiEmbedder::new(&state.config.openai).map_err(classify_error)?;
    let chat = OpenAiChat::new(&state.config.openai).map_err(classify_error)?;
    let chunker = Chunker::new(
        state.config.chunking.max_tokens,
        state.config.chunking.overlap_tokens,
    )
    .map_err(classify_error)?;

    let answer = answer_question(
        &state.store,
        &embedder,
        &chat,
        &chunker,
        &state.config.retrieval,
        &req.question,
    )
    .await
    .map_err(classify_error)?;

    Ok(Json(answer))
}

async fn handle_sources(
    State(state): State<AppState>,
) -> Result<Json<SourcesResponse>, AppError> {
    let sources = state.store.list_sources().await.map_err(classify_error)?;
    let chunks = state.store.count_chunks().await.map_err(classify_error)?;
    Ok(Json(SourcesResponse { sources, chunks }))
}

async fn handle_clear(State(state): State<AppState>) -> Result<Json<ClearResponse>, AppError> {
    state.store.clear().await.map_err(classify_error)?;
    tracing::info!("knowledge base cleared");
    Ok(Json(ClearResponse { cleared: true }))
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
