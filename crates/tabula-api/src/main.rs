//! tabula-api - HTTP API server for tabula

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use tabula_chat::{ChatConfig, ChatRef, ChatService};
use tabula_core::{
    defaults, AnswerBackend, BoardItem, Chat, ChatRepository, ConnectionRepository,
    CreateConnectionRequest, ItemKind, ItemRepository, JobRegistry,
};
use tabula_db::{Database, PoolConfig};
use tabula_inference::{GeminiBackend, GroqBackend, LlmOrchestrator, OrchestratorConfig};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically. That makes
/// request IDs greppable in order across the api, chat and inference logs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// CORS CONFIGURATION HELPER
// =============================================================================

/// Parse allowed origins from comma-separated environment variable.
///
/// # Environment Variable
/// `ALLOWED_ORIGINS` - Comma-separated list of allowed origins
///
/// # Default Origins
/// If not set or empty:
/// - http://localhost:3000
/// - http://localhost:5173
///
/// # Examples
/// ```bash
/// # Production
/// ALLOWED_ORIGINS=https://app.tabula.example
///
/// # Development
/// ALLOWED_ORIGINS=http://localhost:3000,http://localhost:5173
/// ```
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

    if origins_str.trim().is_empty() {
        // Default origins
        return vec![
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:5173"),
        ];
    }

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    db: Database,
    chat: Arc<ChatService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "tabula_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tabula_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        let mut layer = tracing_subscriber::fmt::layer();
        if let Some(ansi) = log_ansi {
            layer = layer.with_ansi(ansi);
        }
        registry.with(layer).init();
    }

    info!(log_format = %log_format, "Logging initialized");

    // Get configuration from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/tabula".to_string());
    let addr_str =
        std::env::var("TABULA_ADDR").unwrap_or_else(|_| defaults::SERVER_ADDR.to_string());

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect_with_config(&database_url, PoolConfig::from_env()).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Build the answer provider chain in fallback order: Gemini first,
    // Groq second. Each registers only when its API key is present.
    let mut backends: Vec<Arc<dyn AnswerBackend>> = Vec::new();
    if let Some(gemini) = GeminiBackend::from_env() {
        backends.push(Arc::new(gemini));
    }
    if let Some(groq) = GroqBackend::from_env() {
        backends.push(Arc::new(groq));
    }
    if backends.is_empty() {
        anyhow::bail!("No answer provider configured; set GEMINI_API_KEY and/or GROQ_API_KEY");
    }
    info!(
        providers = backends.len(),
        primary = backends[0].model_name(),
        "Answer providers configured"
    );
    if backends.len() == 1 {
        tracing::warn!("Only one answer provider configured; fallback chain has no alternative");
    }

    let orchestrator = Arc::new(LlmOrchestrator::with_config(
        backends,
        OrchestratorConfig::from_env(),
    )?);

    // Create the chat service over the database repositories
    let chat = Arc::new(ChatService::new(
        Arc::new(db.items.clone()),
        Arc::new(db.connections.clone()),
        Arc::new(db.jobs.clone()),
        Arc::new(db.chats.clone()),
        Arc::new(db.turns.clone()),
        orchestrator,
        ChatConfig::from_env(),
    ));

    let state = AppState { db, chat };

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Board items
        .route("/api/v1/items", post(create_item))
        .route("/api/v1/items/:id", get(get_item).delete(delete_item))
        .route("/api/v1/boards/:board_id/items", get(list_board_items))
        // Connections
        .route("/api/v1/connections", post(create_connection))
        .route(
            "/api/v1/connections/:id",
            get(get_connection).delete(delete_connection),
        )
        .route("/api/v1/items/:id/connections", get(list_item_connections))
        // Transcription jobs
        .route("/api/v1/jobs", get(list_jobs))
        .route("/api/v1/jobs/:id", get(get_job))
        .route("/api/v1/items/:id/jobs", post(create_job))
        .route("/api/v1/items/:id/status", get(get_item_status))
        // Worker-driven status transitions
        .route("/api/v1/jobs/:id/processing", post(start_job))
        .route("/api/v1/jobs/:id/done", post(complete_job))
        .route("/api/v1/jobs/:id/failed", post(fail_job))
        // Chats
        .route("/api/v1/chats", post(create_chat))
        .route("/api/v1/chats/:id", get(get_chat).delete(delete_chat))
        .route("/api/v1/boards/:board_id/chats", get(list_board_chats))
        // Chat messages, addressable by chat id or by anchor item
        .route(
            "/api/v1/chats/:id/messages",
            get(get_chat_history)
                .post(send_chat_message)
                .delete(clear_chat_history),
        )
        .route(
            "/api/v1/items/:id/chat/messages",
            get(get_anchor_history).post(send_anchor_message),
        )
        .route(
            "/api/v1/messages/:id",
            patch(update_message).delete(delete_message),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer({
            let allowed_origins = parse_allowed_origins();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(defaults::CORS_MAX_AGE_SECS))
        })
        .with_state(state);

    // Start server
    let addr: SocketAddr = addr_str.parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// HEALTH CHECK
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// ITEM HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateItemBody {
    board_id: Uuid,
    kind: ItemKind,
    title: Option<String>,
    source_url: Option<String>,
    /// Direct job reference, when the caller already created the job.
    job_id: Option<Uuid>,
    metadata: Option<serde_json::Value>,
}

async fn create_item(
    State(state): State<AppState>,
    Json(body): Json<CreateItemBody>,
) -> Result<impl IntoResponse, ApiError> {
    let mut item = BoardItem::new(body.board_id, body.kind);
    item.title = body.title;
    item.source_url = body.source_url;
    item.job_id = body.job_id;
    if let Some(metadata) = body.metadata {
        item.metadata = metadata;
    }

    state.db.items.insert(&item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.db.items.get(id).await?;
    Ok(Json(item))
}

async fn list_board_items(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.db.items.list_for_board(board_id).await?;
    Ok(Json(items))
}

/// Delete an item. Touching connections and backing jobs go with it.
async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.items.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// CONNECTION HANDLERS
// =============================================================================

async fn create_connection(
    State(state): State<AppState>,
    Json(body): Json<CreateConnectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let connection = state.db.connections.create(body).await?;
    Ok((StatusCode::CREATED, Json(connection)))
}

async fn get_connection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let connection = state.db.connections.get(id).await?;
    Ok(Json(connection))
}

#[derive(Debug, Deserialize)]
struct ConnectionsQuery {
    /// Restrict results to edges whose far endpoint has this kind.
    other_kind: Option<ItemKind>,
}

async fn list_item_connections(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ConnectionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let connections = state.db.connections.touching(id, query.other_kind).await?;
    Ok(Json(connections))
}

async fn delete_connection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.connections.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// JOB HANDLERS
// =============================================================================

async fn create_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    // The item must exist before a job can back it
    if !state.db.items.exists(id).await? {
        return Err(tabula_core::Error::ItemNotFound(id).into());
    }

    let job = state.db.jobs.create(id).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.db.jobs.get(id).await?;
    Ok(Json(job))
}

async fn list_jobs(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let jobs = state.db.jobs.all().await?;
    Ok(Json(jobs))
}

/// The latest job backing an item, resolved through the registry.
///
/// Distinguishes a missing item from an item that simply has no job
/// yet, so clients can tell a bad id from an untranscribed source.
async fn get_item_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.items.get(id).await?;
    let job = state
        .db
        .jobs
        .find_by_resource(id)
        .await?
        .ok_or(tabula_core::Error::NoJobForItem(id))?;
    Ok(Json(job))
}

async fn start_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.db.jobs.mark_processing(id).await?;
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
struct CompleteJobBody {
    transcription: String,
}

async fn complete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CompleteJobBody>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.db.jobs.mark_done(id, &body.transcription).await?;
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
struct FailJobBody {
    error: String,
}

async fn fail_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<FailJobBody>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.db.jobs.mark_failed(id, &body.error).await?;
    Ok(Json(job))
}

// =============================================================================
// CHAT HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateChatBody {
    board_id: Uuid,
    /// Board item this chat hangs off. Absent for global chats.
    anchor_item_id: Option<Uuid>,
}

async fn create_chat(
    State(state): State<AppState>,
    Json(body): Json<CreateChatBody>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(anchor_id) = body.anchor_item_id {
        // Verify the anchor exists up front for a clean 404
        state.db.items.get(anchor_id).await?;
    }

    let chat = Chat::new(body.board_id, body.anchor_item_id);
    state.db.chats.insert(&chat).await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state.db.chats.get(id).await?;
    Ok(Json(chat))
}

async fn list_board_chats(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let chats = state.db.chats.list_for_board(board_id).await?;
    Ok(Json(chats))
}

async fn delete_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.chats.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// MESSAGE HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
struct SendMessageBody {
    message: String,
}

async fn send_chat_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SendMessageBody>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.chat.send_message(ChatRef::Id(id), &body.message).await?;
    Ok(Json(outcome))
}

/// Send a message to the chat anchored at a board item.
///
/// The chat row is materialized on first contact, so a brand new chat
/// node can be talked to without a separate create call.
async fn send_anchor_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SendMessageBody>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .chat
        .send_message(ChatRef::Anchor(id), &body.message)
        .await?;
    Ok(Json(outcome))
}

async fn get_chat_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state.chat.get_history(ChatRef::Id(id)).await?;
    Ok(Json(history))
}

async fn get_anchor_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state.chat.get_history(ChatRef::Anchor(id)).await?;
    Ok(Json(history))
}

async fn clear_chat_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state.chat.clear_history(ChatRef::Id(id)).await?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.chat.delete_message(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct UpdateMessageBody {
    content: String,
}

async fn update_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMessageBody>,
) -> Result<impl IntoResponse, ApiError> {
    let turn = state.chat.update_message(id, &body.content).await?;
    Ok(Json(turn))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Database(tabula_core::Error),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    BadGateway(String),
}

impl From<tabula_core::Error> for ApiError {
    fn from(err: tabula_core::Error) -> Self {
        use tabula_core::Error;
        match &err {
            Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            Error::ChatNotFound(_)
            | Error::ItemNotFound(_)
            | Error::JobNotFound(_)
            | Error::MessageNotFound(_)
            | Error::NoJobForItem(_) => ApiError::NotFound(err.to_string()),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            Error::ConnectionExists { .. } => ApiError::Conflict(err.to_string()),
            Error::Inference(_) | Error::AllProvidersFailed { .. } => {
                ApiError::BadGateway(err.to_string())
            }
            Error::Database(sqlx_err) => {
                let msg = sqlx_err.to_string();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    // Provide user-friendly error messages for known constraints
                    let friendly_msg = if msg.contains("anchor_item_id") {
                        "A chat already exists for this anchor item".to_string()
                    } else {
                        msg
                    };
                    return ApiError::Conflict(friendly_msg);
                }
                if msg.contains("foreign key") {
                    return ApiError::BadRequest(msg);
                }
                ApiError::Database(err)
            }
            _ => ApiError::Database(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
