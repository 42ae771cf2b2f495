//! Reconciliation HTTP server.
//!
//! Serves the batch reconciliation protocol used by tabular data-cleaning
//! tools, plus dataset upload and status endpoints.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/reconcile` | Service manifest, or a batch query when `queries`/`query` are given |
//! | `POST` | `/reconcile` | Batch query (JSON or form-encoded body) |
//! | `POST` | `/upload` | Replace the gazetteer with an uploaded CSV (multipart) |
//! | `GET`  | `/status` | Entity count and dataset generation |
//! | `GET`  | `/entities/{id}` | Full entity record (the manifest's view URL) |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "request must contain `queries` or `query`" } }
//! ```
//!
//! Error codes: `bad_request` (400), `invalid_dataset` (400),
//! `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser-hosted
//! clients can call the service directly.

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection, DefaultBodyLimit, FromRequest, Multipart, Path, Query,
        Request, State,
    },
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use gazetteer_recon_core::batch::{self, BatchRequest, BatchResponse};
use gazetteer_recon_core::models::{Entity, TypeRef};
use gazetteer_recon_core::rank::RankPolicy;
use gazetteer_recon_core::store::EntityStore;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::dataset;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    /// Current gazetteer; replaced wholesale by uploads.
    store: Arc<EntityStore>,
    policy: RankPolicy,
}

/// Starts the reconciliation server with a fresh store.
///
/// Loads the configured default dataset first. A dataset that fails to
/// load is logged and the server starts with an empty gazetteer.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(EntityStore::new());
    load_default_dataset(config, &store);
    run_server_with_store(config, store).await
}

/// Starts the server on an existing store.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server_with_store(config: &Config, store: Arc<EntityStore>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(Arc::new(config.clone()), store);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Reconciliation API is running at http://{}/reconcile", bind_addr);
    info!("Upload endpoint available at http://{}/upload", bind_addr);
    info!("Status endpoint available at http://{}/status", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Loads `[dataset].path` into `store`, returning the entity count.
pub fn load_default_dataset(config: &Config, store: &EntityStore) -> Option<usize> {
    let path = config.dataset.path.as_ref()?;
    match dataset::load_file(path, &config.dataset.fields) {
        Ok(parsed) => {
            if parsed.skipped > 0 {
                warn!("Skipped {} rows without a name", parsed.skipped);
            }
            let count = store.replace_entities(parsed.entities, path.display().to_string());
            info!("Default CSV data loaded: {} entities from {}", count, path.display());
            Some(count)
        }
        Err(e) => {
            error!("Error loading default data: {:#}", e);
            None
        }
    }
}

/// Builds the application router.
pub fn router(config: Arc<Config>, store: Arc<EntityStore>) -> Router {
    let max_upload = config.server.max_upload_bytes;
    let state = AppState {
        policy: config.reconcile.policy(),
        config,
        store,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/reconcile",
            get(handle_reconcile_get).post(handle_reconcile_post),
        )
        .route("/upload", post(handle_upload))
        .route("/status", get(handle_status))
        .route("/entities/{id}", get(handle_entity))
        .route("/health", get(handle_health))
        .fallback(handle_fallback)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(cors)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    info!("{}: {} -> {}", method, path, response.status().as_u16());
    response
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn invalid_dataset(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "invalid_dataset",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

// ============ /reconcile ============

/// `queries` / `query` parameters, from a query string or form body.
#[derive(Debug, Default, Deserialize)]
struct ReconcileParams {
    queries: Option<String>,
    query: Option<String>,
}

/// Service manifest returned by `GET /reconcile`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceManifest {
    name: String,
    identifier_space: String,
    schema_space: String,
    default_types: Vec<TypeRef>,
    view: ViewTemplate,
}

#[derive(Debug, Serialize)]
struct ViewTemplate {
    url: String,
}

impl ServiceManifest {
    fn from_config(config: &Config) -> Self {
        let base = config.server.public_url.trim_end_matches('/');
        Self {
            name: config.service.name.clone(),
            identifier_space: format!("{}/entities/", base),
            schema_space: format!("{}/schema/", base),
            default_types: vec![TypeRef::city()],
            view: ViewTemplate {
                url: format!("{}/entities/{{{{id}}}}", base),
            },
        }
    }
}

/// Handler for `GET /reconcile`.
///
/// Without parameters this returns the service manifest; with `queries`
/// or `query` it answers the batch like the form-encoded POST.
async fn handle_reconcile_get(
    State(state): State<AppState>,
    Query(params): Query<ReconcileParams>,
) -> Result<Response, AppError> {
    if params.queries.as_deref().map_or(true, str::is_empty) && params.query.is_none() {
        return Ok(Json(ServiceManifest::from_config(&state.config)).into_response());
    }
    let batch = BatchRequest::from_form(params.queries.as_deref(), params.query.as_deref())
        .map_err(|e| bad_request(format!("Invalid request format: {:#}", e)))?;
    Ok(Json(reconcile(&state, &batch)).into_response())
}

/// Handler for `POST /reconcile`.
///
/// Accepts `application/json` bodies and `application/x-www-form-urlencoded`
/// bodies carrying `queries` (or `query`). Any decode failure rejects the
/// whole request with `400`.
async fn handle_reconcile_post(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<BatchResponse>, AppError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let decoded = if content_type.contains("application/x-www-form-urlencoded") {
        let Form(params) = Form::<ReconcileParams>::from_request(request, &state)
            .await
            .map_err(|e| bad_request(format!("Invalid request format: {}", e.body_text())))?;
        BatchRequest::from_form(params.queries.as_deref(), params.query.as_deref())
    } else if content_type.contains("application/json") {
        let body = Bytes::from_request(request, &state)
            .await
            .map_err(|e| bad_request(format!("Invalid request format: {}", e.body_text())))?;
        BatchRequest::from_json(&body)
    } else {
        return Err(bad_request(format!(
            "Invalid request format: unsupported Content-Type '{}'",
            content_type
        )));
    };

    let batch = decoded.map_err(|e| bad_request(format!("Invalid request format: {:#}", e)))?;
    Ok(Json(reconcile(&state, &batch)))
}

/// Answers every query of `batch` against one store snapshot.
fn reconcile(state: &AppState, batch: &BatchRequest) -> BatchResponse {
    let snapshot = state.store.snapshot();
    batch::handle(batch, snapshot.entities(), &state.policy)
}

// ============ POST /upload ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    success: bool,
    message: String,
    record_count: usize,
    /// CSV columns that were mapped onto entity attributes.
    fields: Vec<String>,
    generation: u64,
}

/// Handler for `POST /upload`.
///
/// Reads the first multipart file whose name ends in `.csv`, parses it,
/// and publishes it as the new gazetteer. The current gazetteer stays in
/// place when the upload is missing, malformed, or has no named rows.
async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart =
        multipart.map_err(|e| bad_request(format!("Invalid multipart request: {}", e.body_text())))?;

    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart request: {}", e.body_text())))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if !file_name.to_ascii_lowercase().ends_with(".csv") {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Invalid multipart request: {}", e.body_text())))?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) = upload.ok_or_else(|| bad_request("No CSV content found"))?;

    let fields = state.config.dataset.fields.clone();
    let parsed = tokio::task::spawn_blocking(move || dataset::parse_csv(&data[..], &fields))
        .await
        .map_err(|e| internal(format!("Processing failed: {}", e)))?
        .map_err(|e| {
            warn!("Rejected upload {}: {:#}", file_name, e);
            invalid_dataset(format!("Processing failed: {:#}", e))
        })?;

    if parsed.entities.is_empty() {
        warn!("Rejected upload {}: no rows with a name", file_name);
        return Err(invalid_dataset(
            "Processing failed: dataset contains no rows with a name",
        ));
    }

    let record_count = state
        .store
        .replace_entities(parsed.entities, format!("upload:{}", file_name));
    let generation = state.store.snapshot().generation();
    info!(
        "Uploaded CSV processed: {} entities from {} (generation {})",
        record_count, file_name, generation
    );

    Ok(Json(UploadResponse {
        success: true,
        message: "Dataset uploaded successfully".to_string(),
        record_count,
        fields: parsed.columns,
        generation,
    }))
}

// ============ GET /status ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: &'static str,
    entities: usize,
    service: String,
    generation: u64,
    source: String,
    loaded_at: String,
}

async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.store.snapshot();
    Json(StatusResponse {
        status: "running",
        entities: snapshot.len(),
        service: state.config.service.name.clone(),
        generation: snapshot.generation(),
        source: snapshot.source().to_string(),
        loaded_at: snapshot.loaded_at().to_rfc3339(),
    })
}

// ============ GET /entities/{id} ============

async fn handle_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Entity>, AppError> {
    state
        .store
        .snapshot()
        .find(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(format!("no entity with id: {}", id)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_fallback() -> AppError {
    not_found("Endpoint not found")
}
