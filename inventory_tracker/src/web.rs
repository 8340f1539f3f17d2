//! Local JSON API over the inventory store
//!
//! Every store operation and derived view gets an endpoint under `/api`.
//! The store sits behind a single mutex so mutations never interleave.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use skylander_common::{CatalogItem, FetchError, ImportError, InventoryRecord, SavedShareView};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::error::TrackerError;
use crate::normalizer::import_csv_text;
use crate::share::{share_link, ShareDraft, SharePayload, DEFAULT_SHARE_BASE_URL};
use crate::sheets::{fetch_sheet_csv, SheetUrl, SHEETS_BASE_URL};
use crate::storage::StateStorage;
use crate::store::{FieldUpdate, ImportSummary, InventoryStore};
use crate::views::{DashboardStats, ItemDetail, ListFilter, TradeFilter};

/// Store type shared between request handlers
pub type SharedStore = Arc<Mutex<InventoryStore<Box<dyn StateStorage + Send>>>>;

/// Wrap a store for sharing with the router.
pub fn shared_store<S: StateStorage + Send + 'static>(store: InventoryStore<S>) -> SharedStore {
    Arc::new(Mutex::new(store.boxed()))
}

/// Address the server binds to unless told otherwise
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// External endpoints the server talks to
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Host share links point at
    pub share_base_url: String,
    /// Host spreadsheet exports are fetched from
    pub sheets_base_url: String,
    /// Browser origin allowed to call the API cross-origin.
    /// `None` sends no CORS headers at all.
    pub allowed_origin: Option<HeaderValue>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
            sheets_base_url: SHEETS_BASE_URL.to_string(),
            allowed_origin: None,
        }
    }
}

/// Parse an origin such as `http://localhost:5173` for [`WebConfig::allowed_origin`].
///
/// The `*` wildcard is refused; the API mutates local state.
pub fn parse_origin(origin: &str) -> Result<HeaderValue, String> {
    let origin = origin.trim();
    if origin.is_empty() || origin == "*" {
        return Err(format!("Invalid CORS origin: '{}'", origin));
    }
    HeaderValue::from_str(origin).map_err(|e| format!("Invalid CORS origin '{}': {}", origin, e))
}

/// CORS for exactly one origin; requests from any other origin get no
/// `access-control-allow-origin` header back.
fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

/// Shared application state (store + http client for sheet imports)
#[derive(Clone)]
struct AppState {
    store: SharedStore,
    client: reqwest::Client,
    config: Arc<WebConfig>,
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    /// Set when the change was applied but could not be saved
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            warning: None,
        }
    }

    fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }
}

/// Error reply: status code plus message in the `error` field
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(what: &str, id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{} not found: {}", what, id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
            warning: None,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        let status = match &err {
            TrackerError::Import(ImportError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            TrackerError::Import(_) => StatusCode::BAD_REQUEST,
            TrackerError::Fetch(FetchError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
            TrackerError::Fetch(_) => StatusCode::BAD_GATEWAY,
            TrackerError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TrackerError::UnknownField(_) | TrackerError::InvalidValue { .. } => {
                StatusCode::BAD_REQUEST
            }
            TrackerError::UnknownShareView(_) => StatusCode::NOT_FOUND,
        };
        if status.is_server_error() {
            log::error!("Request failed: {}", err);
        }
        Self::new(status, err.to_string())
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        TrackerError::from(err).into()
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        TrackerError::from(err).into()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

type BoxedStore = InventoryStore<Box<dyn StateStorage + Send>>;

fn lock(state: &AppState) -> Result<MutexGuard<'_, BoxedStore>, ApiError> {
    state.store.lock().map_err(|_| {
        log::error!("Inventory store lock poisoned");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Inventory store unavailable")
    })
}

/// Split a mutation result into a warning (save failed, change kept) or an error.
fn saved(result: crate::Result<()>) -> Result<Option<String>, ApiError> {
    match result {
        Ok(()) => Ok(None),
        Err(e) if e.is_persistence() => Ok(Some(e.to_string())),
        Err(e) => Err(e.into()),
    }
}

// ── Request / response bodies ────────────────────────────────────────

#[derive(Deserialize)]
struct FieldUpdateBody {
    field: String,
    value: serde_json::Value,
}

#[derive(Deserialize)]
struct SheetImportBody {
    url: String,
}

/// A catalog id with its (possibly default) record
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordData {
    id: String,
    record: InventoryRecord,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TradeData {
    items: Vec<ItemDetail>,
    total_value: f64,
    text: String,
}

#[derive(Serialize)]
struct ShareData {
    payload: SharePayload,
    link: String,
}

fn share_data(payload: SharePayload, base_url: &str) -> Result<ShareData, ApiError> {
    let link = share_link(&payload, base_url).map_err(|e| {
        log::error!("Failed to encode share payload: {}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(ShareData { payload, link })
}

// ── Dashboard and items ──────────────────────────────────────────────

/// GET /api/stats
async fn stats_handler(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let store = lock(&state)?;
    Ok(Json(ApiResponse::ok(store.view().stats())))
}

/// GET /api/elements
async fn elements_handler(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let store = lock(&state)?;
    let elements = store
        .view()
        .elements()
        .into_iter()
        .map(str::to_string)
        .collect();
    Ok(Json(ApiResponse::ok(elements)))
}

/// GET /api/items?status={status}&element={element}&search={q}&sort={key}&direction={dir}
async fn items_handler(
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Vec<ItemDetail>> {
    let store = lock(&state)?;
    let view = store.view();
    let items = view
        .filter(&filter)
        .into_iter()
        .filter_map(|item| view.item_detail(&item.id))
        .collect();
    Ok(Json(ApiResponse::ok(items)))
}

/// GET /api/items/{id}
async fn item_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ItemDetail> {
    let store = lock(&state)?;
    match store.view().item_detail(&id) {
        Some(detail) => Ok(Json(ApiResponse::ok(detail))),
        None => Err(ApiError::not_found("Skylander", &id)),
    }
}

/// POST /api/items/{id} with `{"field": "...", "value": ...}`
async fn update_item_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<FieldUpdateBody>,
) -> ApiResult<RecordData> {
    let update = FieldUpdate::from_json(&body.field, &body.value)?;
    let mut store = lock(&state)?;
    let warning = saved(store.update_field(&id, update))?;
    let record = store.record(&id).into_owned();
    Ok(Json(ApiResponse::ok(RecordData { id, record }).with_warning(warning)))
}

/// POST /api/items/{id}/add
async fn add_item_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<RecordData> {
    let mut store = lock(&state)?;
    let warning = saved(store.add_to_inventory(&id))?;
    let record = store.record(&id).into_owned();
    Ok(Json(ApiResponse::ok(RecordData { id, record }).with_warning(warning)))
}

/// POST /api/reset
async fn reset_handler(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let mut store = lock(&state)?;
    let warning = saved(store.reset_all())?;
    Ok(Json(ApiResponse::ok(store.view().stats()).with_warning(warning)))
}

// ── Trade list ───────────────────────────────────────────────────────

/// GET /api/trade?element={element}&search={q}
async fn trade_handler(
    State(state): State<AppState>,
    Query(filter): Query<TradeFilter>,
) -> ApiResult<TradeData> {
    let store = lock(&state)?;
    let view = store.view();
    let items = view
        .trade_items(&filter)
        .into_iter()
        .filter_map(|item| view.item_detail(&item.id))
        .collect();

    Ok(Json(ApiResponse::ok(TradeData {
        items,
        total_value: view.trade_total_value(&filter),
        text: view.trade_list_text(&filter),
    })))
}

// ── Imports ──────────────────────────────────────────────────────────

fn import_items(
    store: &mut BoxedStore,
    items: Vec<CatalogItem>,
) -> ApiResult<ImportSummary> {
    let (summary, result) = store.import_catalog_reporting(items);
    let warning = saved(result)?;
    Ok(Json(ApiResponse::ok(summary).with_warning(warning)))
}

/// POST /api/import/csv with the CSV text as body
async fn import_csv_handler(State(state): State<AppState>, body: String) -> ApiResult<ImportSummary> {
    let items = import_csv_text(&body)?;
    let mut store = lock(&state)?;
    import_items(&mut store, items)
}

/// POST /api/import/sheet with `{"url": "..."}`
///
/// The lock is released while the sheet downloads. If another import or a
/// reset lands in the meantime, this result is stale and gets discarded.
async fn import_sheet_handler(
    State(state): State<AppState>,
    Json(body): Json<SheetImportBody>,
) -> ApiResult<ImportSummary> {
    let sheet = SheetUrl::parse(&body.url)?.with_base_url(state.config.sheets_base_url.clone());
    let revision = lock(&state)?.catalog_revision();

    log::info!("Fetching sheet {}", sheet.sheet_id());
    let text = fetch_sheet_csv(&state.client, &sheet).await?;
    let items = import_csv_text(&text)?;

    let mut store = lock(&state)?;
    if store.catalog_revision() != revision {
        log::warn!(
            "Discarding import of sheet {}: catalog changed while fetching",
            sheet.sheet_id()
        );
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "Catalog changed while the sheet was loading; import discarded",
        ));
    }
    import_items(&mut store, items)
}

// ── Sharing ──────────────────────────────────────────────────────────

/// POST /api/share with a share draft
async fn share_handler(
    State(state): State<AppState>,
    Json(draft): Json<ShareDraft>,
) -> ApiResult<ShareData> {
    let payload = lock(&state)?.view().share_payload(&draft);
    let data = share_data(payload, &state.config.share_base_url)?;
    Ok(Json(ApiResponse::ok(data)))
}

/// GET /api/views
async fn list_views_handler(State(state): State<AppState>) -> ApiResult<Vec<SavedShareView>> {
    let store = lock(&state)?;
    Ok(Json(ApiResponse::ok(store.share_views().to_vec())))
}

/// POST /api/views with a share draft
async fn save_view_handler(
    State(state): State<AppState>,
    Json(draft): Json<ShareDraft>,
) -> ApiResult<SavedShareView> {
    let mut store = lock(&state)?;
    match store.save_share_view(&draft) {
        Ok(view) => Ok(Json(ApiResponse::ok(view))),
        Err(e) if e.is_persistence() => match store.share_views().last().cloned() {
            Some(view) => Ok(Json(ApiResponse::ok(view).with_warning(Some(e.to_string())))),
            None => Err(e.into()),
        },
        Err(e) => Err(e.into()),
    }
}

/// GET /api/views/{id}/share
async fn view_share_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ShareData> {
    let payload = {
        let store = lock(&state)?;
        let view = store
            .share_view(&id)
            .ok_or_else(|| ApiError::from(TrackerError::UnknownShareView(id.clone())))?;
        store.view().share_payload(&ShareDraft::from(view))
    };
    let data = share_data(payload, &state.config.share_base_url)?;
    Ok(Json(ApiResponse::ok(data)))
}

/// DELETE /api/views/{id}
async fn delete_view_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<String> {
    let mut store = lock(&state)?;
    match store.delete_share_view(&id) {
        Ok(true) => Ok(Json(ApiResponse::ok(id))),
        Ok(false) => Err(TrackerError::UnknownShareView(id).into()),
        Err(e) if e.is_persistence() => {
            Ok(Json(ApiResponse::ok(id).with_warning(Some(e.to_string()))))
        }
        Err(e) => Err(e.into()),
    }
}

/// Build the web server router
pub fn create_router(store: SharedStore, config: WebConfig) -> Router {
    let cors = config.allowed_origin.clone().map(cors_layer);
    let state = AppState {
        store,
        client: reqwest::Client::new(),
        config: Arc::new(config),
    };

    let router = Router::new()
        .route("/api/stats", get(stats_handler))
        .route("/api/elements", get(elements_handler))
        .route("/api/items", get(items_handler))
        .route("/api/items/{id}", get(item_handler).post(update_item_handler))
        .route("/api/items/{id}/add", post(add_item_handler))
        .route("/api/reset", post(reset_handler))
        .route("/api/trade", get(trade_handler))
        .route("/api/import/csv", post(import_csv_handler))
        .route("/api/import/sheet", post(import_sheet_handler))
        .route("/api/share", post(share_handler))
        .route("/api/views", get(list_views_handler).post(save_view_handler))
        .route("/api/views/{id}", delete(delete_view_handler))
        .route("/api/views/{id}/share", get(view_share_handler));

    match cors {
        Some(cors) => router.layer(cors).with_state(state),
        None => router.with_state(state),
    }
}

/// Start the web server on `host:port` and run until Ctrl-C.
///
/// Pass [`DEFAULT_HOST`] to stay on loopback; anything else exposes the
/// unauthenticated API to the network.
pub async fn serve(
    store: SharedStore,
    host: &str,
    port: u16,
    config: WebConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(origin) = &config.allowed_origin {
        log::info!("Allowing cross-origin requests from {:?}", origin);
    }
    let app = create_router(store, config);
    let addr = format!("{}:{}", host, port);

    log::info!("Inventory API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Inventory API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
    log::info!("Shutdown signal received");
}

#[cfg(test)]
#[path = "web_tests.rs"]
mod tests;
