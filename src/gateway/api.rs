//! REST API handlers for the gateway
//!
//! Each route performs one store operation (two, in order, for
//! `chargeComplete` and `halt`) and answers with plain text or JSON.
//! Store failures are logged and reported as a 500 with a fixed message;
//! malformed ids and bodies are rejected with a 400 before the store is
//! touched.

use axum::{
    extract::{rejection::JsonRejection, MatchedPath, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::Error;
use crate::metrics;
use crate::models::{
    display_value, Battery, BatteryId, BatteryUpdate, ChargingCountRequest, DataQuery,
    DataRequest, StatCounter, Stats, UpdateOutcome,
};
use crate::storage::StoreOperation;

use super::server::AppState;

/// Greeting returned by `GET /`
pub const GREETING: &str = "Hello from chargehub server!";

// ============================================================================
// API Errors
// ============================================================================

/// Handler failure, rendered as a short plain-text body
#[derive(Debug)]
pub enum ApiError {
    /// Malformed path, query or body
    BadRequest(String),

    /// A store operation failed; `message` is all the client sees
    Store {
        message: &'static str,
        operation: StoreOperation,
        source: Error,
    },
}

impl ApiError {
    /// Map a store error to a response with a fixed client message
    ///
    /// Errors caused by the request itself (e.g. a body value the store
    /// cannot represent) still become a 400.
    fn store(message: &'static str, operation: StoreOperation) -> impl FnOnce(Error) -> Self {
        move |source| {
            if source.is_client_error() {
                Self::BadRequest(source.to_string())
            } else {
                Self::Store {
                    message,
                    operation,
                    source,
                }
            }
        }
    }

    fn invalid_body(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::BadRequest(message) => {
                tracing::debug!(%message, "Rejected request");
                (status, message).into_response()
            }
            Self::Store {
                message,
                operation,
                source,
            } => {
                tracing::error!(
                    operation = %operation,
                    category = source.category().as_str(),
                    recoverable = source.is_recoverable(),
                    error = %source,
                    "{message}"
                );
                metrics::record_store_error(operation.as_str());
                (status, message).into_response()
            }
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn parse_battery_id(raw: &str) -> ApiResult<BatteryId> {
    raw.parse::<BatteryId>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn log_update(id: &str, action: &str, outcome: &UpdateOutcome) {
    if outcome.matched == 0 {
        tracing::debug!(battery_id = %id, action, "No battery matched; reporting success");
    } else {
        tracing::debug!(
            battery_id = %id,
            action,
            modified = outcome.modified,
            "Battery updated"
        );
    }
}

// ============================================================================
// API Response Types
// ============================================================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub store: String,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(greeting))
        // Data endpoints
        .route("/data", get(echo_data).post(insert_data))
        // Read endpoints
        .route("/batteries", get(list_batteries))
        .route("/stats", get(get_stats))
        // Battery lifecycle endpoints
        .route("/batteries/{id}/pause", post(pause_charging))
        .route("/batteries/{id}/resume", post(resume_charging))
        .route("/batteries/{id}/chargeComplete", post(charge_complete))
        .route("/batteries/{id}/halt", post(halt_charging))
        .route(
            "/batteries/{id}/updateChargingCount",
            post(update_charging_count),
        )
        // Operational endpoints
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found)
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// Count requests per matched route and response status
///
/// Requests that match no route, and so end in the 404 fallback, are
/// counted under `unmatched`.
async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16());
    response
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

// ============================================================================
// Data Handlers
// ============================================================================

/// Static greeting
async fn greeting() -> &'static str {
    GREETING
}

/// Echo the `id` query parameter
async fn echo_data(Query(query): Query<DataQuery>) -> ApiResult<String> {
    let id = query
        .id
        .ok_or_else(|| ApiError::BadRequest("Missing query parameter: id".to_string()))?;

    Ok(format!("Received GET request with id: {id}"))
}

/// Insert `{ data }` into the `data` collection
async fn insert_data(
    State(state): State<AppState>,
    payload: Result<Json<DataRequest>, JsonRejection>,
) -> ApiResult<String> {
    let Json(request) = payload.map_err(ApiError::invalid_body)?;
    let echoed = display_value(&request.data);

    let id = state
        .store
        .insert_data(request.data)
        .await
        .map_err(ApiError::store("Error inserting data", StoreOperation::InsertData))?;

    tracing::debug!(document_id = %id.to_hex(), "Inserted data record");
    Ok(format!("Received POST request with data: {echoed}"))
}

// ============================================================================
// Read Handlers
// ============================================================================

/// All battery documents
async fn list_batteries(State(state): State<AppState>) -> ApiResult<Json<Vec<Battery>>> {
    let batteries = state.store.list_batteries().await.map_err(ApiError::store(
        "Error fetching batteries data",
        StoreOperation::ListBatteries,
    ))?;

    Ok(Json(batteries))
}

/// The stats singleton, or `null` before the first increment
async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<Option<Stats>>> {
    let stats = state
        .store
        .find_stats()
        .await
        .map_err(ApiError::store("Error fetching stats", StoreOperation::FindStats))?;

    Ok(Json(stats))
}

// ============================================================================
// Battery Lifecycle Handlers
// ============================================================================

async fn pause_charging(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<String> {
    let id = parse_battery_id(&raw_id)?;
    let outcome = state
        .store
        .update_battery(id, BatteryUpdate::pause())
        .await
        .map_err(ApiError::store("Error pausing charging", StoreOperation::UpdateBattery))?;

    log_update(&raw_id, "pause", &outcome);
    Ok(format!("Charging paused for battery ID: {raw_id}"))
}

async fn resume_charging(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<String> {
    let id = parse_battery_id(&raw_id)?;
    let outcome = state
        .store
        .update_battery(id, BatteryUpdate::resume())
        .await
        .map_err(ApiError::store("Error resuming charging", StoreOperation::UpdateBattery))?;

    log_update(&raw_id, "resume", &outcome);
    Ok(format!("Charging resumed for battery ID: {raw_id}"))
}

/// Update a battery, then bump a stats counter by one
///
/// The two writes are not atomic. If the increment fails after the battery
/// update succeeded, the battery keeps its new flags and the counter is not
/// adjusted; there is no rollback.
async fn update_then_count(
    state: &AppState,
    raw_id: &str,
    action: &'static str,
    update: BatteryUpdate,
    counter: StatCounter,
) -> ApiResult<()> {
    let id = parse_battery_id(raw_id)?;

    let outcome = state
        .store
        .update_battery(id, update)
        .await
        .map_err(ApiError::store(
            "Error updating battery status",
            StoreOperation::UpdateBattery,
        ))?;
    log_update(raw_id, action, &outcome);

    if let Err(e) = state.store.increment_stat(counter, 1).await {
        tracing::warn!(
            battery_id = %raw_id,
            action,
            counter = counter.field_name(),
            "Battery updated but stats increment failed; stats now lag the batteries collection"
        );
        return Err(ApiError::store("Error updating stats", StoreOperation::IncrementStat)(e));
    }

    Ok(())
}

async fn charge_complete(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<String> {
    update_then_count(
        &state,
        &raw_id,
        "charge_complete",
        BatteryUpdate::charge_complete(),
        StatCounter::Charged,
    )
    .await?;

    Ok(format!("Battery ID: {raw_id} marked as charged"))
}

async fn halt_charging(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<String> {
    update_then_count(
        &state,
        &raw_id,
        "halt",
        BatteryUpdate::halt(),
        StatCounter::Halted,
    )
    .await?;

    Ok(format!("Battery ID: {raw_id} marked as halted"))
}

/// Adjust the current-charging counter by a signed amount
///
/// The path id is only echoed, so it is not required to be a valid ObjectId.
async fn update_charging_count(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<ChargingCountRequest>, JsonRejection>,
) -> ApiResult<String> {
    let Json(request) = payload.map_err(ApiError::invalid_body)?;

    let outcome = state
        .store
        .increment_stat(StatCounter::CurrentCharging, request.increment)
        .await
        .map_err(ApiError::store(
            "Error updating charging count",
            StoreOperation::IncrementStat,
        ))?;

    tracing::debug!(
        battery_id = %raw_id,
        increment = request.increment,
        upserted = outcome.upserted,
        "Charging count updated"
    );
    Ok(format!("Updated charging count for battery ID: {raw_id}"))
}

// ============================================================================
// Operational Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, label) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::warn!(store = state.store.name(), error = %e, "Health check ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.start_time.elapsed().as_secs(),
            store: state.store.name().to_string(),
        }),
    )
}

/// Prometheus exposition
async fn metrics_handler() -> Response {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error encoding metrics").into_response()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
