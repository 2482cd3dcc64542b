use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::health::HealthState;
use crate::api::latency::{LatencySnapshot, LatencyStats};
use crate::config::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::db::models::{format_timestamp, NewValuation};
use crate::db::ValuationStore;
use crate::error::AppError;
use crate::types::{
    DashboardStats, Inquiry, InquiryStatus, RequestSource, StoredValuation, User, UserUpdate,
    ValuationResult, VehicleDescriptor,
};
use crate::valuation::engine::current_year;
use crate::valuation::validation::{
    is_plausible_email, InquiryRequest, RegisterRequest, VehicleRequest,
};
use crate::valuation::ValuationEngine;

#[derive(Clone)]
pub struct ApiState {
    pub store: ValuationStore,
    pub engine: Arc<ValuationEngine>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/quick-valuation", post(quick_valuation))
        .route("/api/valuations", post(create_valuation))
        .route("/api/valuations/:id", get(get_valuation))
        .route("/api/users/:user_id/valuations", get(get_user_valuations))
        .route("/api/inquiries", post(create_inquiry))
        .route("/api/register", post(register_user))
        .route("/api/admin/dashboard", get(get_dashboard))
        .route("/api/admin/users", get(get_admin_users))
        .route("/api/admin/users/:id", patch(patch_admin_user))
        .route("/api/admin/valuations", get(get_admin_valuations))
        .route("/api/admin/valuations/:id", patch(patch_admin_valuation))
        .route("/api/admin/inquiries", get(get_admin_inquiries))
        .route("/api/admin/inquiries/:id", patch(patch_admin_inquiry))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateValuationRequest {
    #[serde(flatten)]
    pub vehicle: VehicleRequest,
    pub user_id: Option<i64>,
    pub client_email: Option<String>,
    pub request_source: Option<RequestSource>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

impl ListQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuationRequest {
    pub is_paid: bool,
}

#[derive(Deserialize)]
pub struct UpdateInquiryRequest {
    pub status: Option<InquiryStatus>,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct QuickValuationResponse {
    #[serde(flatten)]
    pub valuation: ValuationResult,
    pub summary: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub valuations_served: u64,
    pub last_valuation_at: Option<String>,
    pub seeded_rng: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Anonymous demo flow. Nothing is stored.
async fn quick_valuation(
    State(state): State<ApiState>,
    ApiJson(body): ApiJson<VehicleRequest>,
) -> Result<Json<QuickValuationResponse>, AppError> {
    let vehicle = body.validate(current_year())?;
    let valuation = run_valuation(&state, &vehicle);
    let summary = valuation.report_data.analysis.clone();
    Ok(Json(QuickValuationResponse { valuation, summary }))
}

/// Persisted flow.
async fn create_valuation(
    State(state): State<ApiState>,
    ApiJson(body): ApiJson<CreateValuationRequest>,
) -> Result<(StatusCode, Json<StoredValuation>), AppError> {
    let vehicle = body.vehicle.validate(current_year())?;
    let client_email = match body.client_email.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(e) if is_plausible_email(e) => Some(e.to_string()),
        Some(_) => return Err(AppError::Validation("clientEmail is not a valid email".to_string())),
    };
    if let Some(user_id) = body.user_id {
        if state.store.get_user(user_id).await?.is_none() {
            return Err(AppError::Validation(format!("userId {user_id} is not a registered user")));
        }
    }

    let result = run_valuation(&state, &vehicle);
    let stored = state
        .store
        .insert_valuation(&NewValuation {
            vehicle,
            result,
            user_id: body.user_id,
            client_email,
            request_source: body.request_source.unwrap_or(RequestSource::Web),
        })
        .await?;

    info!(valuation_id = stored.id, "Valuation persisted");
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_valuation(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<StoredValuation>, AppError> {
    state
        .store
        .get_valuation(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("valuation"))
}

async fn get_user_valuations(
    State(state): State<ApiState>,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<Vec<StoredValuation>>, AppError> {
    if state.store.get_user(user_id).await?.is_none() {
        return Err(AppError::NotFound("user"));
    }
    Ok(Json(state.store.list_user_valuations(user_id).await?))
}

async fn create_inquiry(
    State(state): State<ApiState>,
    ApiJson(body): ApiJson<InquiryRequest>,
) -> Result<(StatusCode, Json<Inquiry>), AppError> {
    let new = body.validate()?;
    let inquiry = state.store.insert_inquiry(&new).await?;
    info!(inquiry_id = inquiry.id, "Inquiry received");
    Ok((StatusCode::CREATED, Json(inquiry)))
}

async fn register_user(
    State(state): State<ApiState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let new = body.into_new_user()?;
    let user = state.store.insert_user(&new).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_dashboard(State(state): State<ApiState>) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(state.store.dashboard_stats().await?))
}

async fn get_admin_valuations(
    State(state): State<ApiState>,
    ApiQuery(params): ApiQuery<ListQuery>,
) -> Result<Json<Vec<StoredValuation>>, AppError> {
    Ok(Json(state.store.list_valuations(params.limit()).await?))
}

async fn patch_admin_valuation(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateValuationRequest>,
) -> Result<Json<StoredValuation>, AppError> {
    state
        .store
        .set_paid(id, body.is_paid)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("valuation"))
}

async fn get_admin_inquiries(
    State(state): State<ApiState>,
    ApiQuery(params): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Inquiry>>, AppError> {
    Ok(Json(state.store.list_inquiries(params.limit()).await?))
}

async fn patch_admin_inquiry(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateInquiryRequest>,
) -> Result<Json<Inquiry>, AppError> {
    if body.status.is_none() && body.notes.is_none() {
        return Err(AppError::Validation("nothing to update: send status and/or notes".to_string()));
    }
    state
        .store
        .update_inquiry(id, body.status, body.notes.as_deref())
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("inquiry"))
}

async fn get_admin_users(
    State(state): State<ApiState>,
    ApiQuery(params): ApiQuery<ListQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.store.list_users(params.limit()).await?))
}

async fn patch_admin_user(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UserUpdate>,
) -> Result<Json<User>, AppError> {
    if body.is_empty() {
        return Err(AppError::Validation("nothing to update".to_string()));
    }
    state
        .store
        .update_user(id, &body)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("user"))
}

async fn get_health(State(state): State<ApiState>) -> impl IntoResponse {
    let database = state.store.ping().await;
    let status = if database { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let body = HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
        valuations_served: state.health.valuations_served(),
        last_valuation_at: state
            .health
            .last_valuation_at_ms()
            .map(|ms| format_timestamp(ms as i64)),
        seeded_rng: state.engine.is_seeded(),
    };
    (status, Json(body))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySnapshot> {
    Json(state.latency.snapshot())
}

/// Shared by the quick and persisted flows: estimate, instrument, log.
fn run_valuation(state: &ApiState, vehicle: &VehicleDescriptor) -> ValuationResult {
    let started = Instant::now();
    let result = state.engine.value(vehicle);
    state.latency.record(started.elapsed());
    state
        .health
        .record_valuation(chrono::Utc::now().timestamp_millis().max(0) as u64);

    info!(
        event = "VALUATION",
        make = %vehicle.make,
        model = %vehicle.model,
        year = vehicle.year,
        mileage = vehicle.mileage,
        condition = %vehicle.condition,
        vin = vehicle.has_usable_vin(),
        estimated_value = result.estimated_value,
        confidence = result.confidence,
        trend = %result.market_trend,
        "VALUATION | {} {} {} | {}km {} | €{} | confidence: {:.2} | trend: {}",
        vehicle.year, vehicle.make, vehicle.model, vehicle.mileage, vehicle.condition,
        result.estimated_value, result.confidence, result.market_trend,
    );
    result
}
