// src/api.rs
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use labor_core::{
    allocate_overtime, allocate_overtime_total, allocate_vto, predict, report, OvertimeBreakdown,
    OvertimePolicy, PredictionResult, RateTable, VolumeVector, VtoBreakdown,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::AppError;

// --- Shared State ---

#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RateTable>,
    /// Lowercase hex SHA-256 of the accepted bearer token.
    pub api_token_sha256: Arc<String>,
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/rates", get(handle_rates))
        .route("/predict", post(handle_predict))
        .route("/overtime", post(handle_overtime))
        .route("/overtime/total", post(handle_overtime_total))
        .route("/vto", post(handle_vto))
        .route("/report", post(handle_report))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_token));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Access Control ---

pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

async fn require_api_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    if token_digest(token.trim()) != *state.api_token_sha256 {
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}

// --- Request / Response Bodies ---

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub volumes: VolumeVector,
}

#[derive(Debug, Deserialize)]
pub struct OvertimeRequest {
    pub volumes: VolumeVector,
    pub threshold: Decimal,
    #[serde(default)]
    pub policy: OvertimePolicy,
}

#[derive(Debug, Deserialize)]
pub struct OvertimeTotalRequest {
    pub volumes: VolumeVector,
    pub threshold: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OvertimeTotalResponse {
    pub overtime_hours: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct VtoRequest {
    pub volumes: VolumeVector,
    pub headcount: u32,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub volumes: VolumeVector,
    pub threshold: Option<Decimal>,
    #[serde(default)]
    pub policy: OvertimePolicy,
    pub headcount: Option<u32>,
    pub decimals: Option<u32>,
}

// --- Web Handlers ---

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_status(State(state): State<AppState>) -> Html<String> {
    let functions = state.table.get_functions().join(", ");
    Html(format!(
        "<h1>Labor Planner Status</h1><p>Current Time (Server): {}</p>\
         <p>Productive hours per shift: {}</p><p>Functions ({}): {}</p>",
        chrono::Local::now().to_rfc3339(),
        state.table.get_shift_hours(),
        state.table.len(),
        functions
    ))
}

async fn handle_rates(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.table.to_document())
}

async fn handle_predict(
    State(state): State<AppState>,
    Json(body): Json<PredictRequest>,
) -> Result<Json<PredictionResult>, AppError> {
    let result = predict(&body.volumes, &state.table)?;
    info!(
        "Prediction: {} volumes -> {} hours, {} FTE",
        body.volumes.len(),
        result.total_hours,
        result.total_fte
    );
    Ok(Json(result))
}

async fn handle_overtime(
    State(state): State<AppState>,
    Json(body): Json<OvertimeRequest>,
) -> Result<Json<OvertimeBreakdown>, AppError> {
    let result = predict(&body.volumes, &state.table)?;
    let breakdown = allocate_overtime(&result, body.threshold, body.policy, &state.table)?;
    info!(
        "Overtime ({}): threshold {} FTE -> {} hours across {} functions",
        body.policy,
        body.threshold,
        breakdown.total_overtime_hours,
        breakdown.allocations.len()
    );
    Ok(Json(breakdown))
}

async fn handle_overtime_total(
    State(state): State<AppState>,
    Json(body): Json<OvertimeTotalRequest>,
) -> Result<Json<OvertimeTotalResponse>, AppError> {
    let result = predict(&body.volumes, &state.table)?;
    let overtime_hours = allocate_overtime_total(&result, body.threshold)?;
    debug!("Overtime total: threshold {} FTE -> {} hours", body.threshold, overtime_hours);
    Ok(Json(OvertimeTotalResponse { overtime_hours }))
}

async fn handle_vto(
    State(state): State<AppState>,
    Json(body): Json<VtoRequest>,
) -> Result<Json<VtoBreakdown>, AppError> {
    let result = predict(&body.volumes, &state.table)?;
    let vto = allocate_vto(&result, body.headcount)?;
    info!(
        "VTO: headcount {} vs {} FTE -> {} hours",
        body.headcount, result.total_fte, vto.total_vto_hours
    );
    Ok(Json(vto))
}

async fn handle_report(
    State(state): State<AppState>,
    Json(body): Json<ReportRequest>,
) -> Result<Html<String>, AppError> {
    let dp = body.decimals.unwrap_or(report::DEFAULT_DECIMALS);
    let result = predict(&body.volumes, &state.table)?;

    let mut html = String::from("<h1>Labor Prediction</h1>");
    html.push_str(&report::render_summary_html(&result, dp));
    if let Some(threshold) = body.threshold {
        let breakdown = allocate_overtime(&result, threshold, body.policy, &state.table)?;
        html.push_str(&report::render_overtime_html(&breakdown, dp));
    }
    if let Some(headcount) = body.headcount {
        html.push_str(&report::render_vto_html(&allocate_vto(&result, headcount)?, dp));
    }
    Ok(Html(html))
}
