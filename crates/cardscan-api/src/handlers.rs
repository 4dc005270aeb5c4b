//! HTTP handlers for the card scan API.
//!
//! Implements:
//! - GET/POST /scans, POST /scans/add
//! - GET/POST/DELETE /vehicles, POST/DELETE /vehicles/{card_id}
//! - GET /health

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use cardscan_store::{CardId, RecordStore, ScanLog, ScanRecord, VehicleRecord, VehicleRegistry};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, Result};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub records: RecordStore,
    pub store_configured: bool,
    pub repo: String,
}

/// Body of every successful write.
#[derive(Serialize)]
pub struct WriteResponse {
    pub success: bool,
}

impl WriteResponse {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

// =============================================================================
// Health
// =============================================================================

/// Health check response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub store_configured: bool,
    pub repo: String,
    pub backend: &'static str,
    pub timestamp: String,
}

/// GET /health - Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        store_configured: state.store_configured,
        repo: state.repo,
        backend: state.records.backend_name(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

// =============================================================================
// Scans
// =============================================================================

#[derive(Serialize)]
pub struct ScansResponse {
    pub scans: ScanLog,
}

/// Either a single scan to prepend or a full replacement log.
#[derive(Deserialize)]
pub struct SaveScansRequest {
    #[serde(default)]
    scan: Option<ScanRecord>,
    #[serde(default)]
    scans: Option<ScanLog>,
}

/// GET /scans - All scans, newest first.
pub async fn list_scans(State(state): State<AppState>) -> Result<Json<ScansResponse>> {
    let scans = state.records.scans().await?;
    Ok(Json(ScansResponse { scans }))
}

/// POST /scans - `{scan}` prepends one scan, `{scans}` replaces the log.
pub async fn save_scans(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SaveScansRequest>, JsonRejection>,
) -> Result<Json<WriteResponse>> {
    let Json(request) = payload?;

    match request {
        SaveScansRequest {
            scan: Some(scan), ..
        } => state.records.add_scan(scan).await?,
        SaveScansRequest {
            scans: Some(scans), ..
        } => state.records.replace_scans(scans).await?,
        _ => return Err(ApiError::BadRequest("Invalid request body".to_string())),
    }

    Ok(WriteResponse::ok())
}

/// POST /scans/add - The body is the scan to prepend.
pub async fn add_scan(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ScanRecord>, JsonRejection>,
) -> Result<Json<WriteResponse>> {
    let Json(scan) = payload?;
    state.records.add_scan(scan).await?;
    Ok(WriteResponse::ok())
}

// =============================================================================
// Vehicles
// =============================================================================

#[derive(Serialize)]
pub struct VehiclesResponse {
    pub vehicles: VehicleRegistry,
}

/// Either one vehicle with its card id or a full replacement registry.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveVehiclesRequest {
    #[serde(default)]
    vehicle: Option<VehicleRecord>,
    #[serde(default)]
    card_id: Option<CardId>,
    #[serde(default)]
    vehicles: Option<VehicleRegistry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVehicleQuery {
    card_id: Option<String>,
}

/// GET /vehicles - All vehicles keyed by card id.
pub async fn list_vehicles(State(state): State<AppState>) -> Result<Json<VehiclesResponse>> {
    let vehicles = state.records.vehicles().await?;
    Ok(Json(VehiclesResponse { vehicles }))
}

/// POST /vehicles - `{vehicle, cardId}` upserts one, `{vehicles}` replaces all.
pub async fn save_vehicles(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SaveVehiclesRequest>, JsonRejection>,
) -> Result<Json<WriteResponse>> {
    let Json(request) = payload?;
    let card_id = request.card_id.as_ref().and_then(CardId::key);

    match (request.vehicle, card_id, request.vehicles) {
        (Some(vehicle), Some(card_id), _) => {
            state.records.upsert_vehicle(&card_id, vehicle).await?;
        }
        (_, _, Some(vehicles)) => state.records.replace_vehicles(vehicles).await?,
        _ => return Err(ApiError::BadRequest("Invalid request body".to_string())),
    }

    Ok(WriteResponse::ok())
}

/// POST /vehicles/{card_id} - The body is the vehicle to store.
pub async fn put_vehicle(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    payload: std::result::Result<Json<VehicleRecord>, JsonRejection>,
) -> Result<Json<WriteResponse>> {
    let Json(vehicle) = payload?;
    state.records.upsert_vehicle(&card_id, vehicle).await?;
    Ok(WriteResponse::ok())
}

/// DELETE /vehicles?cardId=... - Remove one vehicle.
pub async fn delete_vehicle_by_query(
    State(state): State<AppState>,
    query: std::result::Result<Query<DeleteVehicleQuery>, QueryRejection>,
) -> Result<Json<WriteResponse>> {
    let Query(query) = query?;
    let card_id = query
        .card_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("cardId query parameter is required".to_string()))?;

    remove_vehicle(&state, &card_id).await
}

/// DELETE /vehicles/{card_id} - Remove one vehicle.
pub async fn delete_vehicle(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<WriteResponse>> {
    remove_vehicle(&state, &card_id).await
}

async fn remove_vehicle(state: &AppState, card_id: &str) -> Result<Json<WriteResponse>> {
    let existed = state.records.delete_vehicle(card_id).await?;
    if !existed {
        debug!("Vehicle {} was not present", card_id);
    }
    Ok(WriteResponse::ok())
}
