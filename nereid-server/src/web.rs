//! REST API
//!
//! Axum router and handlers. The transport layer is deliberately thin:
//! handlers translate JSON payloads to the coordinator, repository and
//! zone evaluator, and map the typed failures onto HTTP statuses.
//!
//! Status mapping: input-validation failures (bad coordinates, endpoint
//! inside the restricted zone) are 400; unknown alert types and unit ids
//! are 404; losing every claim race or having no units at all is 409 (a
//! legitimate business outcome, logged at info); repository faults are
//! 500 and are never masked as "nothing available".

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use nereid_core::scoring::{AlertProfile, UnitProfile};
use nereid_core::zone::{RestrictedZone, RouteEvaluation, ZoneError};
use nereid_core::Position;

use crate::coordinator::{AllocateError, AllocationCoordinator, AllocationRequest};
use crate::locations;
use crate::repository::{AllocationOutcome, NewUnit, RepositoryError, UnitRepository};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn UnitRepository>,
    pub coordinator: AllocationCoordinator,
    pub zone: Arc<RestrictedZone>,
}

impl AppState {
    pub fn new(repository: Arc<dyn UnitRepository>, zone: RestrictedZone) -> Self {
        AppState {
            coordinator: AllocationCoordinator::new(repository.clone()),
            repository,
            zone: Arc::new(zone),
        }
    }
}

/// Build the application router. CORS is wide open, matching the
/// operations dashboard's needs.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/allocations", post(create_allocation).get(list_allocations))
        .route("/route-safety", get(route_safety))
        .route("/units", get(list_units).post(add_unit))
        .route("/units/{id}", get(get_unit))
        .route("/units/{id}/release", post(release_unit))
        .route("/alerts", get(list_alerts))
        .route("/locations/random", get(random_locations))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API failure envelope.
#[derive(Debug)]
pub enum ApiError {
    Allocate(AllocateError),
    Zone(ZoneError),
    Repository(RepositoryError),
    NotFound(String),
}

impl From<AllocateError> for ApiError {
    fn from(err: AllocateError) -> Self {
        ApiError::Allocate(err)
    }
}

impl From<ZoneError> for ApiError {
    fn from(err: ZoneError) -> Self {
        ApiError::Zone(err)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        ApiError::Repository(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Allocate(err) => match err {
                AllocateError::InvalidCoordinate(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                AllocateError::AlertTypeNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                AllocateError::NoCandidates | AllocateError::AllAllocated => {
                    (StatusCode::CONFLICT, err.to_string())
                }
                AllocateError::Repository(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
            },
            ApiError::Zone(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Repository(err) => match err {
                RepositoryError::UnitNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                RepositoryError::Backend(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
            },
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
        };

        if status.is_server_error() {
            log::error!("request failed: {}", message);
        } else if status == StatusCode::CONFLICT {
            log::info!("allocation unresolved: {}", message);
        }

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequestBody {
    pub alert_type: String,
    pub target_latitude: f64,
    pub target_longitude: f64,
    pub climate_condition: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResponse {
    pub alert_type: String,
    pub unit_id: u32,
    pub unit_name: String,
    pub final_score: f64,
    pub distance_km: f64,
    pub estimated_time_hours: f64,
}

impl From<AllocationOutcome> for AllocationResponse {
    fn from(outcome: AllocationOutcome) -> Self {
        AllocationResponse {
            alert_type: outcome.alert_type,
            unit_id: outcome.unit_id,
            unit_name: outcome.unit_name,
            final_score: outcome.final_score,
            distance_km: outcome.distance_km,
            estimated_time_hours: outcome.estimated_time_hours,
        }
    }
}

async fn create_allocation(
    State(state): State<AppState>,
    Json(body): Json<AllocationRequestBody>,
) -> Result<Json<AllocationResponse>, ApiError> {
    let request = AllocationRequest {
        alert_type: body.alert_type,
        target_latitude: body.target_latitude,
        target_longitude: body.target_longitude,
        climate_condition: body.climate_condition,
    };
    let outcome = state.coordinator.allocate(&request).await?;
    Ok(Json(outcome.into()))
}

async fn list_allocations(
    State(state): State<AppState>,
) -> Result<Json<Vec<AllocationOutcome>>, ApiError> {
    let mut outcomes = state.repository.list_outcomes().await?;
    outcomes.reverse(); // latest first
    Ok(Json(outcomes))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSafetyQuery {
    pub from_latitude: f64,
    pub from_longitude: f64,
    pub to_latitude: f64,
    pub to_longitude: f64,
    pub speed_kmh: f64,
}

async fn route_safety(
    State(state): State<AppState>,
    Query(query): Query<RouteSafetyQuery>,
) -> Result<Json<RouteEvaluation>, ApiError> {
    let source = Position {
        lat: query.from_latitude,
        lon: query.from_longitude,
    };
    let destination = Position {
        lat: query.to_latitude,
        lon: query.to_longitude,
    };
    let evaluation = state
        .zone
        .evaluate_routes(source, destination, query.speed_kmh)?;
    Ok(Json(evaluation))
}

async fn list_units(State(state): State<AppState>) -> Result<Json<Vec<UnitProfile>>, ApiError> {
    Ok(Json(state.repository.list_units().await?))
}

async fn get_unit(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<UnitProfile>, ApiError> {
    state
        .repository
        .get_unit(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("unit {} not found", id)))
}

async fn add_unit(
    State(state): State<AppState>,
    Json(unit): Json<NewUnit>,
) -> Result<(StatusCode, Json<UnitProfile>), ApiError> {
    unit.position.validate().map_err(ZoneError::Geo)?;
    let created = state.repository.add_unit(unit).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn release_unit(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<UnitProfile>, ApiError> {
    Ok(Json(state.repository.release(id).await?))
}

async fn list_alerts(State(state): State<AppState>) -> Result<Json<Vec<AlertProfile>>, ApiError> {
    Ok(Json(state.repository.list_alert_profiles().await?))
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LocationQuery {
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationResponse {
    pub locations: Vec<Position>,
    pub count: usize,
}

async fn random_locations(Query(query): Query<LocationQuery>) -> Json<LocationResponse> {
    let mut rng = rand::thread_rng();
    let locations = locations::random_locations(&mut rng, query.count.unwrap_or(1));
    Json(LocationResponse {
        count: locations.len(),
        locations,
    })
}
