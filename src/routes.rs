use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::airdata::openweather::AirDataApi;
use crate::airdata::types::{DerivedResult, Location};
use crate::resolver::Resolver;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
}

#[derive(Debug, Deserialize)]
pub struct AirQualityQuery {
    pub lat: f64,
    pub lon: f64,
    pub aqi: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct LocationInfo {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize)]
pub struct AirQualityResponse {
    pub location: LocationInfo,
    #[serde(flatten)]
    pub data: DerivedResult,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_air_quality(
    State(state): State<AppState>,
    Query(params): Query<AirQualityQuery>,
) -> Result<Json<AirQualityResponse>, StatusCode> {
    if !AirDataApi::is_valid_coordinates(params.lat, params.lon) {
        tracing::warn!("rejected out-of-range coordinates {},{}", params.lat, params.lon);
        return Err(StatusCode::BAD_REQUEST);
    }

    let location = Location {
        lat: params.lat,
        lon: params.lon,
        aqi_hint: params.aqi,
    };

    // Resolution never fails; degraded conditions surface through the
    // payload's `source` field only.
    let result = state.resolver.resolve(location).await;

    Ok(Json(AirQualityResponse {
        location: LocationInfo {
            lat: params.lat,
            lon: params.lon,
        },
        data: (*result).clone(),
        generated_at: chrono::Utc::now(),
    }))
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/air-quality", get(get_air_quality))
        .with_state(state)
}
