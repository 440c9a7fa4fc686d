//! Handlers for `/locations` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/locations` | Body: [`ReportBody`]; upserts, returns 201 |
//! | `GET`   | `/locations/{user_id}` | |
//! | `PATCH` | `/locations/{user_id}` | Body: [`LocationPatchBody`] |
//! | `GET`   | `/locations/{user_id}/available_drivers` | Nearest free drivers first |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use wayfare_core::{
  dispatch::{self, AvailableDriver},
  location::{LocationPatch, LocationReport, Role, UserLocation},
  store::RideStore,
  user::UserId,
};

use crate::{AppState, error::ApiError};

// ─── Report ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /locations`. The role may also be sent as
/// `driver_or_rider`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportBody {
  pub user_id:   i64,
  #[serde(default, alias = "driver_or_rider")]
  pub role:      Role,
  pub latitude:  f64,
  pub longitude: f64,
}

/// `POST /locations`
pub async fn report<S: RideStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<ReportBody>,
) -> Result<impl IntoResponse, ApiError> {
  let report = LocationReport::new(UserId(body.user_id), body.role, body.latitude, body.longitude)?;
  let location = state.store.report_location(report).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(location)))
}

// ─── Get / patch ─────────────────────────────────────────────────────────────

/// `GET /locations/{user_id}`
pub async fn get_one<S: RideStore>(
  State(state): State<AppState<S>>,
  Path(user_id): Path<i64>,
) -> Result<Json<UserLocation>, ApiError> {
  let location = state
    .store
    .get_location(UserId(user_id))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no location recorded for user {user_id}")))?;
  Ok(Json(location))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationPatchBody {
  #[serde(alias = "driver_or_rider")]
  pub role:      Option<Role>,
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,
}

/// `PATCH /locations/{user_id}`
pub async fn patch_one<S: RideStore>(
  State(state): State<AppState<S>>,
  Path(user_id): Path<i64>,
  Json(body): Json<LocationPatchBody>,
) -> Result<Json<UserLocation>, ApiError> {
  let patch = LocationPatch { role: body.role, latitude: body.latitude, longitude: body.longitude };
  let location = state
    .store
    .update_location(UserId(user_id), patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(location))
}

// ─── Matching ────────────────────────────────────────────────────────────────

/// One entry of the `available_drivers` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverDistance {
  pub driver:   UserId,
  /// Kilometres from the rider.
  pub distance: f64,
}

impl From<AvailableDriver> for DriverDistance {
  fn from(d: AvailableDriver) -> Self { Self { driver: d.driver_id, distance: d.distance_km } }
}

/// `GET /locations/{user_id}/available_drivers`
pub async fn available_drivers<S: RideStore>(
  State(state): State<AppState<S>>,
  Path(user_id): Path<i64>,
) -> Result<Json<Vec<DriverDistance>>, ApiError> {
  let drivers = dispatch::available_drivers(&*state.store, UserId(user_id), &state.policy)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(drivers.into_iter().map(DriverDistance::from).collect()))
}
