//! Handlers for `/rides` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/rides` | Optional `status` (comma-separated) and `rider_id` filters |
//! | `POST`   | `/rides` | Body: [`NewRideBody`]; returns 201 + the pending ride |
//! | `GET`    | `/rides/{id}` | Single ride, including cancelled ones |
//! | `PATCH`  | `/rides/{id}` | Body: [`RidePatchBody`] |
//! | `DELETE` | `/rides/{id}` | Removes the ride and its trail; 204 |
//! | `POST`   | `/rides/{id}/accept` | Requires `X-User-Id`; binds the caller as driver |
//! | `POST`   | `/rides/{id}/start`, `/complete`, `/cancel` | |
//! | `GET`    | `/rides/{id}/locations` | Trail as `[lat, lon]` pairs |
//! | `GET`    | `/rides/{id}/trail` | Trail with timestamps |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfare_core::{
  geo::{Degrees6, FixedCoordinate},
  ride::{NewRide, Ride, RidePatch, RideStatus, Transition},
  store::{RideQuery, RideStore},
  trail::LocationTrail,
  user::UserId,
};

use crate::{AppState, actor::Actor, error::ApiError};

// ─── Response shape ──────────────────────────────────────────────────────────

/// JSON representation of a [`Ride`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideView {
  pub ride_id:           Uuid,
  pub rider_id:          UserId,
  pub driver_id:         Option<UserId>,
  pub pickup_location:   String,
  pub dropoff_location:  String,
  pub status:            RideStatus,
  pub current_latitude:  Degrees6,
  pub current_longitude: Degrees6,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

impl From<Ride> for RideView {
  fn from(r: Ride) -> Self {
    Self {
      ride_id:           r.ride_id,
      rider_id:          r.rider_id,
      driver_id:         r.driver_id,
      pickup_location:   r.pickup_location,
      dropoff_location:  r.dropoff_location,
      status:            r.status,
      current_latitude:  r.current.latitude,
      current_longitude: r.current.longitude,
      created_at:        r.created_at,
      updated_at:        r.updated_at,
    }
  }
}

async fn load_ride<S: RideStore>(store: &S, id: Uuid) -> Result<Ride, ApiError> {
  store
    .get_ride(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("ride {id} not found")))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Comma-separated statuses. Defaults to every status except `cancelled`.
  pub status:   Option<String>,
  pub rider_id: Option<i64>,
}

impl ListParams {
  fn into_query(self) -> Result<RideQuery, ApiError> {
    let mut query = RideQuery { rider_id: self.rider_id.map(UserId), ..RideQuery::default() };
    if let Some(raw) = self.status {
      query.statuses = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
          RideStatus::parse(s).ok_or_else(|| ApiError::BadRequest(format!("unknown status {s:?}")))
        })
        .collect::<Result<_, _>>()?;
    }
    Ok(query)
  }
}

/// `GET /rides[?status=pending,accepted][&rider_id=...]`
pub async fn list<S: RideStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<RideView>>, ApiError> {
  let query = params.into_query()?;
  let rides = state.store.list_rides(&query).await.map_err(ApiError::store)?;
  Ok(Json(rides.into_iter().map(RideView::from).collect()))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /rides`.
#[derive(Debug, Deserialize)]
pub struct NewRideBody {
  pub rider_id:          i64,
  pub pickup_location:   String,
  pub dropoff_location:  String,
  pub current_latitude:  f64,
  pub current_longitude: f64,
  /// Accepted for compatibility and ignored: a ride is created without a
  /// driver, who is bound later by accepting.
  #[serde(default)]
  pub driver_id:         Option<i64>,
  /// Accepted only when absent or `pending`.
  #[serde(default)]
  pub status:            Option<RideStatus>,
}

impl TryFrom<NewRideBody> for NewRide {
  type Error = ApiError;

  fn try_from(b: NewRideBody) -> Result<Self, ApiError> {
    if let Some(driver) = b.driver_id {
      tracing::debug!(driver_id = driver, "ignoring driver_id on ride creation");
    }
    if b.status.is_some_and(|s| s != RideStatus::Pending) {
      return Err(ApiError::BadRequest("new rides are always pending".into()));
    }
    Ok(NewRide {
      rider_id:         UserId(b.rider_id),
      pickup_location:  b.pickup_location,
      dropoff_location: b.dropoff_location,
      current:          FixedCoordinate::new(b.current_latitude, b.current_longitude)?,
    })
  }
}

/// `POST /rides`
pub async fn create<S: RideStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewRideBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = NewRide::try_from(body)?;
  let ride = state.store.create_ride(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(RideView::from(ride))))
}

// ─── Get / patch / delete ────────────────────────────────────────────────────

/// `GET /rides/{id}`
pub async fn get_one<S: RideStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RideView>, ApiError> {
  let ride = load_ride(&*state.store, id).await?;
  Ok(Json(ride.into()))
}

/// JSON body accepted by `PATCH /rides/{id}`. Status and driver change only
/// through the lifecycle endpoints, so those keys are rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RidePatchBody {
  pub pickup_location:   Option<String>,
  pub dropoff_location:  Option<String>,
  pub current_latitude:  Option<f64>,
  pub current_longitude: Option<f64>,
}

impl TryFrom<RidePatchBody> for RidePatch {
  type Error = ApiError;

  fn try_from(b: RidePatchBody) -> Result<Self, ApiError> {
    Ok(RidePatch {
      pickup_location:   b.pickup_location,
      dropoff_location:  b.dropoff_location,
      current_latitude:  b.current_latitude.map(Degrees6::latitude).transpose()?,
      current_longitude: b.current_longitude.map(Degrees6::longitude).transpose()?,
    })
  }
}

/// `PATCH /rides/{id}`
pub async fn patch_one<S: RideStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RidePatchBody>,
) -> Result<Json<RideView>, ApiError> {
  let patch = RidePatch::try_from(body)?;
  let ride = state.store.update_ride(id, patch).await.map_err(ApiError::store)?;
  Ok(Json(ride.into()))
}

/// `DELETE /rides/{id}`
pub async fn delete_one<S: RideStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if state.store.delete_ride(id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("ride {id} not found")))
  }
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

async fn run<S: RideStore>(
  state: &AppState<S>,
  id: Uuid,
  transition: Transition,
  actor: Option<UserId>,
) -> Result<Json<RideView>, ApiError> {
  let ride = state
    .store
    .transition(id, transition, actor, state.policy.guard)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(ride.into()))
}

/// `POST /rides/{id}/accept`
pub async fn accept<S: RideStore>(
  State(state): State<AppState<S>>,
  Actor(driver): Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<RideView>, ApiError> {
  run(&state, id, Transition::Accept, Some(driver)).await
}

/// `POST /rides/{id}/start`
pub async fn start<S: RideStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RideView>, ApiError> {
  run(&state, id, Transition::Start, None).await
}

/// `POST /rides/{id}/complete`
pub async fn complete<S: RideStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RideView>, ApiError> {
  run(&state, id, Transition::Complete, None).await
}

/// `POST /rides/{id}/cancel`
pub async fn cancel<S: RideStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RideView>, ApiError> {
  run(&state, id, Transition::Cancel, None).await
}

// ─── Trail ───────────────────────────────────────────────────────────────────

async fn load_trail<S: RideStore>(store: &S, id: Uuid) -> Result<LocationTrail, ApiError> {
  load_ride(store, id).await?;
  let trail = store.get_trail(id).await.map_err(ApiError::store)?;
  Ok(LocationTrail::recorded(trail, id)?)
}

/// `GET /rides/{id}/locations`, oldest first.
pub async fn locations<S: RideStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<[f64; 2]>>, ApiError> {
  let trail = load_trail(&*state.store, id).await?;
  let pairs = trail
    .positions()
    .into_iter()
    .map(|p| [p.latitude.to_f64(), p.longitude.to_f64()])
    .collect();
  Ok(Json(pairs))
}

/// `GET /rides/{id}/trail`
pub async fn trail<S: RideStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<LocationTrail>, ApiError> {
  Ok(Json(load_trail(&*state.store, id).await?))
}
