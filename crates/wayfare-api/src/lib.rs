//! JSON REST API for Wayfare.
//!
//! Exposes an axum [`Router`] backed by any [`wayfare_core::store::RideStore`].
//! Authentication and TLS are the caller's responsibility; the acting user is
//! read from the `X-User-Id` header (see [`actor`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", wayfare_api::api_router(store.clone(), policy))
//! ```

pub mod actor;
pub mod error;
pub mod locations;
pub mod rides;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use wayfare_core::{dispatch::DispatchPolicy, store::RideStore};

pub use error::ApiError;

/// Shared handler state.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub policy: Arc<DispatchPolicy>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), policy: Arc::clone(&self.policy) }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, policy: DispatchPolicy) -> Router<()>
where
  S: RideStore + 'static,
{
  let state = AppState { store, policy: Arc::new(policy) };

  Router::new()
    // Rides
    .route("/rides", get(rides::list::<S>).post(rides::create::<S>))
    .route(
      "/rides/{id}",
      get(rides::get_one::<S>).patch(rides::patch_one::<S>).delete(rides::delete_one::<S>),
    )
    .route("/rides/{id}/accept", post(rides::accept::<S>))
    .route("/rides/{id}/start", post(rides::start::<S>))
    .route("/rides/{id}/complete", post(rides::complete::<S>))
    .route("/rides/{id}/cancel", post(rides::cancel::<S>))
    .route("/rides/{id}/locations", get(rides::locations::<S>))
    .route("/rides/{id}/trail", get(rides::trail::<S>))
    // Location registry
    .route("/locations", post(locations::report::<S>))
    .route(
      "/locations/{user_id}",
      get(locations::get_one::<S>).patch(locations::patch_one::<S>),
    )
    .route("/locations/{user_id}/available_drivers", get(locations::available_drivers::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value, json};
  use tower::ServiceExt;
  use wayfare_core::ride::GuardPolicy;
  use wayfare_store_sqlite::SqliteStore;

  use super::*;

  async fn app(policy: DispatchPolicy) -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store), policy)
  }

  async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    actor: Option<i64>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = actor {
      builder = builder.header(actor::USER_ID_HEADER, id.to_string());
    }
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
  }

  async fn create_ride(app: &Router, rider: i64) -> String {
    let (status, ride) = send(
      app,
      "POST",
      "/rides",
      None,
      Some(json!({
        "rider_id": rider,
        "pickup_location": "Central Station",
        "dropoff_location": "Airport",
        "current_latitude": 12.345678,
        "current_longitude": 23.456789,
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ride["status"], "pending");
    assert_eq!(ride["driver_id"], Value::Null);
    ride["ride_id"].as_str().unwrap().to_owned()
  }

  async fn report(app: &Router, user: i64, role: &str, lat: f64, lon: f64) {
    let (status, _) = send(
      app,
      "POST",
      "/locations",
      None,
      Some(json!({ "user_id": user, "role": role, "latitude": lat, "longitude": lon })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
  }

  // ── Lifecycle ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn full_lifecycle_binds_the_accepting_driver() {
    let app = app(DispatchPolicy::default()).await;
    let id = create_ride(&app, 1).await;

    let (status, ride) = send(&app, "POST", &format!("/rides/{id}/accept"), Some(7), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ride["status"], "accepted");
    assert_eq!(ride["driver_id"], 7);

    let (_, ride) = send(&app, "POST", &format!("/rides/{id}/start"), None, None).await;
    assert_eq!(ride["status"], "started");
    let (_, ride) = send(&app, "POST", &format!("/rides/{id}/complete"), None, None).await;
    assert_eq!(ride["status"], "completed");

    let (status, body) = send(&app, "POST", &format!("/rides/{id}/accept"), Some(8), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("not in a pending state"));

    let (_, ride) = send(&app, "GET", &format!("/rides/{id}"), None, None).await;
    assert_eq!(ride["status"], "completed");
    assert_eq!(ride["driver_id"], 7);
  }

  #[tokio::test]
  async fn accept_without_identity_is_unauthorized() {
    let app = app(DispatchPolicy::default()).await;
    let id = create_ride(&app, 1).await;

    let (status, body) = send(&app, "POST", &format!("/rides/{id}/accept"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (_, ride) = send(&app, "GET", &format!("/rides/{id}"), None, None).await;
    assert_eq!(ride["status"], "pending");
  }

  #[tokio::test]
  async fn strict_guard_refuses_start_from_pending() {
    let app = app(DispatchPolicy::default()).await;
    let id = create_ride(&app, 1).await;

    let (status, _) = send(&app, "POST", &format!("/rides/{id}/start"), None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn lenient_guard_allows_start_from_pending() {
    let policy = DispatchPolicy { guard: GuardPolicy::Lenient, ..DispatchPolicy::default() };
    let app = app(policy).await;
    let id = create_ride(&app, 1).await;

    let (status, ride) = send(&app, "POST", &format!("/rides/{id}/start"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ride["status"], "started");
    let (_, ride) = send(&app, "POST", &format!("/rides/{id}/complete"), None, None).await;
    assert_eq!(ride["status"], "completed");
  }

  #[tokio::test]
  async fn unknown_ride_is_not_found() {
    let app = app(DispatchPolicy::default()).await;
    let id = uuid::Uuid::new_v4();

    for (method, uri) in [
      ("GET", format!("/rides/{id}")),
      ("POST", format!("/rides/{id}/cancel")),
      ("GET", format!("/rides/{id}/locations")),
      ("DELETE", format!("/rides/{id}")),
    ] {
      let (status, _) = send(&app, method, &uri, None, None).await;
      assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
    }
  }

  // ── Create / patch / list ───────────────────────────────────────────────────

  #[tokio::test]
  async fn create_ignores_supplied_driver() {
    let app = app(DispatchPolicy::default()).await;
    let (status, ride) = send(
      &app,
      "POST",
      "/rides",
      None,
      Some(json!({
        "rider_id": 1,
        "driver_id": 9,
        "pickup_location": "A",
        "dropoff_location": "B",
        "current_latitude": 0.0,
        "current_longitude": 0.0,
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ride["status"], "pending");
    assert_eq!(ride["driver_id"], Value::Null);

    let id = ride["ride_id"].as_str().unwrap();
    let (status, ride) = send(&app, "POST", &format!("/rides/{id}/accept"), Some(7), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ride["driver_id"], 7);
  }

  #[tokio::test]
  async fn patch_cannot_touch_status() {
    let app = app(DispatchPolicy::default()).await;
    let id = create_ride(&app, 1).await;

    let (status, _) =
      send(&app, "PATCH", &format!("/rides/{id}"), None, Some(json!({ "status": "completed" })))
        .await;
    assert!(status.is_client_error());

    let (_, ride) = send(&app, "GET", &format!("/rides/{id}"), None, None).await;
    assert_eq!(ride["status"], "pending");
  }

  #[tokio::test]
  async fn list_hides_cancelled_unless_asked() {
    let app = app(DispatchPolicy::default()).await;
    let kept = create_ride(&app, 1).await;
    let dropped = create_ride(&app, 2).await;
    send(&app, "POST", &format!("/rides/{dropped}/cancel"), None, None).await;

    let (_, rides) = send(&app, "GET", "/rides", None, None).await;
    let ids: Vec<_> = rides.as_array().unwrap().iter().map(|r| r["ride_id"].clone()).collect();
    assert_eq!(ids, vec![json!(kept)]);

    let (_, rides) = send(&app, "GET", "/rides?status=cancelled", None, None).await;
    assert_eq!(rides[0]["ride_id"], json!(dropped));

    let (status, _) = send(&app, "GET", "/rides?status=lost", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn delete_removes_ride() {
    let app = app(DispatchPolicy::default()).await;
    let id = create_ride(&app, 1).await;

    let (status, _) = send(&app, "DELETE", &format!("/rides/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/rides/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Trail ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn trail_records_each_coordinate_change() {
    let app = app(DispatchPolicy::default()).await;
    let id = create_ride(&app, 1).await;

    let (status, body) = send(&app, "GET", &format!("/rides/{id}/locations"), None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no locations recorded"));

    let uri = format!("/rides/{id}");
    send(&app, "PATCH", &uri, None, Some(json!({ "current_latitude": 12.1, "current_longitude": 23.1 })))
      .await;
    send(&app, "PATCH", &uri, None, Some(json!({ "pickup_location": "Harbour" }))).await;
    let (status, ride) =
      send(&app, "PATCH", &uri, None, Some(json!({ "current_latitude": 12.2 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ride["pickup_location"], "Harbour");

    let (status, pairs) = send(&app, "GET", &format!("/rides/{id}/locations"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pairs, json!([[12.1, 23.1], [12.2, 23.1]]));

    let (_, trail) = send(&app, "GET", &format!("/rides/{id}/trail"), None, None).await;
    assert_eq!(trail["samples"].as_array().unwrap().len(), 2);
    assert_eq!(trail["samples"][1]["latitude"], 12.2);
  }

  // ── Locations / matching ────────────────────────────────────────────────────

  #[tokio::test]
  async fn available_drivers_skips_far_and_engaged_drivers() {
    let app = app(DispatchPolicy::default()).await;
    report(&app, 1, "rider", 12.345678, 23.456789).await;
    report(&app, 101, "driver", 12.36, 23.47).await;
    report(&app, 102, "driver", 12.50, 23.60).await;
    report(&app, 103, "d", 12.346, 23.457).await;

    let id = create_ride(&app, 2).await;
    let (status, _) = send(&app, "POST", &format!("/rides/{id}/accept"), Some(103), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, drivers) = send(&app, "GET", "/locations/1/available_drivers", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let drivers = drivers.as_array().unwrap();
    assert_eq!(drivers.len(), 1);
    assert_eq!(drivers[0]["driver"], 101);
    let distance = drivers[0]["distance"].as_f64().unwrap();
    assert!(distance > 0.0 && distance < 5.0, "distance {distance}");
  }

  #[tokio::test]
  async fn role_code_field_keeps_riders_out_of_driver_results() {
    let app = app(DispatchPolicy::default()).await;
    report(&app, 1, "rider", 12.345678, 23.456789).await;

    let (status, loc) = send(
      &app,
      "POST",
      "/locations",
      None,
      Some(json!({ "user_id": 5, "driver_or_rider": "r", "latitude": 12.346678, "longitude": 23.457789 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loc["role"], "rider");

    let (_, drivers) = send(&app, "GET", "/locations/1/available_drivers", None, None).await;
    assert_eq!(drivers, json!([]));

    let (status, loc) =
      send(&app, "PATCH", "/locations/5", None, Some(json!({ "driver_or_rider": "d" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loc["role"], "driver");
    let (_, drivers) = send(&app, "GET", "/locations/1/available_drivers", None, None).await;
    assert_eq!(drivers[0]["driver"], 5);
  }

  #[tokio::test]
  async fn report_rejects_unknown_fields() {
    let app = app(DispatchPolicy::default()).await;
    let (status, _) = send(
      &app,
      "POST",
      "/locations",
      None,
      Some(json!({ "user_id": 5, "kind": "rider", "latitude": 1.0, "longitude": 2.0 })),
    )
    .await;
    assert!(status.is_client_error());

    let (status, _) = send(&app, "GET", "/locations/5", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn available_drivers_for_unknown_rider_is_not_found() {
    let app = app(DispatchPolicy::default()).await;
    let (status, _) = send(&app, "GET", "/locations/42/available_drivers", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn location_report_overwrites_and_patches() {
    let app = app(DispatchPolicy::default()).await;
    report(&app, 5, "rider", 1.0, 2.0).await;
    report(&app, 5, "rider", 3.0, 4.0).await;

    let (_, loc) = send(&app, "GET", "/locations/5", None, None).await;
    assert_eq!(loc["latitude"], 3.0);
    assert_eq!(loc["role"], "rider");

    let (status, loc) =
      send(&app, "PATCH", "/locations/5", None, Some(json!({ "role": "driver" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loc["role"], "driver");
    assert_eq!(loc["longitude"], 4.0);

    let (status, _) = send(&app, "GET", "/locations/6", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "POST", "/locations", None, Some(json!({
      "user_id": 6, "role": "rider", "latitude": 91.0, "longitude": 0.0
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }
}
