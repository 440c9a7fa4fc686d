//! The `RideStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `wayfare-store-sqlite`).
//! Higher layers (`wayfare-api`, the matcher in [`crate::dispatch`]) depend on
//! this abstraction, not on any concrete backend.
//!
//! Backends must make every write below a single atomic unit: a transition
//! reads, validates and writes the status as one step, and a ride patch that
//! moves the coordinate persists the ride and appends to its trail as one
//! step, serialised per ride.

use std::{collections::HashSet, future::Future};

use uuid::Uuid;

use crate::{
  DomainError,
  geo::Coordinate,
  location::{LocationPatch, LocationReport, Role, UserLocation},
  ride::{GuardPolicy, NewRide, Ride, RidePatch, RideStatus, Transition},
  trail::LocationTrail,
  user::UserId,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RideStore::list_rides`].
#[derive(Debug, Clone)]
pub struct RideQuery {
  /// Only rides in one of these statuses are returned.
  pub statuses: Vec<RideStatus>,
  pub rider_id: Option<UserId>,
}

impl Default for RideQuery {
  fn default() -> Self {
    Self { statuses: RideStatus::LISTED.to_vec(), rider_id: None }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Wayfare storage backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RideStore: Send + Sync {
  type Error: DomainError + From<crate::Error>;

  // ── Rides ─────────────────────────────────────────────────────────────

  /// Persist a new `pending` ride with no driver.
  fn create_ride(
    &self,
    input: NewRide,
  ) -> impl Future<Output = Result<Ride, Self::Error>> + Send + '_;

  /// Retrieve a ride by id. Returns `None` if not found.
  fn get_ride(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Ride>, Self::Error>> + Send + '_;

  /// List rides matching `query` in creation order.
  fn list_rides<'a>(
    &'a self,
    query: &'a RideQuery,
  ) -> impl Future<Output = Result<Vec<Ride>, Self::Error>> + Send + 'a;

  /// Apply a field patch. If the coordinate changes, the new value is
  /// appended to the ride's trail in the same atomic unit.
  ///
  /// Fails with [`crate::Error::RideNotFound`] for unknown rides.
  fn update_ride(
    &self,
    id: Uuid,
    patch: RidePatch,
  ) -> impl Future<Output = Result<Ride, Self::Error>> + Send + '_;

  /// Run a lifecycle transition as one atomic read-validate-write.
  ///
  /// Fails with [`crate::Error::InvalidTransition`] (and writes nothing) if
  /// `guard` refuses it.
  fn transition(
    &self,
    id: Uuid,
    transition: Transition,
    actor: Option<UserId>,
    guard: GuardPolicy,
  ) -> impl Future<Output = Result<Ride, Self::Error>> + Send + '_;

  /// Remove a ride together with its trail. Returns `false` if the ride did
  /// not exist.
  fn delete_ride(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Ids of drivers bound to rides whose status is in `engaged`.
  fn engaged_driver_ids<'a>(
    &'a self,
    engaged: &'a [RideStatus],
  ) -> impl Future<Output = Result<HashSet<UserId>, Self::Error>> + Send + 'a;

  // ── Trails ────────────────────────────────────────────────────────────

  /// Return the ride's trail, or `None` if nothing has been recorded yet.
  fn get_trail(
    &self,
    ride_id: Uuid,
  ) -> impl Future<Output = Result<Option<LocationTrail>, Self::Error>> + Send + '_;

  // ── Location registry ─────────────────────────────────────────────────

  /// Create or overwrite the reporting user's location (last write wins).
  fn report_location(
    &self,
    report: LocationReport,
  ) -> impl Future<Output = Result<UserLocation, Self::Error>> + Send + '_;

  /// Retrieve a user's location. Returns `None` if never reported.
  fn get_location(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Option<UserLocation>, Self::Error>> + Send + '_;

  /// Partially update an existing location.
  ///
  /// Fails with [`crate::Error::LocationNotFound`] if the user never
  /// reported.
  fn update_location(
    &self,
    user_id: UserId,
    patch: LocationPatch,
  ) -> impl Future<Output = Result<UserLocation, Self::Error>> + Send + '_;

  /// A point-in-time snapshot of every location tagged with `role`, in a
  /// stable order.
  fn list_locations(
    &self,
    role: Role,
  ) -> impl Future<Output = Result<Vec<UserLocation>, Self::Error>> + Send + '_;

  /// Drivers that may lie within `radius_km` of `origin`.
  ///
  /// The result may contain drivers further away (callers filter by exact
  /// distance) but must never omit one that is inside the radius. The default
  /// is a full scan; backends with a spatial index should override it.
  fn candidate_drivers(
    &self,
    origin: Coordinate,
    radius_km: f64,
  ) -> impl Future<Output = Result<Vec<UserLocation>, Self::Error>> + Send + '_ {
    let _ = (origin, radius_km);
    self.list_locations(Role::Driver)
  }
}
