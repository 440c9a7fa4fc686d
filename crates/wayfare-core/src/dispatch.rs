//! Proximity matching: which drivers can pick up a rider right now.
//!
//! Matching is nearest-available-driver-within-radius and nothing more:
//! engaged drivers are excluded, the remaining candidates are measured with
//! the Haversine formula, anything at or beyond the radius is dropped and the
//! rest are ranked nearest first.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
  Error,
  geo::{Coordinate, haversine_km},
  location::UserLocation,
  ride::{GuardPolicy, RideStatus},
  store::RideStore,
  user::UserId,
};

/// Default proximity radius, in kilometres.
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

/// Tunable dispatch behaviour, usually read from the server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchPolicy {
  /// How ride transitions are guarded.
  pub guard:            GuardPolicy,
  /// Rides in these statuses make their driver unavailable for matching.
  ///
  /// The default includes `completed`, which keeps every driver that ever
  /// finished a ride out of the pool. Narrow it to `accepted`/`started` to
  /// release drivers once their ride ends.
  pub engaged_statuses: Vec<RideStatus>,
  /// Candidates must be strictly closer than this, in kilometres.
  pub radius_km:        f64,
}

impl Default for DispatchPolicy {
  fn default() -> Self {
    Self {
      guard:            GuardPolicy::default(),
      engaged_statuses: vec![
        RideStatus::Accepted,
        RideStatus::Started,
        RideStatus::Completed,
      ],
      radius_km:        DEFAULT_RADIUS_KM,
    }
  }
}

/// A driver offered to a rider, with their distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvailableDriver {
  pub driver_id:   UserId,
  pub distance_km: f64,
}

/// Filter and rank `candidates` around `origin`.
///
/// Busy drivers and drivers at or beyond `radius_km` are dropped; the rest
/// are sorted by ascending distance. The sort is stable, so equidistant
/// drivers keep their candidate order.
pub fn rank_candidates<'a>(
  origin: Coordinate,
  candidates: impl IntoIterator<Item = &'a UserLocation>,
  busy: &HashSet<UserId>,
  radius_km: f64,
) -> Vec<AvailableDriver> {
  let mut drivers: Vec<AvailableDriver> = candidates
    .into_iter()
    .filter(|loc| !busy.contains(&loc.user_id))
    .map(|loc| AvailableDriver {
      driver_id:   loc.user_id,
      distance_km: haversine_km(origin, loc.coordinate()),
    })
    .filter(|d| d.distance_km < radius_km)
    .collect();

  drivers.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
  drivers
}

/// Drivers available to pick up `rider_id`, nearest first.
///
/// Fails with [`Error::LocationNotFound`] if the rider has never reported a
/// location. The result is consistent with some recent point in time; it is
/// not linearised against concurrent location reports.
pub async fn available_drivers<S: RideStore>(
  store: &S,
  rider_id: UserId,
  policy: &DispatchPolicy,
) -> Result<Vec<AvailableDriver>, S::Error> {
  let rider = store
    .get_location(rider_id)
    .await?
    .ok_or(Error::LocationNotFound(rider_id))?;
  let origin = rider.coordinate();

  let busy = store.engaged_driver_ids(&policy.engaged_statuses).await?;
  let candidates = store.candidate_drivers(origin, policy.radius_km).await?;

  Ok(rank_candidates(origin, &candidates, &busy, policy.radius_km))
}
