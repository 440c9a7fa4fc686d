//! A ride's location trail: the ordered, append-only history of its
//! coordinate samples.
//!
//! Trails are created lazily on the first coordinate change and destroyed
//! together with their ride. Insertion order is chronological order; the core
//! never reorders or truncates a trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, geo::FixedCoordinate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailSample {
  #[serde(flatten)]
  pub position:    FixedCoordinate,
  pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationTrail {
  pub ride_id:    Uuid,
  pub samples:    Vec<TrailSample>,
  pub updated_at: DateTime<Utc>,
}

impl LocationTrail {
  /// The samples as `(latitude, longitude)` pairs, oldest first.
  pub fn positions(&self) -> Vec<FixedCoordinate> {
    self.samples.iter().map(|s| s.position).collect()
  }

  /// Turn the result of a trail lookup into the recorded trail, treating a
  /// missing or empty trail as [`Error::NoLocationsRecorded`].
  pub fn recorded(trail: Option<Self>, ride_id: Uuid) -> Result<Self> {
    match trail {
      Some(trail) if !trail.samples.is_empty() => Ok(trail),
      _ => Err(Error::NoLocationsRecorded(ride_id)),
    }
  }
}
