//! The live location registry's records.
//!
//! Each user has at most one [`UserLocation`]; every report overwrites the
//! previous one. No history is kept here (ride history lives in the trail).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, geo::Coordinate, user::UserId};

/// Whether a user is reporting as a driver or a rider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  #[serde(alias = "d")]
  Driver,
  #[serde(alias = "r")]
  Rider,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Driver => "driver",
      Self::Rider => "rider",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "driver" | "d" => Some(Self::Driver),
      "rider" | "r" => Some(Self::Rider),
      _ => None,
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// The latest known position of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
  pub user_id:    UserId,
  pub role:       Role,
  pub latitude:   f64,
  pub longitude:  f64,
  pub updated_at: DateTime<Utc>,
}

impl UserLocation {
  pub fn coordinate(&self) -> Coordinate {
    Coordinate { latitude: self.latitude, longitude: self.longitude }
  }
}

/// Input to [`crate::store::RideStore::report_location`].
#[derive(Debug, Clone, Copy)]
pub struct LocationReport {
  pub user_id:  UserId,
  pub role:     Role,
  pub position: Coordinate,
}

impl LocationReport {
  pub fn new(user_id: UserId, role: Role, latitude: f64, longitude: f64) -> Result<Self> {
    Ok(Self { user_id, role, position: Coordinate::new(latitude, longitude)? })
  }

  pub fn into_location(self, now: DateTime<Utc>) -> UserLocation {
    UserLocation {
      user_id:    self.user_id,
      role:       self.role,
      latitude:   self.position.latitude,
      longitude:  self.position.longitude,
      updated_at: now,
    }
  }
}

/// A partial update to an existing location record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationPatch {
  pub role:      Option<Role>,
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,
}

impl LocationPatch {
  /// Merge the patch into `location`, validating the resulting coordinate
  /// before anything is changed.
  pub fn apply_to(self, location: &mut UserLocation, now: DateTime<Utc>) -> Result<()> {
    let position = Coordinate::new(
      self.latitude.unwrap_or(location.latitude),
      self.longitude.unwrap_or(location.longitude),
    )?;
    if let Some(role) = self.role {
      location.role = role;
    }
    location.latitude = position.latitude;
    location.longitude = position.longitude;
    location.updated_at = now;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn roles_accept_single_letter_codes() {
    let d: Role = serde_json::from_str("\"d\"").unwrap();
    let r: Role = serde_json::from_str("\"rider\"").unwrap();
    assert_eq!(d, Role::Driver);
    assert_eq!(r, Role::Rider);
    assert_eq!(serde_json::to_string(&Role::Driver).unwrap(), "\"driver\"");
    assert_eq!(Role::parse("r"), Some(Role::Rider));
    assert_eq!(Role::parse("x"), None);
  }

  #[test]
  fn patch_keeps_unset_fields() {
    let mut loc = LocationReport::new(UserId(3), Role::Rider, 10.0, 20.0)
      .unwrap()
      .into_location(Utc::now());
    LocationPatch { latitude: Some(11.0), ..LocationPatch::default() }
      .apply_to(&mut loc, Utc::now())
      .unwrap();
    assert_eq!(loc.latitude, 11.0);
    assert_eq!(loc.longitude, 20.0);
    assert_eq!(loc.role, Role::Rider);
  }

  #[test]
  fn invalid_patch_changes_nothing() {
    let mut loc = LocationReport::new(UserId(3), Role::Rider, 10.0, 20.0)
      .unwrap()
      .into_location(Utc::now());
    let before = loc.clone();
    let result = LocationPatch {
      role: Some(Role::Driver),
      longitude: Some(500.0),
      ..LocationPatch::default()
    }
    .apply_to(&mut loc, Utc::now());
    assert!(result.is_err());
    assert_eq!(loc, before);
  }
}
