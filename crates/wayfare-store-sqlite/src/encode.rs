//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Ride coordinates are stored as integer
//! micro-degrees so that comparisons are exact.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use wayfare_core::{
  geo::{Degrees6, FixedCoordinate},
  location::{Role, UserLocation},
  ride::{Ride, RideStatus},
  trail::TrailSample,
  user::UserId,
};

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<RideStatus> {
  RideStatus::parse(s).ok_or_else(|| Error::Corrupt { column: "status", value: s.to_owned() })
}

pub fn decode_role(s: &str) -> Result<Role> {
  Role::parse(s).ok_or_else(|| Error::Corrupt { column: "role", value: s.to_owned() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawRide::from_row`].
pub const RIDE_COLUMNS: &str = "ride_id, rider_id, driver_id, pickup_location, \
  dropoff_location, status, current_lat_e6, current_lon_e6, created_at, updated_at";

/// Raw values read directly from a `rides` row.
pub struct RawRide {
  pub ride_id:          String,
  pub rider_id:         i64,
  pub driver_id:        Option<i64>,
  pub pickup_location:  String,
  pub dropoff_location: String,
  pub status:           String,
  pub lat_e6:           i64,
  pub lon_e6:           i64,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawRide {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      ride_id:          row.get(0)?,
      rider_id:         row.get(1)?,
      driver_id:        row.get(2)?,
      pickup_location:  row.get(3)?,
      dropoff_location: row.get(4)?,
      status:           row.get(5)?,
      lat_e6:           row.get(6)?,
      lon_e6:           row.get(7)?,
      created_at:       row.get(8)?,
      updated_at:       row.get(9)?,
    })
  }

  pub fn into_ride(self) -> Result<Ride> {
    Ok(Ride {
      ride_id:          decode_uuid(&self.ride_id)?,
      rider_id:         UserId(self.rider_id),
      driver_id:        self.driver_id.map(UserId),
      pickup_location:  self.pickup_location,
      dropoff_location: self.dropoff_location,
      status:           decode_status(&self.status)?,
      current:          FixedCoordinate {
        latitude:  Degrees6::from_micros(self.lat_e6),
        longitude: Degrees6::from_micros(self.lon_e6),
      },
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list matching [`RawLocation::from_row`].
pub const LOCATION_COLUMNS: &str = "user_id, role, latitude, longitude, updated_at";

/// Raw values read directly from a `user_locations` row.
pub struct RawLocation {
  pub user_id:    i64,
  pub role:       String,
  pub latitude:   f64,
  pub longitude:  f64,
  pub updated_at: String,
}

impl RawLocation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      role:       row.get(1)?,
      latitude:   row.get(2)?,
      longitude:  row.get(3)?,
      updated_at: row.get(4)?,
    })
  }

  pub fn into_location(self) -> Result<UserLocation> {
    Ok(UserLocation {
      user_id:    UserId(self.user_id),
      role:       decode_role(&self.role)?,
      latitude:   self.latitude,
      longitude:  self.longitude,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `trail_samples` row.
pub struct RawSample {
  pub lat_e6:      i64,
  pub lon_e6:      i64,
  pub recorded_at: String,
}

impl RawSample {
  pub fn into_sample(self) -> Result<TrailSample> {
    Ok(TrailSample {
      position:    FixedCoordinate {
        latitude:  Degrees6::from_micros(self.lat_e6),
        longitude: Degrees6::from_micros(self.lon_e6),
      },
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
