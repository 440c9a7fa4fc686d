//! Geographic primitives: coordinates, fixed-precision degrees and the
//! Haversine great-circle distance.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Mean Earth radius used by every distance computation, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const MICROS_PER_DEGREE: f64 = 1_000_000.0;

// ─── Coordinate ──────────────────────────────────────────────────────────────

/// A floating-point latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
  pub latitude:  f64,
  pub longitude: f64,
}

impl Coordinate {
  /// Build a coordinate, rejecting non-finite or out-of-range values.
  pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
    check_latitude(latitude)?;
    check_longitude(longitude)?;
    Ok(Self { latitude, longitude })
  }

  /// Great-circle distance to `other` in kilometres.
  pub fn distance_km(&self, other: &Coordinate) -> f64 {
    haversine_km(*self, *other)
  }
}

/// Great-circle distance between two points on a sphere of radius
/// [`EARTH_RADIUS_KM`].
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
  let phi1 = a.latitude.to_radians();
  let phi2 = b.latitude.to_radians();
  let delta_phi = (b.latitude - a.latitude).to_radians();
  let delta_lambda = (b.longitude - a.longitude).to_radians();

  let h = (delta_phi / 2.0).sin().powi(2)
    + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
  let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
  EARTH_RADIUS_KM * c
}

/// An axis-aligned latitude/longitude box that is guaranteed to contain
/// every point within `radius_km` of a centre.
///
/// `longitude` is `None` when the box would wrap the antimeridian or touch a
/// pole; callers must then skip the longitude bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  pub latitude:  (f64, f64),
  pub longitude: Option<(f64, f64)>,
}

impl BoundingBox {
  pub fn around(center: Coordinate, radius_km: f64) -> Self {
    let angular = radius_km / EARTH_RADIUS_KM;
    let lat_delta = angular.to_degrees();
    let min_lat = center.latitude - lat_delta;
    let max_lat = center.latitude + lat_delta;

    if min_lat <= -90.0 || max_lat >= 90.0 {
      return Self {
        latitude:  (min_lat.max(-90.0), max_lat.min(90.0)),
        longitude: None,
      };
    }

    let ratio = angular.sin() / center.latitude.to_radians().cos();
    if ratio >= 1.0 {
      return Self { latitude: (min_lat, max_lat), longitude: None };
    }
    let lon_delta = ratio.asin().to_degrees();
    let min_lon = center.longitude - lon_delta;
    let max_lon = center.longitude + lon_delta;

    let longitude = if min_lon < -180.0 || max_lon > 180.0 {
      None
    } else {
      Some((min_lon, max_lon))
    };

    Self { latitude: (min_lat, max_lat), longitude }
  }
}

fn check_latitude(value: f64) -> Result<()> {
  if value.is_finite() && (-90.0..=90.0).contains(&value) {
    Ok(())
  } else {
    Err(Error::validation(format!("latitude out of range: {value}")))
  }
}

fn check_longitude(value: f64) -> Result<()> {
  if value.is_finite() && (-180.0..=180.0).contains(&value) {
    Ok(())
  } else {
    Err(Error::validation(format!("longitude out of range: {value}")))
  }
}

// ─── Degrees6 ────────────────────────────────────────────────────────────────

/// An angle in degrees stored with exactly six fractional digits.
///
/// Held as an integer count of micro-degrees so that equality is exact; two
/// inputs that round to the same sixth decimal compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Degrees6(i64);

const MAX_LATITUDE_MICROS: u64 = 90_000_000;
const MAX_LONGITUDE_MICROS: u64 = 180_000_000;

impl Degrees6 {
  pub const fn from_micros(micros: i64) -> Self { Self(micros) }

  pub fn micros(self) -> i64 { self.0 }

  pub fn to_f64(self) -> f64 { self.0 as f64 / MICROS_PER_DEGREE }

  /// Round a floating-point latitude to six decimals.
  pub fn latitude(value: f64) -> Result<Self> {
    check_latitude(value)?;
    Ok(Self::round(value))
  }

  /// Round a floating-point longitude to six decimals.
  pub fn longitude(value: f64) -> Result<Self> {
    check_longitude(value)?;
    Ok(Self::round(value))
  }

  fn round(value: f64) -> Self { Self((value * MICROS_PER_DEGREE).round() as i64) }

  /// Range-check an already fixed-point value as a latitude.
  pub fn check_latitude(self) -> Result<Self> {
    if self.0.unsigned_abs() <= MAX_LATITUDE_MICROS {
      Ok(self)
    } else {
      Err(Error::validation(format!("latitude out of range: {self}")))
    }
  }

  /// Range-check an already fixed-point value as a longitude.
  pub fn check_longitude(self) -> Result<Self> {
    if self.0.unsigned_abs() <= MAX_LONGITUDE_MICROS {
      Ok(self)
    } else {
      Err(Error::validation(format!("longitude out of range: {self}")))
    }
  }
}

impl fmt::Display for Degrees6 {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if self.0 < 0 { "-" } else { "" };
    let abs = self.0.unsigned_abs();
    write!(f, "{sign}{}.{:06}", abs / 1_000_000, abs % 1_000_000)
  }
}

impl Serialize for Degrees6 {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(self.to_f64())
  }
}

impl<'de> Deserialize<'de> for Degrees6 {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
      return Err(serde::de::Error::custom("degrees must be finite"));
    }
    Ok(Self::round(value))
  }
}

/// A fixed-precision latitude/longitude pair, as stored on a ride and in its
/// trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixedCoordinate {
  pub latitude:  Degrees6,
  pub longitude: Degrees6,
}

impl FixedCoordinate {
  pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
    Ok(Self {
      latitude:  Degrees6::latitude(latitude)?,
      longitude: Degrees6::longitude(longitude)?,
    })
  }

  pub fn to_coordinate(self) -> Coordinate {
    Coordinate {
      latitude:  self.latitude.to_f64(),
      longitude: self.longitude.to_f64(),
    }
  }
}
