//! Rides and their lifecycle state machine.
//!
//! A ride is created `pending` with no driver and moves through the guarded
//! transitions below. `completed` and `cancelled` are terminal.
//!
//! | from | transition | to |
//! |------|------------|----|
//! | `pending` | accept | `accepted` (binds the driver) |
//! | `accepted` | start | `started` |
//! | `started` | complete | `completed` |
//! | `pending`, `accepted`, `started` | cancel | `cancelled` |
//!
//! The functions here are pure; a [`crate::store::RideStore`] is responsible
//! for running them inside a single atomic read-modify-write.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  geo::{Degrees6, FixedCoordinate},
  user::UserId,
};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
  Pending,
  Accepted,
  Started,
  Completed,
  Cancelled,
}

impl RideStatus {
  pub const ALL: [RideStatus; 5] = [
    Self::Pending,
    Self::Accepted,
    Self::Started,
    Self::Completed,
    Self::Cancelled,
  ];

  /// Statuses returned by ride listings unless a caller asks otherwise.
  pub const LISTED: [RideStatus; 4] =
    [Self::Pending, Self::Accepted, Self::Started, Self::Completed];

  pub fn is_terminal(self) -> bool { matches!(self, Self::Completed | Self::Cancelled) }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Accepted => "accepted",
      Self::Started => "started",
      Self::Completed => "completed",
      Self::Cancelled => "cancelled",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|status| status.as_str() == s)
  }
}

impl fmt::Display for RideStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// A named lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
  Accept,
  Start,
  Complete,
  Cancel,
}

impl Transition {
  /// The status a ride ends up in after this transition.
  pub fn target(self) -> RideStatus {
    match self {
      Self::Accept => RideStatus::Accepted,
      Self::Start => RideStatus::Started,
      Self::Complete => RideStatus::Completed,
      Self::Cancel => RideStatus::Cancelled,
    }
  }

  /// Whether the strict guard table allows this transition from `from`.
  pub fn allowed_from(self, from: RideStatus) -> bool {
    match self {
      Self::Accept => from == RideStatus::Pending,
      Self::Start => from == RideStatus::Accepted,
      Self::Complete => from == RideStatus::Started,
      Self::Cancel => !from.is_terminal(),
    }
  }

  /// Caller-facing explanation of why the transition was refused.
  pub fn refusal(self, from: RideStatus) -> String {
    match self {
      Self::Accept => format!("ride is not in a pending state (status: {from})"),
      Self::Start => format!("ride must be accepted to start (status: {from})"),
      Self::Complete => format!("ride must be started to complete (status: {from})"),
      Self::Cancel => format!("ride is already {from}"),
    }
  }
}

impl fmt::Display for Transition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Accept => "accept",
      Self::Start => "start",
      Self::Complete => "complete",
      Self::Cancel => "cancel",
    })
  }
}

/// How strictly transitions are guarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardPolicy {
  /// Every transition is checked against the guard table.
  #[default]
  Strict,
  /// Only `accept` is guarded; `start`, `complete` and `cancel` apply from
  /// any status, terminal ones included.
  Lenient,
}

impl GuardPolicy {
  pub fn permits(self, transition: Transition, from: RideStatus) -> bool {
    match self {
      Self::Strict => transition.allowed_from(from),
      Self::Lenient => {
        transition != Transition::Accept || transition.allowed_from(from)
      }
    }
  }
}

// ─── Ride ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
  pub ride_id:          Uuid,
  pub rider_id:         UserId,
  /// Unset while `pending`; bound by [`Transition::Accept`].
  pub driver_id:        Option<UserId>,
  pub pickup_location:  String,
  pub dropoff_location: String,
  pub status:           RideStatus,
  pub current:          FixedCoordinate,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

impl Ride {
  /// Build a freshly requested ride.
  pub fn new(input: NewRide, now: DateTime<Utc>) -> Result<Self> {
    input.validate()?;
    Ok(Self {
      ride_id: Uuid::new_v4(),
      rider_id: input.rider_id,
      driver_id: None,
      pickup_location: input.pickup_location,
      dropoff_location: input.dropoff_location,
      status: RideStatus::Pending,
      current: input.current,
      created_at: now,
      updated_at: now,
    })
  }

  /// Apply a lifecycle transition in place.
  ///
  /// `actor` is the identity of the caller; it is required for
  /// [`Transition::Accept`], where it becomes the ride's driver. On error the
  /// ride is left untouched.
  pub fn apply(
    &mut self,
    transition: Transition,
    actor: Option<UserId>,
    guard: GuardPolicy,
    now: DateTime<Utc>,
  ) -> Result<()> {
    if !guard.permits(transition, self.status) {
      return Err(Error::InvalidTransition {
        ride_id: self.ride_id,
        from: self.status,
        transition,
      });
    }

    if transition == Transition::Accept {
      let driver = actor.ok_or_else(|| {
        Error::validation("accepting a ride requires the driver's identity")
      })?;
      self.driver_id = Some(driver);
    }

    self.status = transition.target();
    self.updated_at = now;
    Ok(())
  }

  /// Apply a field patch in place.
  ///
  /// Returns the new coordinate when (and only when) it differs from the one
  /// stored before the patch; the caller must append it to the ride's trail
  /// in the same atomic unit as persisting the ride.
  pub fn apply_patch(
    &mut self,
    patch: RidePatch,
    now: DateTime<Utc>,
  ) -> Result<Option<FixedCoordinate>> {
    patch.validate()?;

    if let Some(pickup) = patch.pickup_location {
      self.pickup_location = pickup;
    }
    if let Some(dropoff) = patch.dropoff_location {
      self.dropoff_location = dropoff;
    }

    let next = FixedCoordinate {
      latitude:  patch.current_latitude.unwrap_or(self.current.latitude),
      longitude: patch.current_longitude.unwrap_or(self.current.longitude),
    };
    let moved = (next != self.current).then_some(next);
    self.current = next;
    self.updated_at = now;

    Ok(moved)
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::RideStore::create_ride`].
#[derive(Debug, Clone)]
pub struct NewRide {
  pub rider_id:         UserId,
  pub pickup_location:  String,
  pub dropoff_location: String,
  pub current:          FixedCoordinate,
}

impl NewRide {
  pub fn validate(&self) -> Result<()> {
    check_place("pickup_location", &self.pickup_location)?;
    check_place("dropoff_location", &self.dropoff_location)?;
    check_fixed(self.current)
  }
}

/// A partial update to a ride's mutable fields.
///
/// Status and driver are absent: they change only through
/// [`Transition`]s.
#[derive(Debug, Clone, Default)]
pub struct RidePatch {
  pub pickup_location:   Option<String>,
  pub dropoff_location:  Option<String>,
  pub current_latitude:  Option<Degrees6>,
  pub current_longitude: Option<Degrees6>,
}

impl RidePatch {
  /// Patch only the coordinate.
  pub fn coordinate(current: FixedCoordinate) -> Self {
    Self {
      current_latitude: Some(current.latitude),
      current_longitude: Some(current.longitude),
      ..Self::default()
    }
  }

  pub fn validate(&self) -> Result<()> {
    if let Some(pickup) = &self.pickup_location {
      check_place("pickup_location", pickup)?;
    }
    if let Some(dropoff) = &self.dropoff_location {
      check_place("dropoff_location", dropoff)?;
    }
    if let Some(lat) = self.current_latitude {
      lat.check_latitude()?;
    }
    if let Some(lon) = self.current_longitude {
      lon.check_longitude()?;
    }
    Ok(())
  }
}

const MAX_PLACE_LEN: usize = 255;

fn check_place(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::validation(format!("{field} must not be empty")));
  }
  if value.chars().count() > MAX_PLACE_LEN {
    return Err(Error::validation(format!(
      "{field} must be at most {MAX_PLACE_LEN} characters"
    )));
  }
  Ok(())
}

fn check_fixed(c: FixedCoordinate) -> Result<()> {
  c.latitude.check_latitude()?;
  c.longitude.check_longitude()?;
  Ok(())
}
