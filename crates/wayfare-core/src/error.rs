//! Error types for `wayfare-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{
  ride::{RideStatus, Transition},
  user::UserId,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("ride not found: {0}")]
  RideNotFound(Uuid),

  #[error("no location reported for user {0}")]
  LocationNotFound(UserId),

  /// A lifecycle operation was refused by the guard table. Nothing was
  /// written.
  #[error("cannot {transition} ride {ride_id}: {}", transition.refusal(*from))]
  InvalidTransition {
    ride_id:    Uuid,
    from:       RideStatus,
    transition: Transition,
  },

  #[error("invalid input: {0}")]
  Validation(String),

  #[error("there are no locations recorded for ride {0}")]
  NoLocationsRecorded(Uuid),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }

  /// Whether the error names a missing ride or location.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::RideNotFound(_) | Self::LocationNotFound(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Implemented by backend error types so that callers can recover the domain
/// condition (if any) behind a storage failure.
///
/// Backends wrap [`Error`] in their own error enum; anything that is not a
/// domain condition (I/O, corruption, a closed connection) returns `None`.
pub trait DomainError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&Error>;
}

impl DomainError for Error {
  fn domain(&self) -> Option<&Error> { Some(self) }
}
