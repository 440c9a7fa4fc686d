//! User identity as seen by the ride service.
//!
//! Who a user is, and how a request proves it, is decided by an external
//! identity provider. The core only carries the opaque numeric id.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identity of a rider or driver.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl From<i64> for UserId {
  fn from(id: i64) -> Self { Self(id) }
}
