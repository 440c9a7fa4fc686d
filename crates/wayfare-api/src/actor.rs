//! The identity of the calling user.
//!
//! Authentication happens upstream; whatever sits in front of this API is
//! expected to put the authenticated user id in the `X-User-Id` header.

use axum::{extract::FromRequestParts, http::request::Parts};
use wayfare_core::user::UserId;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the authenticated caller. Rejects with 401 when the header
/// is missing or not an integer id.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let value = parts
      .headers
      .get(USER_ID_HEADER)
      .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;

    value
      .to_str()
      .ok()
      .and_then(|s| s.trim().parse::<i64>().ok())
      .map(|id| Actor(UserId(id)))
      .ok_or_else(|| ApiError::Unauthorized(format!("malformed {USER_ID_HEADER} header")))
  }
}
