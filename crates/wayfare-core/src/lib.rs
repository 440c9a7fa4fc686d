//! Core types and trait definitions for the Wayfare ride service.
//!
//! This crate has no HTTP or database dependencies.
//! Storage backends implement [`store::RideStore`]; the API layer depends on
//! that abstraction only.

// Store futures spell out their `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod dispatch;
pub mod error;
pub mod geo;
pub mod location;
pub mod ride;
pub mod store;
pub mod trail;
pub mod user;

pub use error::{DomainError, Error, Result};
