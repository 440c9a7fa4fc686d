//! Error type for `wayfare-store-sqlite`.

use thiserror::Error;
use wayfare_core::DomainError;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] wayfare_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value that no domain type maps to.
  #[error("corrupt {column} value: {value:?}")]
  Corrupt { column: &'static str, value: String },
}

impl DomainError for Error {
  fn domain(&self) -> Option<&wayfare_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
