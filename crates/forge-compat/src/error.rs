//! Library error type.

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("invalid version: {0}")]
	InvalidVersion(String),
	#[error("parsing error: {0}")]
	Parse(String),
	#[error("validation error: {0}")]
	Validation(String),
	#[error("missing entity: {0}")]
	MissingEntity(String),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
}
