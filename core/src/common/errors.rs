//! Unified error handling for the core

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Main error type for store operations
#[derive(Error, Debug)]
pub enum CoreError {
	/// Malformed or constraint-violating input. Never retried.
	#[error("Validation failed on `{field}`: {message}")]
	Validation { field: String, message: String },

	#[error("Not found: {0}")]
	NotFound(String),

	/// Concurrent mutation conflict. Retryable, nothing was committed.
	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Permission denied: {0}")]
	Permission(String),

	#[error("Database error: {0}")]
	Database(DbErr),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Configuration error: {0}")]
	Config(String),
}

impl CoreError {
	pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Validation {
			field: field.into(),
			message: message.into(),
		}
	}

	pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
		Self::NotFound(format!("{what} {id}"))
	}

	/// Whether the caller may retry the same request unchanged.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Conflict(_))
	}

	/// Field name for validation errors
	pub fn field(&self) -> Option<&str> {
		match self {
			Self::Validation { field, .. } => Some(field),
			_ => None,
		}
	}
}

impl From<DbErr> for CoreError {
	fn from(err: DbErr) -> Self {
		if let Some(SqlErr::UniqueConstraintViolation(msg)) = err.sql_err() {
			return Self::Conflict(format!("unique constraint violated: {msg}"));
		}

		if is_busy(&err) {
			return Self::Conflict(format!("storage busy: {err}"));
		}

		Self::Database(err)
	}
}

impl From<serde_json::Error> for CoreError {
	fn from(err: serde_json::Error) -> Self {
		Self::Config(err.to_string())
	}
}

fn is_busy(err: &DbErr) -> bool {
	let text = err.to_string().to_lowercase();
	text.contains("database is locked")
		|| text.contains("database is busy")
		|| text.contains("deadlock")
		|| text.contains("lock wait timeout")
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn busy_database_maps_to_retryable_conflict() {
		let err: CoreError = DbErr::Custom("database is locked".into()).into();
		assert!(err.is_retryable());

		let err: CoreError = DbErr::Custom("no such table: script".into()).into();
		assert!(!err.is_retryable());
		assert!(matches!(err, CoreError::Database(_)));
	}

	#[test]
	fn validation_carries_field() {
		let err = CoreError::validation("name", "must not be empty");
		assert_eq!(err.field(), Some("name"));
		assert!(!err.is_retryable());
		assert_eq!(
			err.to_string(),
			"Validation failed on `name`: must not be empty"
		);
	}
}
