// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Caller-visible error taxonomy.
//!
//! The store never raises user-facing messages; handlers and the service
//! translate internal outcomes into these variants. Redemption failures are
//! always a uniform NotFound; the caller can never tell a wrong password
//! from a missing, expired, or exhausted secret. Internal errors are logged
//! with their cause and surfaced with an opaque message.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use vanish_server_db::DbError;

/// JSON body for all error responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("Bad request: {0}")]
	BadRequest(String),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	#[error("Forbidden: {0}")]
	Forbidden(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Internal error: {0}")]
	Internal(String),
}

impl ServerError {
	fn status(&self) -> StatusCode {
		match self {
			ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
			ServerError::NotFound(_) => StatusCode::NOT_FOUND,
			ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
			ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
			ServerError::Conflict(_) => StatusCode::CONFLICT,
			ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn code(&self) -> &'static str {
		match self {
			ServerError::BadRequest(_) => "bad_request",
			ServerError::NotFound(_) => "not_found",
			ServerError::Unauthorized(_) => "unauthorized",
			ServerError::Forbidden(_) => "forbidden",
			ServerError::Conflict(_) => "conflict",
			ServerError::Internal(_) => "internal_error",
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let status = self.status();
		let code = self.code();

		// Internal causes stay in the logs; the caller gets an opaque body.
		let message = match &self {
			ServerError::Internal(cause) => {
				tracing::error!(error = %cause, "internal server error");
				"Internal Server Error".to_string()
			}
			other => other.to_string(),
		};

		(
			status,
			Json(ErrorResponse {
				error: code.to_string(),
				message,
			}),
		)
			.into_response()
	}
}

impl From<DbError> for ServerError {
	fn from(e: DbError) -> Self {
		match e {
			DbError::NotFound(msg) => ServerError::NotFound(msg),
			DbError::Conflict(msg) => ServerError::Conflict(msg),
			DbError::Unauthorized(msg) => ServerError::Unauthorized(msg),
			DbError::Sqlx(e) => ServerError::Internal(e.to_string()),
			DbError::Internal(msg) => ServerError::Internal(msg),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_mapping() {
		assert_eq!(
			ServerError::NotFound("x".into()).status(),
			StatusCode::NOT_FOUND
		);
		assert_eq!(
			ServerError::Conflict("x".into()).status(),
			StatusCode::CONFLICT
		);
		assert_eq!(
			ServerError::Unauthorized("x".into()).status(),
			StatusCode::UNAUTHORIZED
		);
		assert_eq!(
			ServerError::Internal("x".into()).status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}

	#[test]
	fn test_db_error_conversion() {
		assert!(matches!(
			ServerError::from(DbError::Conflict("dup".into())),
			ServerError::Conflict(_)
		));
		assert!(matches!(
			ServerError::from(DbError::Unauthorized("no".into())),
			ServerError::Unauthorized(_)
		));
		assert!(matches!(
			ServerError::from(DbError::Internal("boom".into())),
			ServerError::Internal(_)
		));
	}
}
