// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit log read handlers. Admin only.

use axum::{
	extract::{Path, Query, State},
	Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::AppState;
use crate::auth_middleware::RequireAuth;
use crate::error::ServerError;
use crate::pagination::PaginationParams;
use vanish_server_auth::{SecretId, User};
use vanish_server_db::SecretLogEntry;

#[derive(Debug, Serialize, ToSchema)]
pub struct LogEntryResponse {
	pub uuid: Uuid,
	pub secret_id: Uuid,
	pub action: String,
	pub timestamp: DateTime<Utc>,
}

impl LogEntryResponse {
	fn from_entry(entry: &SecretLogEntry) -> Self {
		Self {
			uuid: entry.id.into_inner(),
			secret_id: entry.secret_id.into_inner(),
			action: entry.action.to_string(),
			timestamp: entry.timestamp,
		}
	}
}

fn require_admin(user: &User) -> Result<(), ServerError> {
	if user.is_admin {
		Ok(())
	} else {
		Err(ServerError::Forbidden(
			"Administrator access required".to_string(),
		))
	}
}

#[utoipa::path(
    get,
    path = "/secrets/logs",
    params(PaginationParams),
    responses(
        (status = 200, description = "Audit entries across all secrets", body = [LogEntryResponse]),
        (status = 403, description = "Administrator access required", body = crate::error::ErrorResponse)
    ),
    tag = "secrets-logs"
)]
/// GET /secrets/logs - List the audit trail across all secrets.
pub async fn list_all_logs(
	State(state): State<AppState>,
	RequireAuth(user): RequireAuth,
	Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<LogEntryResponse>>, ServerError> {
	require_admin(&user)?;

	let entries = state
		.secret_logs
		.list_all(params.limit_clamped(10, 100), params.skip_or_default())
		.await?;

	Ok(Json(entries.iter().map(LogEntryResponse::from_entry).collect()))
}

#[utoipa::path(
    get,
    path = "/secrets/logs/{id}",
    params(
        ("id" = String, Path, description = "Secret UUID"),
        PaginationParams
    ),
    responses(
        (status = 200, description = "Audit entries for one secret, oldest first", body = [LogEntryResponse]),
        (status = 403, description = "Administrator access required", body = crate::error::ErrorResponse)
    ),
    tag = "secrets-logs"
)]
/// GET /secrets/logs/{id} - List the audit trail for one secret.
pub async fn list_secret_logs(
	State(state): State<AppState>,
	RequireAuth(user): RequireAuth,
	Path(id): Path<Uuid>,
	Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<LogEntryResponse>>, ServerError> {
	require_admin(&user)?;

	let entries = state
		.secret_logs
		.list_for_secret(
			&SecretId::new(id),
			params.limit_clamped(10, 100),
			params.skip_or_default(),
		)
		.await?;

	Ok(Json(entries.iter().map(LogEntryResponse::from_entry).collect()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::api::{create_app_state, create_router};
	use axum::body::Body;
	use axum::http::{header, Request, StatusCode};
	use tower::util::ServiceExt;
	use vanish_server_auth::{generate_session_token, session_token_hash};
	use vanish_server_db::testing::{create_test_pool, insert_test_user};

	async fn login_token(state: &crate::api::AppState, user: &User) -> String {
		let token = generate_session_token();
		state
			.sessions
			.create_session(
				&user.id,
				&session_token_hash(&token),
				Utc::now() + chrono::Duration::hours(1),
			)
			.await
			.unwrap();
		token
	}

	#[tokio::test]
	async fn test_logs_require_admin() {
		let pool = create_test_pool().await;
		let state = create_app_state(pool.clone());
		let app = create_router(state.clone());

		let admin = insert_test_user(&pool, "big_boss", "password", true).await;
		let mortal = insert_test_user(&pool, "alice", "password", false).await;
		let admin_token = login_token(&state, &admin).await;
		let mortal_token = login_token(&state, &mortal).await;

		state
			.service
			.create_from_text(None, "s".to_string(), "pw", None, None)
			.await
			.unwrap();

		let response = app
			.clone()
			.oneshot(
				Request::builder()
					.uri("/secrets/logs")
					.header(header::AUTHORIZATION, format!("Bearer {mortal_token}"))
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::FORBIDDEN);

		let response = app
			.oneshot(
				Request::builder()
					.uri("/secrets/logs")
					.header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let entries: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
		assert_eq!(entries.as_array().unwrap().len(), 1);
		assert_eq!(entries[0]["action"], "create");
	}

	#[tokio::test]
	async fn test_per_secret_log_ordering() {
		let pool = create_test_pool().await;
		let state = create_app_state(pool.clone());
		let app = create_router(state.clone());

		let admin = insert_test_user(&pool, "big_boss", "password", true).await;
		let token = login_token(&state, &admin).await;

		let metadata = state
			.service
			.create_from_text(None, "once".to_string(), "pw", Some(1), None)
			.await
			.unwrap();
		state
			.service
			.redeem(&SecretId::new(metadata.uuid), "pw")
			.await
			.unwrap();

		let response = app
			.oneshot(
				Request::builder()
					.uri(format!("/secrets/logs/{}", metadata.uuid))
					.header(header::AUTHORIZATION, format!("Bearer {token}"))
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let entries: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
		let actions: Vec<&str> = entries
			.as_array()
			.unwrap()
			.iter()
			.map(|e| e["action"].as_str().unwrap())
			.collect();
		assert_eq!(actions, vec!["create", "get", "expire"]);
	}
}
