// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret lifecycle HTTP handlers.
//!
//! Creation accepts anonymous or authenticated callers; redemption needs
//! only the UUID and the password. Every redemption failure collapses to a
//! single 404 shape so callers cannot probe which secrets exist.

use axum::{
	extract::{Multipart, Path, Query, State},
	http::{header, StatusCode},
	response::{
		sse::{Event, KeepAlive, Sse},
		IntoResponse, Response,
	},
	Json,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::api::AppState;
use crate::auth_middleware::{OptionalAuth, RequireAuth};
use crate::error::ServerError;
use crate::pagination::PaginationParams;
use crate::service::{RedeemedSecret, SecretMetadata};
use vanish_server_auth::SecretId;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSecretRequest {
	/// Plaintext to protect.
	pub content: String,
	/// Redemption password; also derives the payload encryption key.
	pub password: String,
	/// Maximum number of successful redemptions. 0 or absent = unlimited.
	#[serde(default)]
	pub usage_limit: Option<u32>,
	/// Lifetime in minutes. 0 or absent = no expiry.
	#[serde(default)]
	pub duration: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RedeemParams {
	/// Redemption password.
	pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RedeemTextResponse {
	#[serde(flatten)]
	pub metadata: SecretMetadata,
	pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SecretTypeResponse {
	#[serde(rename = "type")]
	pub secret_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteSecretResponse {
	pub deleted: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CountResponse {
	pub count: u64,
}

#[utoipa::path(
    post,
    path = "/secrets",
    request_body = CreateSecretRequest,
    responses(
        (status = 201, description = "Secret created", body = SecretMetadata),
        (status = 500, description = "Internal server error", body = crate::error::ErrorResponse)
    ),
    tag = "secrets"
)]
/// POST /secrets - Create a text secret.
pub async fn create_secret(
	State(state): State<AppState>,
	OptionalAuth(caller): OptionalAuth,
	Json(req): Json<CreateSecretRequest>,
) -> Result<impl IntoResponse, ServerError> {
	let metadata = state
		.service
		.create_from_text(
			caller.as_ref(),
			req.content,
			&req.password,
			req.usage_limit,
			req.duration,
		)
		.await?;

	Ok((StatusCode::CREATED, Json(metadata)))
}

#[utoipa::path(
    post,
    path = "/secrets/file",
    responses(
        (status = 201, description = "File secret created", body = SecretMetadata),
        (status = 400, description = "Malformed multipart form", body = crate::error::ErrorResponse)
    ),
    tag = "secrets"
)]
/// POST /secrets/file - Create a file secret from a multipart form.
///
/// Expected fields: `file` (the payload), `password`, and optionally
/// `usage_limit` and `duration` as decimal strings.
pub async fn create_secret_file(
	State(state): State<AppState>,
	OptionalAuth(caller): OptionalAuth,
	mut multipart: Multipart,
) -> Result<impl IntoResponse, ServerError> {
	let mut bytes: Option<Vec<u8>> = None;
	let mut filename: Option<String> = None;
	let mut password: Option<String> = None;
	let mut usage_limit: Option<u32> = None;
	let mut duration: Option<u32> = None;

	while let Some(field) = multipart
		.next_field()
		.await
		.map_err(|e| ServerError::BadRequest(format!("Malformed multipart form: {e}")))?
	{
		let name = field.name().map(str::to_string);
		match name.as_deref() {
			Some("file") => {
				filename = field.file_name().map(str::to_string);
				let data = field
					.bytes()
					.await
					.map_err(|e| ServerError::BadRequest(format!("Unreadable file field: {e}")))?;
				bytes = Some(data.to_vec());
			}
			Some("password") => {
				password = Some(read_text_field(field).await?);
			}
			Some("usage_limit") => {
				usage_limit = Some(parse_numeric_field("usage_limit", field).await?);
			}
			Some("duration") => {
				duration = Some(parse_numeric_field("duration", field).await?);
			}
			_ => {}
		}
	}

	let bytes = bytes.ok_or_else(|| ServerError::BadRequest("Missing file field".to_string()))?;
	let password =
		password.ok_or_else(|| ServerError::BadRequest("Missing password field".to_string()))?;
	let filename = filename.unwrap_or_else(|| "secret.bin".to_string());

	let metadata = state
		.service
		.create_from_file(
			caller.as_ref(),
			bytes,
			filename,
			&password,
			usage_limit,
			duration,
		)
		.await?;

	Ok((StatusCode::CREATED, Json(metadata)))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, ServerError> {
	field
		.text()
		.await
		.map_err(|e| ServerError::BadRequest(format!("Unreadable form field: {e}")))
}

async fn parse_numeric_field(
	name: &str,
	field: axum::extract::multipart::Field<'_>,
) -> Result<u32, ServerError> {
	let text = read_text_field(field).await?;
	text.trim()
		.parse()
		.map_err(|_| ServerError::BadRequest(format!("Invalid {name}: {text}")))
}

#[utoipa::path(
    get,
    path = "/secrets/{id}",
    params(
        ("id" = String, Path, description = "Secret UUID"),
        RedeemParams
    ),
    responses(
        (status = 200, description = "Decrypted secret; JSON for text, octet-stream attachment for files"),
        (status = 404, description = "Not found, wrong password, expired, or exhausted", body = crate::error::ErrorResponse)
    ),
    tag = "secrets"
)]
/// GET /secrets/{id} - Redeem a secret with its password.
pub async fn redeem_secret(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
	Query(params): Query<RedeemParams>,
) -> Result<Response, ServerError> {
	let redeemed = state
		.service
		.redeem(&SecretId::new(id), &params.password)
		.await?;

	match redeemed {
		RedeemedSecret::Text { metadata, content } => {
			Ok(Json(RedeemTextResponse { metadata, content }).into_response())
		}
		RedeemedSecret::File { filename, bytes } => Ok((
			[
				(
					header::CONTENT_TYPE,
					"application/octet-stream".to_string(),
				),
				(
					header::CONTENT_DISPOSITION,
					format!("attachment; filename=\"{filename}\""),
				),
			],
			bytes,
		)
			.into_response()),
	}
}

#[utoipa::path(
    get,
    path = "/secrets/{id}/type",
    params(
        ("id" = String, Path, description = "Secret UUID")
    ),
    responses(
        (status = 200, description = "Content type of the secret", body = SecretTypeResponse)
    ),
    tag = "secrets"
)]
/// GET /secrets/{id}/type - Probe a secret's content type.
///
/// Reports "text" for unknown UUIDs rather than a 404.
pub async fn secret_type(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Json<SecretTypeResponse>, ServerError> {
	let secret_type = state.service.secret_type(&SecretId::new(id)).await?;
	Ok(Json(SecretTypeResponse {
		secret_type: secret_type.to_string(),
	}))
}

#[utoipa::path(
    get,
    path = "/secrets",
    params(PaginationParams),
    responses(
        (status = 200, description = "Secrets visible to the caller", body = [SecretMetadata]),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    ),
    tag = "secrets"
)]
/// GET /secrets - List secrets: admins see all, users see their own.
pub async fn list_secrets(
	State(state): State<AppState>,
	RequireAuth(user): RequireAuth,
	Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<SecretMetadata>>, ServerError> {
	let summaries = state
		.service
		.list(
			Some(&user),
			params.limit_clamped(10, 100),
			params.skip_or_default(),
		)
		.await?;

	Ok(Json(
		summaries.iter().map(SecretMetadata::from_summary).collect(),
	))
}

#[utoipa::path(
    delete,
    path = "/secrets/{id}",
    params(
        ("id" = String, Path, description = "Secret UUID")
    ),
    responses(
        (status = 200, description = "Whether a secret was deleted", body = DeleteSecretResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    ),
    tag = "secrets"
)]
/// DELETE /secrets/{id} - Delete an owned secret.
///
/// Deleting someone else's secret reports `deleted: false`, not an error.
pub async fn delete_secret(
	State(state): State<AppState>,
	RequireAuth(user): RequireAuth,
	Path(id): Path<Uuid>,
) -> Result<Json<DeleteSecretResponse>, ServerError> {
	let deleted = state.service.delete(&SecretId::new(id), &user).await?;
	Ok(Json(DeleteSecretResponse { deleted }))
}

#[utoipa::path(
    get,
    path = "/secrets/count",
    responses(
        (status = 200, description = "Current number of stored secrets", body = CountResponse)
    ),
    tag = "secrets"
)]
/// GET /secrets/count - Current number of stored secrets.
pub async fn count_secrets(
	State(state): State<AppState>,
) -> Result<Json<CountResponse>, ServerError> {
	let count = state.service.count().await?;
	Ok(Json(CountResponse { count }))
}

#[utoipa::path(
    get,
    path = "/secrets/count/stream",
    responses(
        (status = 200, description = "SSE stream emitting the secret count on every change")
    ),
    tag = "secrets"
)]
/// GET /secrets/count/stream - Live secret counter.
///
/// Emits the current count immediately and again every time the
/// broadcaster signals. Best-effort: rapid changes may coalesce.
pub async fn stream_count(
	State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
	let stream = async_stream::stream! {
		loop {
			match state.service.count().await {
				Ok(count) => {
					yield Ok::<_, Infallible>(Event::default().data(count.to_string()));
				}
				Err(e) => {
					tracing::warn!(error = %e, "secret count failed, skipping emission");
				}
			}
			state.count_broadcaster.changed().await;
		}
	};

	Sse::new(stream).keep_alive(
		KeepAlive::new()
			.interval(std::time::Duration::from_secs(15))
			.text("keep-alive"),
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::api::{create_app_state, create_router};
	use axum::body::Body;
	use axum::http::Request;
	use tower::util::ServiceExt;
	use vanish_server_db::testing::create_test_pool;

	async fn make_app() -> axum::Router {
		let pool = create_test_pool().await;
		create_router(create_app_state(pool))
	}

	async fn body_json(response: axum::response::Response) -> serde_json::Value {
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		serde_json::from_slice(&bytes).unwrap()
	}

	fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
		Request::builder()
			.method(method)
			.uri(uri)
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(body.to_string()))
			.unwrap()
	}

	#[tokio::test]
	async fn test_health_endpoint() {
		let app = make_app().await;
		let response = app
			.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
	}

	#[tokio::test]
	async fn test_create_redeem_then_exhausted() {
		let app = make_app().await;

		let response = app
			.clone()
			.oneshot(json_request(
				"POST",
				"/secrets",
				serde_json::json!({
					"content": "hello",
					"password": "pw",
					"usage_limit": 1,
					"duration": 0,
				}),
			))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::CREATED);
		let created = body_json(response).await;
		assert_eq!(created["usage_count"], 0);
		assert_eq!(created["type"], "text");
		let uuid = created["uuid"].as_str().unwrap().to_string();

		let response = app
			.clone()
			.oneshot(
				Request::builder()
					.uri(format!("/secrets/{uuid}?password=pw"))
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let redeemed = body_json(response).await;
		assert_eq!(redeemed["content"], "hello");
		assert_eq!(redeemed["usage_count"], 1);

		// The usage limit is consumed: same credentials now 404.
		let response = app
			.oneshot(
				Request::builder()
					.uri(format!("/secrets/{uuid}?password=pw"))
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_redeem_with_wrong_password_is_404() {
		let app = make_app().await;

		let response = app
			.clone()
			.oneshot(json_request(
				"POST",
				"/secrets",
				serde_json::json!({"content": "s", "password": "pw"}),
			))
			.await
			.unwrap();
		let uuid = body_json(response).await["uuid"]
			.as_str()
			.unwrap()
			.to_string();

		let response = app
			.oneshot(
				Request::builder()
					.uri(format!("/secrets/{uuid}?password=wrong"))
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_type_probe_defaults_to_text() {
		let app = make_app().await;
		let response = app
			.oneshot(
				Request::builder()
					.uri(format!("/secrets/{}/type", Uuid::new_v4()))
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(body_json(response).await["type"], "text");
	}

	#[tokio::test]
	async fn test_list_requires_authentication() {
		let app = make_app().await;
		let response = app
			.oneshot(
				Request::builder()
					.uri("/secrets")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	}

	#[tokio::test]
	async fn test_register_login_and_list_own_secrets() {
		let app = make_app().await;

		let response = app
			.clone()
			.oneshot(json_request(
				"POST",
				"/auth/register",
				serde_json::json!({"username": "alice", "password": "password"}),
			))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::CREATED);

		// Duplicate username is a distinct conflict, not a merged failure.
		let response = app
			.clone()
			.oneshot(json_request(
				"POST",
				"/auth/register",
				serde_json::json!({"username": "alice", "password": "other"}),
			))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::CONFLICT);

		let response = app
			.clone()
			.oneshot(json_request(
				"POST",
				"/auth/login",
				serde_json::json!({"username": "alice", "password": "password"}),
			))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let token = body_json(response).await["access_token"]
			.as_str()
			.unwrap()
			.to_string();

		let mut create = json_request(
			"POST",
			"/secrets",
			serde_json::json!({"content": "mine", "password": "pw"}),
		);
		create
			.headers_mut()
			.insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
		let response = app.clone().oneshot(create).await.unwrap();
		assert_eq!(response.status(), StatusCode::CREATED);

		let response = app
			.oneshot(
				Request::builder()
					.uri("/secrets")
					.header(header::AUTHORIZATION, format!("Bearer {token}"))
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let listed = body_json(response).await;
		assert_eq!(listed.as_array().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_count_endpoint() {
		let app = make_app().await;

		let response = app
			.clone()
			.oneshot(
				Request::builder()
					.uri("/secrets/count")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(body_json(response).await["count"], 0);

		app.clone()
			.oneshot(json_request(
				"POST",
				"/secrets",
				serde_json::json!({"content": "a", "password": "pw"}),
			))
			.await
			.unwrap();

		let response = app
			.oneshot(
				Request::builder()
					.uri("/secrets/count")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(body_json(response).await["count"], 1);
	}
}
