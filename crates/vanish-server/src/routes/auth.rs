// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Registration and login handlers.
//!
//! Login issues an opaque bearer token; only its hash is persisted. A
//! username collision on register is a 409, surfaced distinctly, unlike
//! the merged failure causes on the secret redemption path.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::AppState;
use crate::error::ServerError;
use vanish_server_auth::{generate_session_token, session_token_hash, validate_username};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
	pub username: String,
	pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
	pub uuid: Uuid,
	pub username: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
	pub username: String,
	pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
	pub access_token: String,
	pub token_type: String,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 400, description = "Invalid username", body = crate::error::ErrorResponse),
        (status = 409, description = "Username already taken", body = crate::error::ErrorResponse)
    ),
    tag = "auth"
)]
/// POST /auth/register - Create a user account.
pub async fn register(
	State(state): State<AppState>,
	Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServerError> {
	validate_username(&req.username).map_err(|e| ServerError::BadRequest(e.to_string()))?;

	let user = state
		.users
		.create_user(&req.username, &req.password, false)
		.await?;

	tracing::info!(user_id = %user.id, "user registered");
	Ok((
		StatusCode::CREATED,
		Json(RegisterResponse {
			uuid: user.id.into_inner(),
			username: user.username,
		}),
	))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    ),
    tag = "auth"
)]
/// POST /auth/login - Exchange credentials for a bearer session token.
pub async fn login(
	State(state): State<AppState>,
	Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServerError> {
	let user = state
		.users
		.verify_credentials(&req.username, &req.password)
		.await?
		.ok_or_else(|| ServerError::Unauthorized("Invalid credentials".to_string()))?;

	let token = generate_session_token();
	let expires_at = Utc::now() + state.session_ttl;
	state
		.sessions
		.create_session(&user.id, &session_token_hash(&token), expires_at)
		.await?;

	tracing::info!(user_id = %user.id, "user logged in");
	Ok(Json(LoginResponse {
		access_token: token,
		token_type: "bearer".to_string(),
	}))
}
