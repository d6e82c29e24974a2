// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bearer-session extractors.
//!
//! Login hands the client an opaque token; requests carry it as
//! `Authorization: Bearer <token>`. Only the SHA-256 hash is ever compared
//! against storage.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};

use crate::api::AppState;
use crate::error::ServerError;
use vanish_server_auth::{session_token_hash, User};

/// Extractor that rejects the request unless a live session is presented.
pub struct RequireAuth(pub User);

/// Extractor that resolves the caller when a live session is presented and
/// yields `None` otherwise. Used on endpoints that accept anonymous callers.
pub struct OptionalAuth(pub Option<User>);

fn bearer_token(parts: &Parts) -> Option<&str> {
	parts
		.headers
		.get(header::AUTHORIZATION)?
		.to_str()
		.ok()?
		.strip_prefix("Bearer ")
}

impl FromRequestParts<AppState> for RequireAuth {
	type Rejection = ServerError;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		let token = bearer_token(parts)
			.ok_or_else(|| ServerError::Unauthorized("Missing bearer token".to_string()))?;

		let user = state
			.sessions
			.resolve_token(&session_token_hash(token))
			.await?
			.ok_or_else(|| ServerError::Unauthorized("Invalid or expired session".to_string()))?;

		Ok(RequireAuth(user))
	}
}

impl FromRequestParts<AppState> for OptionalAuth {
	type Rejection = ServerError;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		let Some(token) = bearer_token(parts) else {
			return Ok(OptionalAuth(None));
		};

		// A stale token on an anonymous-capable endpoint degrades to
		// anonymous rather than failing the request.
		let user = state
			.sessions
			.resolve_token(&session_token_hash(token))
			.await?;

		Ok(OptionalAuth(user))
	}
}
