// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router assembly.

use axum::{
	routing::{get, post},
	Json, Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::api_docs::ApiDoc;
use crate::notify::CountBroadcaster;
use crate::routes;
use crate::service::SecretService;
use vanish_server_db::{SecretLogRepository, SecretRepository, SessionRepository, UserRepository};

/// How long a login session stays valid.
const SESSION_TTL_HOURS: i64 = 24;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub secret_logs: Arc<SecretLogRepository>,
	pub users: Arc<UserRepository>,
	pub sessions: Arc<SessionRepository>,
	pub service: Arc<SecretService>,
	pub count_broadcaster: Arc<CountBroadcaster>,
	pub session_ttl: chrono::Duration,
}

/// Creates the application state, wiring the repositories, the lifecycle
/// engine and the count broadcaster to one pool.
pub fn create_app_state(pool: SqlitePool) -> AppState {
	let secrets = Arc::new(SecretRepository::new(pool.clone()));
	let secret_logs = Arc::new(SecretLogRepository::new(pool.clone()));
	let users = Arc::new(UserRepository::new(pool.clone()));
	let sessions = Arc::new(SessionRepository::new(pool.clone()));

	let count_broadcaster = Arc::new(CountBroadcaster::new());
	let service = Arc::new(SecretService::new(secrets, Arc::clone(&count_broadcaster)));

	AppState {
		pool,
		secret_logs,
		users,
		sessions,
		service,
		count_broadcaster,
		session_ttl: chrono::Duration::hours(SESSION_TTL_HOURS),
	}
}

/// Build the API router.
pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/auth/register", post(routes::auth::register))
		.route("/auth/login", post(routes::auth::login))
		.route(
			"/secrets",
			post(routes::secrets::create_secret).get(routes::secrets::list_secrets),
		)
		.route("/secrets/file", post(routes::secrets::create_secret_file))
		.route("/secrets/count", get(routes::secrets::count_secrets))
		.route("/secrets/count/stream", get(routes::secrets::stream_count))
		.route("/secrets/logs", get(routes::logs::list_all_logs))
		.route("/secrets/logs/{id}", get(routes::logs::list_secret_logs))
		.route(
			"/secrets/{id}",
			get(routes::secrets::redeem_secret).delete(routes::secrets::delete_secret),
		)
		.route("/secrets/{id}/type", get(routes::secrets::secret_type))
		.route("/api/openapi.json", get(openapi_json))
		.with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
	Json(ApiDoc::openapi())
}
