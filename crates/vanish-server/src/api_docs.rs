// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OpenAPI document for the vanish API, served at `/api/openapi.json`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
	paths(
		crate::routes::health::health_check,
		crate::routes::auth::register,
		crate::routes::auth::login,
		crate::routes::secrets::create_secret,
		crate::routes::secrets::create_secret_file,
		crate::routes::secrets::redeem_secret,
		crate::routes::secrets::secret_type,
		crate::routes::secrets::list_secrets,
		crate::routes::secrets::delete_secret,
		crate::routes::secrets::count_secrets,
		crate::routes::secrets::stream_count,
		crate::routes::logs::list_all_logs,
		crate::routes::logs::list_secret_logs,
	),
	components(schemas(
		crate::error::ErrorResponse,
		crate::routes::health::HealthResponse,
		crate::routes::auth::RegisterRequest,
		crate::routes::auth::RegisterResponse,
		crate::routes::auth::LoginRequest,
		crate::routes::auth::LoginResponse,
		crate::routes::secrets::CreateSecretRequest,
		crate::routes::secrets::RedeemTextResponse,
		crate::routes::secrets::SecretTypeResponse,
		crate::routes::secrets::DeleteSecretResponse,
		crate::routes::secrets::CountResponse,
		crate::routes::logs::LogEntryResponse,
		crate::service::SecretMetadata,
	)),
	tags(
		(name = "health", description = "Liveness probes"),
		(name = "auth", description = "Account registration and login"),
		(name = "secrets", description = "Secret lifecycle operations"),
		(name = "secrets-logs", description = "Audit trail reads"),
	)
)]
pub struct ApiDoc;
