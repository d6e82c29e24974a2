// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared fixtures for repository tests.

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use vanish_server_auth::{hash_password, User, UserId};

/// Create an in-memory pool with the full schema applied.
///
/// A single connection is used so every query sees the same in-memory
/// database.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.foreign_keys(true)
		.create_if_missing(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("Failed to create test pool");

	crate::migrations::run_migrations(&pool)
		.await
		.expect("Failed to apply migrations");

	pool
}

/// Insert a user row directly and return the entity.
pub async fn insert_test_user(
	pool: &SqlitePool,
	username: &str,
	password: &str,
	is_admin: bool,
) -> User {
	let user = User {
		id: UserId::generate(),
		username: username.to_string(),
		hashed_password: hash_password(password),
		is_admin,
		created_at: Utc::now(),
	};

	sqlx::query(
		r#"
		INSERT INTO users (id, username, hashed_password, is_admin, created_at)
		VALUES (?, ?, ?, ?, ?)
		"#,
	)
	.bind(user.id.to_string())
	.bind(&user.username)
	.bind(&user.hashed_password)
	.bind(user.is_admin)
	.bind(user.created_at.to_rfc3339())
	.execute(pool)
	.await
	.expect("Failed to insert test user");

	user
}
