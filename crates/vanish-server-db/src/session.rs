// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Login session repository.
//!
//! Sessions carry only the SHA-256 hash of the bearer token; the plaintext
//! token exists once, in the login response. Expired rows are ignored on
//! lookup and reaped by `delete_expired`.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;

use crate::error::Result;
use crate::user::parse_user_row;
use vanish_server_auth::{SessionId, User, UserId};

/// Repository for login session database operations.
#[derive(Clone)]
pub struct SessionRepository {
	pool: SqlitePool,
}

impl SessionRepository {
	/// Create a new session repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Persist a session for `user_id`, valid until `expires_at`.
	#[tracing::instrument(skip(self, token_hash), fields(user_id = %user_id))]
	pub async fn create_session(
		&self,
		user_id: &UserId,
		token_hash: &str,
		expires_at: DateTime<Utc>,
	) -> Result<SessionId> {
		let id = SessionId::generate();
		let now = Utc::now();

		sqlx::query(
			r#"
			INSERT INTO sessions (id, user_id, token_hash, created_at, expires_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(id.to_string())
		.bind(user_id.to_string())
		.bind(token_hash)
		.bind(now.to_rfc3339())
		.bind(expires_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(session_id = %id, "session created");
		Ok(id)
	}

	/// Resolve a token hash to its user, if the session is still live.
	#[tracing::instrument(skip(self, token_hash))]
	pub async fn resolve_token(&self, token_hash: &str) -> Result<Option<User>> {
		let row = sqlx::query(
			r#"
			SELECT u.id, u.username, u.hashed_password, u.is_admin, u.created_at
			FROM sessions s
			JOIN users u ON u.id = s.user_id
			WHERE s.token_hash = ? AND s.expires_at > ?
			"#,
		)
		.bind(token_hash)
		.bind(Utc::now().to_rfc3339())
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(parse_user_row).transpose()
	}

	/// Delete all expired sessions. Returns how many rows were removed.
	#[tracing::instrument(skip(self))]
	pub async fn delete_expired(&self) -> Result<u64> {
		let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
			.bind(Utc::now().to_rfc3339())
			.execute(&self.pool)
			.await?;

		let removed = result.rows_affected();
		if removed > 0 {
			tracing::debug!(removed, "expired sessions reaped");
		}
		Ok(removed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{create_test_pool, insert_test_user};
	use chrono::Duration;

	#[tokio::test]
	async fn test_create_and_resolve_session() {
		let pool = create_test_pool().await;
		let user = insert_test_user(&pool, "alice", "password", false).await;
		let repo = SessionRepository::new(pool);

		let expires = Utc::now() + Duration::hours(1);
		repo.create_session(&user.id, "hash123", expires)
			.await
			.unwrap();

		let resolved = repo.resolve_token("hash123").await.unwrap().unwrap();
		assert_eq!(resolved.id, user.id);

		assert!(repo.resolve_token("other-hash").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_expired_session_does_not_resolve() {
		let pool = create_test_pool().await;
		let user = insert_test_user(&pool, "alice", "password", false).await;
		let repo = SessionRepository::new(pool);

		let expired = Utc::now() - Duration::minutes(1);
		repo.create_session(&user.id, "hash123", expired)
			.await
			.unwrap();

		assert!(repo.resolve_token("hash123").await.unwrap().is_none());
		assert_eq!(repo.delete_expired().await.unwrap(), 1);
	}
}
