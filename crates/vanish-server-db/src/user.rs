// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User repository for database operations.
//!
//! Usernames are unique; a collision on create maps to `DbError::Conflict`
//! and is surfaced distinctly from NotFound, unlike the deliberately merged
//! failure causes on the secret redemption path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::{DbError, Result};
use vanish_server_auth::{hash_password, verify_password, User, UserId};

/// Trait for user database operations.
#[async_trait]
pub trait UserStore: Send + Sync {
	async fn create_user(&self, username: &str, password: &str, is_admin: bool) -> Result<User>;
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>>;
	async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
	async fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>>;
}

/// Repository for user database operations.
#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	/// Create a new user repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a user with a freshly hashed password.
	///
	/// # Errors
	/// Returns `DbError::Conflict` when the username is already taken; the
	/// insert is rolled back and the existing account is unaffected.
	#[tracing::instrument(skip(self, password))]
	pub async fn create_user(
		&self,
		username: &str,
		password: &str,
		is_admin: bool,
	) -> Result<User> {
		let user = User {
			id: UserId::generate(),
			username: username.to_string(),
			hashed_password: hash_password(password),
			is_admin,
			created_at: Utc::now(),
		};

		let result = sqlx::query(
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
		.execute(&self.pool)
		.await;

		match result {
			Ok(_) => {
				tracing::info!(user_id = %user.id, "user created");
				Ok(user)
			}
			Err(sqlx::Error::Database(e)) if e.message().contains("UNIQUE constraint failed") => {
				Err(DbError::Conflict(format!(
					"Username already exists: {username}"
				)))
			}
			Err(e) => Err(e.into()),
		}
	}

	/// Get a user by ID.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
		let row = sqlx::query(
			"SELECT id, username, hashed_password, is_admin, created_at FROM users WHERE id = ?",
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(parse_user_row).transpose()
	}

	/// Get a user by username.
	#[tracing::instrument(skip(self))]
	pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
		let row = sqlx::query(
			"SELECT id, username, hashed_password, is_admin, created_at \
			 FROM users WHERE username = ?",
		)
		.bind(username)
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(parse_user_row).transpose()
	}

	/// Look up a user and check their password.
	///
	/// Returns `None` both for an unknown username and for a wrong password,
	/// so login failures do not reveal which accounts exist.
	#[tracing::instrument(skip(self, password))]
	pub async fn verify_credentials(
		&self,
		username: &str,
		password: &str,
	) -> Result<Option<User>> {
		match self.get_user_by_username(username).await? {
			Some(user) if verify_password(password, &user.hashed_password) => Ok(Some(user)),
			_ => Ok(None),
		}
	}
}

#[async_trait]
impl UserStore for UserRepository {
	async fn create_user(&self, username: &str, password: &str, is_admin: bool) -> Result<User> {
		self.create_user(username, password, is_admin).await
	}

	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
		self.get_user_by_id(id).await
	}

	async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
		self.get_user_by_username(username).await
	}

	async fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
		self.verify_credentials(username, password).await
	}
}

pub(crate) fn parse_user_row(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
	let id_str: String = row.get("id");
	let username: String = row.get("username");
	let hashed_password: String = row.get("hashed_password");
	let is_admin: bool = row.get("is_admin");
	let created_at_str: String = row.get("created_at");

	let id = Uuid::parse_str(&id_str)
		.map_err(|e| DbError::Internal(format!("Invalid user id UUID: {e}")))?;

	let created_at = DateTime::parse_from_rfc3339(&created_at_str)
		.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
		.with_timezone(&Utc);

	Ok(User {
		id: UserId::new(id),
		username,
		hashed_password,
		is_admin,
		created_at,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	#[tokio::test]
	async fn test_create_and_get_user() {
		let pool = create_test_pool().await;
		let repo = UserRepository::new(pool);

		let created = repo.create_user("alice", "password", false).await.unwrap();
		assert_eq!(created.username, "alice");
		assert!(!created.is_admin);
		assert!(verify_password("password", &created.hashed_password));

		let by_id = repo.get_user_by_id(&created.id).await.unwrap().unwrap();
		assert_eq!(by_id.username, "alice");

		let by_name = repo.get_user_by_username("alice").await.unwrap().unwrap();
		assert_eq!(by_name.id, created.id);
	}

	#[tokio::test]
	async fn test_duplicate_username_is_conflict() {
		let pool = create_test_pool().await;
		let repo = UserRepository::new(pool);

		let first = repo.create_user("alice", "password", false).await.unwrap();
		let second = repo.create_user("alice", "different", false).await;
		assert!(matches!(second, Err(DbError::Conflict(_))));

		// First account unaffected.
		let fetched = repo.get_user_by_username("alice").await.unwrap().unwrap();
		assert_eq!(fetched.id, first.id);
		assert!(verify_password("password", &fetched.hashed_password));
	}

	#[tokio::test]
	async fn test_get_unknown_user() {
		let pool = create_test_pool().await;
		let repo = UserRepository::new(pool);

		assert!(repo
			.get_user_by_id(&UserId::generate())
			.await
			.unwrap()
			.is_none());
		assert!(repo.get_user_by_username("ghost").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_verify_credentials() {
		let pool = create_test_pool().await;
		let repo = UserRepository::new(pool);
		repo.create_user("alice", "password", false).await.unwrap();

		assert!(repo
			.verify_credentials("alice", "password")
			.await
			.unwrap()
			.is_some());
		assert!(repo
			.verify_credentials("alice", "wrong")
			.await
			.unwrap()
			.is_none());
		assert!(repo
			.verify_credentials("ghost", "password")
			.await
			.unwrap()
			.is_none());
	}
}
