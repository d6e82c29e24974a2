// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Append-only audit log for secret lifecycle transitions.
//!
//! Every CREATE, successful GET, and limit-reached EXPIRE is recorded with a
//! server-assigned timestamp. Entries are never updated or deleted, and the
//! table carries no foreign key to `secrets`, so the trail outlives the
//! secret itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row, SqliteConnection};
use uuid::Uuid;

use crate::error::{DbError, Result};
use vanish_server_auth::{LogEntryId, SecretId};

/// Lifecycle transition recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
	Create,
	Get,
	Expire,
}

impl LogAction {
	pub fn as_str(&self) -> &'static str {
		match self {
			LogAction::Create => "create",
			LogAction::Get => "get",
			LogAction::Expire => "expire",
		}
	}

	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"create" => Some(LogAction::Create),
			"get" => Some(LogAction::Get),
			"expire" => Some(LogAction::Expire),
			_ => None,
		}
	}
}

impl std::fmt::Display for LogAction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretLogEntry {
	pub id: LogEntryId,
	pub secret_id: SecretId,
	pub action: LogAction,
	pub timestamp: DateTime<Utc>,
}

/// Append an entry using a caller-supplied connection.
///
/// Takes `&mut SqliteConnection` rather than the pool so the secret
/// repository can append inside the same transaction that mutates the
/// secret row; the entry becomes visible exactly when that transaction
/// commits.
pub async fn append_entry(
	conn: &mut SqliteConnection,
	secret_id: &SecretId,
	action: LogAction,
) -> Result<SecretLogEntry> {
	let entry = SecretLogEntry {
		id: LogEntryId::generate(),
		secret_id: *secret_id,
		action,
		timestamp: Utc::now(),
	};

	sqlx::query(
		r#"
		INSERT INTO secret_log_entries (id, secret_id, action, timestamp)
		VALUES (?, ?, ?, ?)
		"#,
	)
	.bind(entry.id.to_string())
	.bind(entry.secret_id.to_string())
	.bind(entry.action.as_str())
	.bind(entry.timestamp.to_rfc3339())
	.execute(conn)
	.await?;

	Ok(entry)
}

/// Trait for audit log database operations.
#[async_trait]
pub trait SecretLogStore: Send + Sync {
	async fn append(&self, secret_id: &SecretId, action: LogAction) -> Result<SecretLogEntry>;
	async fn list_for_secret(
		&self,
		secret_id: &SecretId,
		limit: i64,
		offset: i64,
	) -> Result<Vec<SecretLogEntry>>;
	async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<SecretLogEntry>>;
}

/// Repository for audit log database operations.
#[derive(Clone)]
pub struct SecretLogRepository {
	pool: SqlitePool,
}

impl SecretLogRepository {
	/// Create a new audit log repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Append an entry outside of any larger transaction.
	#[tracing::instrument(skip(self), fields(secret_id = %secret_id, action = %action))]
	pub async fn append(&self, secret_id: &SecretId, action: LogAction) -> Result<SecretLogEntry> {
		let mut conn = self.pool.acquire().await?;
		let entry = append_entry(&mut conn, secret_id, action).await?;
		tracing::debug!(entry_id = %entry.id, "audit entry appended");
		Ok(entry)
	}

	/// List entries for one secret, oldest first.
	#[tracing::instrument(skip(self), fields(secret_id = %secret_id, limit, offset))]
	pub async fn list_for_secret(
		&self,
		secret_id: &SecretId,
		limit: i64,
		offset: i64,
	) -> Result<Vec<SecretLogEntry>> {
		let rows = sqlx::query(
			r#"
			SELECT id, secret_id, action, timestamp
			FROM secret_log_entries
			WHERE secret_id = ?
			ORDER BY timestamp ASC, rowid ASC
			LIMIT ? OFFSET ?
			"#,
		)
		.bind(secret_id.to_string())
		.bind(limit)
		.bind(offset)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(parse_log_row).collect()
	}

	/// List entries across all secrets, oldest first.
	#[tracing::instrument(skip(self), fields(limit, offset))]
	pub async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<SecretLogEntry>> {
		let rows = sqlx::query(
			r#"
			SELECT id, secret_id, action, timestamp
			FROM secret_log_entries
			ORDER BY timestamp ASC, rowid ASC
			LIMIT ? OFFSET ?
			"#,
		)
		.bind(limit)
		.bind(offset)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(parse_log_row).collect()
	}
}

#[async_trait]
impl SecretLogStore for SecretLogRepository {
	async fn append(&self, secret_id: &SecretId, action: LogAction) -> Result<SecretLogEntry> {
		self.append(secret_id, action).await
	}

	async fn list_for_secret(
		&self,
		secret_id: &SecretId,
		limit: i64,
		offset: i64,
	) -> Result<Vec<SecretLogEntry>> {
		self.list_for_secret(secret_id, limit, offset).await
	}

	async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<SecretLogEntry>> {
		self.list_all(limit, offset).await
	}
}

fn parse_log_row(row: &sqlx::sqlite::SqliteRow) -> Result<SecretLogEntry> {
	let id_str: String = row.get("id");
	let secret_id_str: String = row.get("secret_id");
	let action_str: String = row.get("action");
	let timestamp_str: String = row.get("timestamp");

	let id = Uuid::parse_str(&id_str)
		.map_err(|e| DbError::Internal(format!("Invalid log entry id UUID: {e}")))?;
	let secret_id = Uuid::parse_str(&secret_id_str)
		.map_err(|e| DbError::Internal(format!("Invalid secret_id UUID: {e}")))?;
	let action = LogAction::parse(&action_str)
		.ok_or_else(|| DbError::Internal(format!("Invalid log action: {action_str}")))?;
	let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
		.map_err(|e| DbError::Internal(format!("Invalid timestamp: {e}")))?
		.with_timezone(&Utc);

	Ok(SecretLogEntry {
		id: LogEntryId::new(id),
		secret_id: SecretId::new(secret_id),
		action,
		timestamp,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	#[tokio::test]
	async fn test_append_and_list_for_secret() {
		let pool = create_test_pool().await;
		let repo = SecretLogRepository::new(pool);
		let secret_id = SecretId::generate();

		repo.append(&secret_id, LogAction::Create).await.unwrap();
		repo.append(&secret_id, LogAction::Get).await.unwrap();
		repo.append(&secret_id, LogAction::Expire).await.unwrap();

		let entries = repo.list_for_secret(&secret_id, 10, 0).await.unwrap();
		let actions: Vec<LogAction> = entries.iter().map(|e| e.action).collect();
		assert_eq!(
			actions,
			vec![LogAction::Create, LogAction::Get, LogAction::Expire]
		);
		assert!(entries.iter().all(|e| e.secret_id == secret_id));
	}

	#[tokio::test]
	async fn test_timestamps_non_decreasing() {
		let pool = create_test_pool().await;
		let repo = SecretLogRepository::new(pool);
		let secret_id = SecretId::generate();

		for _ in 0..5 {
			repo.append(&secret_id, LogAction::Get).await.unwrap();
		}

		let entries = repo.list_for_secret(&secret_id, 10, 0).await.unwrap();
		for pair in entries.windows(2) {
			assert!(pair[0].timestamp <= pair[1].timestamp);
		}
	}

	#[tokio::test]
	async fn test_list_for_secret_scopes_by_id() {
		let pool = create_test_pool().await;
		let repo = SecretLogRepository::new(pool);
		let a = SecretId::generate();
		let b = SecretId::generate();

		repo.append(&a, LogAction::Create).await.unwrap();
		repo.append(&b, LogAction::Create).await.unwrap();

		let entries = repo.list_for_secret(&a, 10, 0).await.unwrap();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].secret_id, a);
	}

	#[tokio::test]
	async fn test_list_all_pagination() {
		let pool = create_test_pool().await;
		let repo = SecretLogRepository::new(pool);

		for _ in 0..5 {
			repo.append(&SecretId::generate(), LogAction::Create)
				.await
				.unwrap();
		}

		assert_eq!(repo.list_all(2, 0).await.unwrap().len(), 2);
		assert_eq!(repo.list_all(10, 4).await.unwrap().len(), 1);
		assert_eq!(repo.list_all(10, 5).await.unwrap().len(), 0);
	}
}
