// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Idempotent schema creation.
//!
//! Content is split across per-variant sub-tables keyed by the secret id,
//! with the `content_type` discriminator on the `secrets` row; the two must
//! always agree. Audit log entries deliberately carry no foreign key to
//! `secrets` so the trail survives secret deletion.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

/// Create all tables and indexes if they do not exist yet.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS users (
			id TEXT PRIMARY KEY,
			username TEXT NOT NULL UNIQUE,
			hashed_password TEXT NOT NULL,
			is_admin INTEGER NOT NULL DEFAULT 0,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS secrets (
			id TEXT PRIMARY KEY,
			creation TEXT NOT NULL,
			destruction TEXT,
			usage_count INTEGER NOT NULL DEFAULT 0,
			usage_limit INTEGER,
			hashed_password TEXT NOT NULL,
			owner_user_id TEXT REFERENCES users(id),
			content_type TEXT NOT NULL CHECK (content_type IN ('text', 'file'))
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query("CREATE INDEX IF NOT EXISTS idx_secrets_creation ON secrets(creation)")
		.execute(pool)
		.await?;

	sqlx::query("CREATE INDEX IF NOT EXISTS idx_secrets_owner ON secrets(owner_user_id)")
		.execute(pool)
		.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS secret_text_contents (
			secret_id TEXT PRIMARY KEY REFERENCES secrets(id) ON DELETE CASCADE,
			ciphertext BLOB NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS secret_file_contents (
			secret_id TEXT PRIMARY KEY REFERENCES secrets(id) ON DELETE CASCADE,
			ciphertext BLOB NOT NULL,
			filename TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS secret_log_entries (
			id TEXT PRIMARY KEY,
			secret_id TEXT NOT NULL,
			action TEXT NOT NULL CHECK (action IN ('create', 'get', 'expire')),
			timestamp TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_secret_log_entries_secret \
		 ON secret_log_entries(secret_id, timestamp)",
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS sessions (
			id TEXT PRIMARY KEY,
			user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
			token_hash TEXT NOT NULL,
			created_at TEXT NOT NULL,
			expires_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_token_hash ON sessions(token_hash)")
		.execute(pool)
		.await?;

	tracing::debug!("database migrations applied");
	Ok(())
}
