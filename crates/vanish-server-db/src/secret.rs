// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret repository for database operations.
//!
//! This module owns the secret lifecycle at the persistence layer: creation
//! (encrypt, hash the password, insert, audit), redemption (predicate check,
//! hash gate, guarded increment, audit) and the owner-scoped read paths.
//! Redemption runs as a single transaction so two concurrent redeems of a
//! one-time secret cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row, SqliteConnection};
use uuid::Uuid;

use crate::error::{DbError, Result};
use crate::secret_log::{append_entry, LogAction};
use vanish_server_auth::{hash_password, verify_password, SecretId, User, UserId};

/// Content variant discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
	Text,
	File,
}

impl SecretType {
	pub fn as_str(&self) -> &'static str {
		match self {
			SecretType::Text => "text",
			SecretType::File => "file",
		}
	}

	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"text" => Some(SecretType::Text),
			"file" => Some(SecretType::File),
			_ => None,
		}
	}
}

impl std::fmt::Display for SecretType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Plaintext payload supplied at creation time. Never persisted as-is.
#[derive(Debug, Clone)]
pub enum SecretPayload {
	Text(String),
	File { bytes: Vec<u8>, filename: String },
}

/// Encrypted content as stored. The variant always agrees with the
/// `content_type` discriminator on the secret row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretContent {
	Text { ciphertext: Vec<u8> },
	File { ciphertext: Vec<u8>, filename: String },
}

impl SecretContent {
	pub fn content_type(&self) -> SecretType {
		match self {
			SecretContent::Text { .. } => SecretType::Text,
			SecretContent::File { .. } => SecretType::File,
		}
	}

	pub fn ciphertext(&self) -> &[u8] {
		match self {
			SecretContent::Text { ciphertext } => ciphertext,
			SecretContent::File { ciphertext, .. } => ciphertext,
		}
	}
}

/// A stored secret, content still encrypted.
#[derive(Debug, Clone)]
pub struct Secret {
	pub id: SecretId,
	pub creation: DateTime<Utc>,
	pub destruction: Option<DateTime<Utc>>,
	pub usage_count: u32,
	pub usage_limit: Option<u32>,
	pub hashed_password: String,
	pub owner: Option<UserId>,
	pub content: SecretContent,
}

/// Listing view of a secret: metadata only, no content blob.
#[derive(Debug, Clone, Serialize)]
pub struct SecretSummary {
	pub id: SecretId,
	pub creation: DateTime<Utc>,
	pub destruction: Option<DateTime<Utc>>,
	pub usage_count: u32,
	pub usage_limit: Option<u32>,
	#[serde(rename = "type")]
	pub content_type: SecretType,
	pub owner: Option<UserId>,
}

/// Trait for secret database operations.
#[async_trait]
pub trait SecretStore: Send + Sync {
	async fn create_secret(
		&self,
		owner: Option<&UserId>,
		payload: SecretPayload,
		password: &str,
		usage_limit: Option<u32>,
		duration_minutes: Option<u32>,
	) -> Result<Secret>;

	async fn read_secret_for_redeem(&self, id: &SecretId, password: &str)
		-> Result<Option<Secret>>;

	async fn read_secret_type(&self, id: &SecretId) -> Result<SecretType>;

	async fn list_secrets_for_caller(
		&self,
		caller: Option<&User>,
		limit: i64,
		offset: i64,
	) -> Result<Vec<SecretSummary>>;

	async fn count_secrets(&self) -> Result<u64>;

	async fn delete_secret(&self, id: &SecretId, caller: &UserId) -> Result<bool>;
}

/// Repository for secret database operations.
#[derive(Clone)]
pub struct SecretRepository {
	pool: SqlitePool,
}

impl SecretRepository {
	/// Create a new secret repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a secret: encrypt the payload, hash the gate password, persist
	/// secret + content and the CREATE audit entry in one transaction.
	///
	/// A `usage_limit` or `duration_minutes` of zero means unlimited / no
	/// expiry, same as absent.
	#[tracing::instrument(skip(self, payload, password))]
	pub async fn create_secret(
		&self,
		owner: Option<&UserId>,
		payload: SecretPayload,
		password: &str,
		usage_limit: Option<u32>,
		duration_minutes: Option<u32>,
	) -> Result<Secret> {
		let id = SecretId::generate();
		let now = Utc::now();
		let destruction = duration_minutes
			.filter(|minutes| *minutes > 0)
			.map(|minutes| now + Duration::minutes(i64::from(minutes)));
		let usage_limit = usage_limit.filter(|limit| *limit > 0);

		let content = encrypt_payload(payload, password)?;
		let hashed_password = hash_password(password);

		let mut tx = self.pool.begin().await?;

		sqlx::query(
			r#"
			INSERT INTO secrets (
				id, creation, destruction, usage_count, usage_limit,
				hashed_password, owner_user_id, content_type
			) VALUES (?, ?, ?, 0, ?, ?, ?, ?)
			"#,
		)
		.bind(id.to_string())
		.bind(now.to_rfc3339())
		.bind(destruction.map(|d| d.to_rfc3339()))
		.bind(usage_limit.map(i64::from))
		.bind(&hashed_password)
		.bind(owner.map(|o| o.to_string()))
		.bind(content.content_type().as_str())
		.execute(&mut *tx)
		.await?;

		match &content {
			SecretContent::Text { ciphertext } => {
				sqlx::query(
					"INSERT INTO secret_text_contents (secret_id, ciphertext) VALUES (?, ?)",
				)
				.bind(id.to_string())
				.bind(ciphertext.as_slice())
				.execute(&mut *tx)
				.await?;
			}
			SecretContent::File {
				ciphertext,
				filename,
			} => {
				sqlx::query(
					"INSERT INTO secret_file_contents (secret_id, ciphertext, filename) \
					 VALUES (?, ?, ?)",
				)
				.bind(id.to_string())
				.bind(ciphertext.as_slice())
				.bind(filename)
				.execute(&mut *tx)
				.await?;
			}
		}

		append_entry(&mut tx, &id, LogAction::Create).await?;

		tx.commit().await?;
		tracing::debug!(secret_id = %id, content_type = %content.content_type(), "secret created");

		Ok(Secret {
			id,
			creation: now,
			destruction,
			usage_count: 0,
			usage_limit,
			hashed_password,
			owner: owner.copied(),
			content,
		})
	}

	/// Redeem a secret: check the lifecycle predicates and the hash gate,
	/// increment `usage_count`, and append GET (and, at the limit, EXPIRE)
	/// audit entries, all in one transaction.
	///
	/// Returns `Ok(None)` when the secret is missing, expired, exhausted, or
	/// the password is wrong. The causes are indistinguishable to the caller
	/// so an attacker cannot probe which secrets exist. No failure path
	/// increments the counter.
	#[tracing::instrument(skip(self, password), fields(secret_id = %id))]
	pub async fn read_secret_for_redeem(
		&self,
		id: &SecretId,
		password: &str,
	) -> Result<Option<Secret>> {
		let now = Utc::now();
		let mut tx = self.pool.begin().await?;

		let row = sqlx::query(
			r#"
			SELECT id, creation, destruction, usage_count, usage_limit,
			       hashed_password, owner_user_id, content_type
			FROM secrets
			WHERE id = ?
			  AND (destruction IS NULL OR destruction > ?)
			  AND (usage_limit IS NULL OR usage_count < usage_limit)
			"#,
		)
		.bind(id.to_string())
		.bind(now.to_rfc3339())
		.fetch_optional(&mut *tx)
		.await?;

		let Some(row) = row else {
			return Ok(None);
		};
		let meta = parse_secret_meta(&row)?;

		if !verify_password(password, &meta.hashed_password) {
			// Dropping the transaction rolls it back; nothing was written.
			return Ok(None);
		}

		// Guarded increment: if a concurrent redeem committed first, the
		// usage_count predicate no longer holds, zero rows are affected and
		// this attempt loses rather than over-redeeming.
		let updated = sqlx::query(
			"UPDATE secrets SET usage_count = usage_count + 1 WHERE id = ? AND usage_count = ?",
		)
		.bind(id.to_string())
		.bind(i64::from(meta.usage_count))
		.execute(&mut *tx)
		.await?;
		if updated.rows_affected() == 0 {
			return Ok(None);
		}

		let new_count = meta.usage_count + 1;
		append_entry(&mut tx, id, LogAction::Get).await?;
		if meta.usage_limit.is_some_and(|limit| new_count >= limit) {
			append_entry(&mut tx, id, LogAction::Expire).await?;
		}

		let content = load_content(&mut tx, id, meta.content_type).await?;

		tx.commit().await?;
		tracing::debug!(usage_count = new_count, "secret redeemed");

		Ok(Some(Secret {
			id: meta.id,
			creation: meta.creation,
			destruction: meta.destruction,
			usage_count: new_count,
			usage_limit: meta.usage_limit,
			hashed_password: meta.hashed_password,
			owner: meta.owner,
			content,
		}))
	}

	/// Look up a secret's content type. No side effects, no password check;
	/// the variant is not considered secret.
	///
	/// A missing secret reports `text`. That default leaks nothing beyond
	/// what the uniform redeem failure already guarantees, but it is an odd
	/// contract; kept for compatibility with the existing client behavior.
	#[tracing::instrument(skip(self), fields(secret_id = %id))]
	pub async fn read_secret_type(&self, id: &SecretId) -> Result<SecretType> {
		let row = sqlx::query("SELECT content_type FROM secrets WHERE id = ?")
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		match row {
			Some(row) => {
				let type_str: String = row.get("content_type");
				SecretType::parse(&type_str)
					.ok_or_else(|| DbError::Internal(format!("Invalid content_type: {type_str}")))
			}
			None => Ok(SecretType::Text),
		}
	}

	/// List secrets visible to `caller`: admins see everything, other users
	/// see only secrets they own, anonymous callers are rejected.
	///
	/// Ordered by creation time (insertion order).
	#[tracing::instrument(skip(self, caller), fields(limit, offset))]
	pub async fn list_secrets_for_caller(
		&self,
		caller: Option<&User>,
		limit: i64,
		offset: i64,
	) -> Result<Vec<SecretSummary>> {
		let Some(user) = caller else {
			return Err(DbError::Unauthorized("authentication required".to_string()));
		};

		let rows = if user.is_admin {
			sqlx::query(
				r#"
				SELECT id, creation, destruction, usage_count, usage_limit, owner_user_id, content_type
				FROM secrets
				ORDER BY creation ASC, rowid ASC
				LIMIT ? OFFSET ?
				"#,
			)
			.bind(limit)
			.bind(offset)
			.fetch_all(&self.pool)
			.await?
		} else {
			sqlx::query(
				r#"
				SELECT id, creation, destruction, usage_count, usage_limit, owner_user_id, content_type
				FROM secrets
				WHERE owner_user_id = ?
				ORDER BY creation ASC, rowid ASC
				LIMIT ? OFFSET ?
				"#,
			)
			.bind(user.id.to_string())
			.bind(limit)
			.bind(offset)
			.fetch_all(&self.pool)
			.await?
		};

		let mut summaries = Vec::with_capacity(rows.len());
		for row in &rows {
			let meta = parse_secret_meta_without_hash(row)?;
			summaries.push(meta);
		}
		tracing::debug!(count = summaries.len(), "listed secrets");
		Ok(summaries)
	}

	/// Total number of stored secrets, in any lifecycle state.
	#[tracing::instrument(skip(self))]
	pub async fn count_secrets(&self) -> Result<u64> {
		let row = sqlx::query("SELECT COUNT(*) as cnt FROM secrets")
			.fetch_one(&self.pool)
			.await?;
		let count: i64 = row.get("cnt");
		Ok(count as u64)
	}

	/// Delete a secret and its content, but only when `caller` owns it.
	///
	/// Returns whether a row was deleted. A cross-owner attempt (or an
	/// anonymous secret, which nobody owns) returns `false`, not an error.
	/// Audit entries are retained.
	#[tracing::instrument(skip(self), fields(secret_id = %id, caller = %caller))]
	pub async fn delete_secret(&self, id: &SecretId, caller: &UserId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM secrets WHERE id = ? AND owner_user_id = ?")
			.bind(id.to_string())
			.bind(caller.to_string())
			.execute(&self.pool)
			.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::info!(secret_id = %id, "secret deleted");
		}
		Ok(deleted)
	}
}

#[async_trait]
impl SecretStore for SecretRepository {
	async fn create_secret(
		&self,
		owner: Option<&UserId>,
		payload: SecretPayload,
		password: &str,
		usage_limit: Option<u32>,
		duration_minutes: Option<u32>,
	) -> Result<Secret> {
		self.create_secret(owner, payload, password, usage_limit, duration_minutes)
			.await
	}

	async fn read_secret_for_redeem(
		&self,
		id: &SecretId,
		password: &str,
	) -> Result<Option<Secret>> {
		self.read_secret_for_redeem(id, password).await
	}

	async fn read_secret_type(&self, id: &SecretId) -> Result<SecretType> {
		self.read_secret_type(id).await
	}

	async fn list_secrets_for_caller(
		&self,
		caller: Option<&User>,
		limit: i64,
		offset: i64,
	) -> Result<Vec<SecretSummary>> {
		self.list_secrets_for_caller(caller, limit, offset).await
	}

	async fn count_secrets(&self) -> Result<u64> {
		self.count_secrets().await
	}

	async fn delete_secret(&self, id: &SecretId, caller: &UserId) -> Result<bool> {
		self.delete_secret(id, caller).await
	}
}

fn encrypt_payload(payload: SecretPayload, password: &str) -> Result<SecretContent> {
	match payload {
		SecretPayload::Text(text) => {
			let ciphertext = vanish_common_crypto::encrypt(text.as_bytes(), password)
				.map_err(|e| DbError::Internal(format!("Payload encryption failed: {e}")))?;
			Ok(SecretContent::Text { ciphertext })
		}
		SecretPayload::File { bytes, filename } => {
			let ciphertext = vanish_common_crypto::encrypt(&bytes, password)
				.map_err(|e| DbError::Internal(format!("Payload encryption failed: {e}")))?;
			Ok(SecretContent::File {
				ciphertext,
				filename,
			})
		}
	}
}

struct SecretMeta {
	id: SecretId,
	creation: DateTime<Utc>,
	destruction: Option<DateTime<Utc>>,
	usage_count: u32,
	usage_limit: Option<u32>,
	hashed_password: String,
	owner: Option<UserId>,
	content_type: SecretType,
}

fn parse_secret_meta(row: &sqlx::sqlite::SqliteRow) -> Result<SecretMeta> {
	let id_str: String = row.get("id");
	let creation_str: String = row.get("creation");
	let destruction_str: Option<String> = row.get("destruction");
	let usage_count: i64 = row.get("usage_count");
	let usage_limit: Option<i64> = row.get("usage_limit");
	let hashed_password: String = row.get("hashed_password");
	let owner_str: Option<String> = row.get("owner_user_id");
	let content_type_str: String = row.get("content_type");

	let id = Uuid::parse_str(&id_str)
		.map_err(|e| DbError::Internal(format!("Invalid secret id UUID: {e}")))?;

	let creation = DateTime::parse_from_rfc3339(&creation_str)
		.map_err(|e| DbError::Internal(format!("Invalid creation: {e}")))?
		.with_timezone(&Utc);

	let destruction = destruction_str
		.map(|s| {
			DateTime::parse_from_rfc3339(&s)
				.map(|dt| dt.with_timezone(&Utc))
				.map_err(|e| DbError::Internal(format!("Invalid destruction: {e}")))
		})
		.transpose()?;

	let usage_count = u32::try_from(usage_count)
		.map_err(|e| DbError::Internal(format!("Invalid usage_count: {e}")))?;

	let usage_limit = usage_limit
		.map(|limit| {
			u32::try_from(limit).map_err(|e| DbError::Internal(format!("Invalid usage_limit: {e}")))
		})
		.transpose()?;

	let owner = owner_str
		.map(|s| {
			Uuid::parse_str(&s)
				.map(UserId::new)
				.map_err(|e| DbError::Internal(format!("Invalid owner_user_id UUID: {e}")))
		})
		.transpose()?;

	let content_type = SecretType::parse(&content_type_str)
		.ok_or_else(|| DbError::Internal(format!("Invalid content_type: {content_type_str}")))?;

	Ok(SecretMeta {
		id: SecretId::new(id),
		creation,
		destruction,
		usage_count,
		usage_limit,
		hashed_password,
		owner,
		content_type,
	})
}

fn parse_secret_meta_without_hash(row: &sqlx::sqlite::SqliteRow) -> Result<SecretSummary> {
	let id_str: String = row.get("id");
	let creation_str: String = row.get("creation");
	let destruction_str: Option<String> = row.get("destruction");
	let usage_count: i64 = row.get("usage_count");
	let usage_limit: Option<i64> = row.get("usage_limit");
	let owner_str: Option<String> = row.get("owner_user_id");
	let content_type_str: String = row.get("content_type");

	let id = Uuid::parse_str(&id_str)
		.map_err(|e| DbError::Internal(format!("Invalid secret id UUID: {e}")))?;

	let creation = DateTime::parse_from_rfc3339(&creation_str)
		.map_err(|e| DbError::Internal(format!("Invalid creation: {e}")))?
		.with_timezone(&Utc);

	let destruction = destruction_str
		.map(|s| {
			DateTime::parse_from_rfc3339(&s)
				.map(|dt| dt.with_timezone(&Utc))
				.map_err(|e| DbError::Internal(format!("Invalid destruction: {e}")))
		})
		.transpose()?;

	let usage_count = u32::try_from(usage_count)
		.map_err(|e| DbError::Internal(format!("Invalid usage_count: {e}")))?;

	let usage_limit = usage_limit
		.map(|limit| {
			u32::try_from(limit).map_err(|e| DbError::Internal(format!("Invalid usage_limit: {e}")))
		})
		.transpose()?;

	let owner = owner_str
		.map(|s| {
			Uuid::parse_str(&s)
				.map(UserId::new)
				.map_err(|e| DbError::Internal(format!("Invalid owner_user_id UUID: {e}")))
		})
		.transpose()?;

	let content_type = SecretType::parse(&content_type_str)
		.ok_or_else(|| DbError::Internal(format!("Invalid content_type: {content_type_str}")))?;

	Ok(SecretSummary {
		id: SecretId::new(id),
		creation,
		destruction,
		usage_count,
		usage_limit,
		content_type,
		owner,
	})
}

async fn load_content(
	conn: &mut SqliteConnection,
	id: &SecretId,
	content_type: SecretType,
) -> Result<SecretContent> {
	match content_type {
		SecretType::Text => {
			let row =
				sqlx::query("SELECT ciphertext FROM secret_text_contents WHERE secret_id = ?")
					.bind(id.to_string())
					.fetch_optional(&mut *conn)
					.await?
					.ok_or_else(|| {
						DbError::Internal(format!("Missing text content for secret {id}"))
					})?;
			Ok(SecretContent::Text {
				ciphertext: row.get("ciphertext"),
			})
		}
		SecretType::File => {
			let row = sqlx::query(
				"SELECT ciphertext, filename FROM secret_file_contents WHERE secret_id = ?",
			)
			.bind(id.to_string())
			.fetch_optional(&mut *conn)
			.await?
			.ok_or_else(|| DbError::Internal(format!("Missing file content for secret {id}")))?;
			Ok(SecretContent::File {
				ciphertext: row.get("ciphertext"),
				filename: row.get("filename"),
			})
		}
	}
}
