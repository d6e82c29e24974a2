// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret lifecycle engine.
//!
//! Orchestrates the store, the cipher and the count broadcaster into the
//! operations the API exposes. The same password gates redemption (via the
//! stored credential hash) and derives the payload key; after the gate has
//! passed, a decryption failure indicates corruption and degrades to the
//! same uniform NotFound rather than a 500.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ServerError;
use crate::notify::CountBroadcaster;
use vanish_server_auth::{SecretId, User};
use vanish_server_db::{
	Secret, SecretContent, SecretPayload, SecretRepository, SecretSummary, SecretType,
};

/// Caller-visible view of a secret. Never carries the ciphertext or the
/// credential hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SecretMetadata {
	pub uuid: Uuid,
	pub creation: DateTime<Utc>,
	pub destruction: Option<DateTime<Utc>>,
	pub usage_count: u32,
	pub usage_limit: Option<u32>,
	#[serde(rename = "type")]
	pub secret_type: String,
}

impl SecretMetadata {
	fn from_secret(secret: &Secret) -> Self {
		Self {
			uuid: secret.id.into_inner(),
			creation: secret.creation,
			destruction: secret.destruction,
			usage_count: secret.usage_count,
			usage_limit: secret.usage_limit,
			secret_type: secret.content.content_type().to_string(),
		}
	}

	pub fn from_summary(summary: &SecretSummary) -> Self {
		Self {
			uuid: summary.id.into_inner(),
			creation: summary.creation,
			destruction: summary.destruction,
			usage_count: summary.usage_count,
			usage_limit: summary.usage_limit,
			secret_type: summary.content_type.to_string(),
		}
	}
}

/// A successfully redeemed secret, decrypted.
#[derive(Debug)]
pub enum RedeemedSecret {
	/// Text secrets return the plaintext inline, next to the metadata.
	Text {
		metadata: SecretMetadata,
		content: String,
	},
	/// File secrets return raw bytes for attachment delivery.
	File { filename: String, bytes: Vec<u8> },
}

/// Orchestration layer over the secret store.
pub struct SecretService {
	secrets: Arc<SecretRepository>,
	broadcaster: Arc<CountBroadcaster>,
}

impl SecretService {
	pub fn new(secrets: Arc<SecretRepository>, broadcaster: Arc<CountBroadcaster>) -> Self {
		Self {
			secrets,
			broadcaster,
		}
	}

	/// Create a text secret. The caller identity, when present, becomes the
	/// owner who may later list or delete it.
	#[tracing::instrument(skip(self, content, password, caller))]
	pub async fn create_from_text(
		&self,
		caller: Option<&User>,
		content: String,
		password: &str,
		usage_limit: Option<u32>,
		duration_minutes: Option<u32>,
	) -> Result<SecretMetadata, ServerError> {
		let owner = caller.map(|user| user.id);
		let secret = self
			.secrets
			.create_secret(
				owner.as_ref(),
				SecretPayload::Text(content),
				password,
				usage_limit,
				duration_minutes,
			)
			.await?;

		tracing::info!(secret_id = %secret.id, "text secret created");
		self.broadcaster.signal();
		Ok(SecretMetadata::from_secret(&secret))
	}

	/// Create a file secret.
	#[tracing::instrument(skip(self, bytes, password, caller), fields(filename = %filename))]
	pub async fn create_from_file(
		&self,
		caller: Option<&User>,
		bytes: Vec<u8>,
		filename: String,
		password: &str,
		usage_limit: Option<u32>,
		duration_minutes: Option<u32>,
	) -> Result<SecretMetadata, ServerError> {
		let owner = caller.map(|user| user.id);
		let secret = self
			.secrets
			.create_secret(
				owner.as_ref(),
				SecretPayload::File { bytes, filename },
				password,
				usage_limit,
				duration_minutes,
			)
			.await?;

		tracing::info!(secret_id = %secret.id, "file secret created");
		self.broadcaster.signal();
		Ok(SecretMetadata::from_secret(&secret))
	}

	/// Redeem a secret: gate on the password, consume a use, decrypt.
	///
	/// Missing, expired, exhausted and wrong-password all surface as the
	/// same NotFound. Decryption should not fail once the hash gate has
	/// passed (both derive from the same password); if it does, the secret
	/// is corrupt and the caller still just sees NotFound.
	#[tracing::instrument(skip(self, password), fields(secret_id = %id))]
	pub async fn redeem(
		&self,
		id: &SecretId,
		password: &str,
	) -> Result<RedeemedSecret, ServerError> {
		let Some(secret) = self.secrets.read_secret_for_redeem(id, password).await? else {
			return Err(not_found_secret());
		};

		let metadata = SecretMetadata::from_secret(&secret);
		match secret.content {
			SecretContent::Text { ciphertext } => {
				let plaintext = vanish_common_crypto::decrypt(&ciphertext, password)
					.map_err(|e| corrupt_secret(id, e))?;
				let content = String::from_utf8(plaintext).map_err(|_| {
					tracing::warn!(secret_id = %id, "redeemed text secret is not valid UTF-8");
					not_found_secret()
				})?;
				Ok(RedeemedSecret::Text { metadata, content })
			}
			SecretContent::File {
				ciphertext,
				filename,
			} => {
				let bytes = vanish_common_crypto::decrypt(&ciphertext, password)
					.map_err(|e| corrupt_secret(id, e))?;
				Ok(RedeemedSecret::File { filename, bytes })
			}
		}
	}

	/// Look up a secret's content type without touching its lifecycle.
	pub async fn secret_type(&self, id: &SecretId) -> Result<SecretType, ServerError> {
		Ok(self.secrets.read_secret_type(id).await?)
	}

	/// List secrets visible to the caller: admins see all, users see their
	/// own, anonymous callers are rejected.
	pub async fn list(
		&self,
		caller: Option<&User>,
		limit: i64,
		offset: i64,
	) -> Result<Vec<SecretSummary>, ServerError> {
		Ok(self
			.secrets
			.list_secrets_for_caller(caller, limit, offset)
			.await?)
	}

	/// Delete a secret the caller owns. Returns whether a row was deleted.
	#[tracing::instrument(skip(self, caller), fields(secret_id = %id))]
	pub async fn delete(&self, id: &SecretId, caller: &User) -> Result<bool, ServerError> {
		let deleted = self.secrets.delete_secret(id, &caller.id).await?;
		if deleted {
			self.broadcaster.signal();
		}
		Ok(deleted)
	}

	/// Current number of stored secrets.
	pub async fn count(&self) -> Result<u64, ServerError> {
		Ok(self.secrets.count_secrets().await?)
	}
}

/// The uniform redemption failure: deliberately does not distinguish
/// missing, expired, exhausted, or wrong password.
fn not_found_secret() -> ServerError {
	ServerError::NotFound(
		"Secret not found or wrong password or usage limit reached or expired".to_string(),
	)
}

fn corrupt_secret(id: &SecretId, e: vanish_common_crypto::CryptoError) -> ServerError {
	tracing::warn!(secret_id = %id, error = %e, "decryption failed after hash gate passed");
	not_found_secret()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;
	use tokio::time::timeout;
	use vanish_server_db::testing::{create_test_pool, insert_test_user};

	async fn make_service() -> (SecretService, Arc<CountBroadcaster>, sqlx::SqlitePool) {
		let pool = create_test_pool().await;
		let broadcaster = Arc::new(CountBroadcaster::new());
		let service = SecretService::new(
			Arc::new(SecretRepository::new(pool.clone())),
			Arc::clone(&broadcaster),
		);
		(service, broadcaster, pool)
	}

	#[tokio::test]
	async fn test_create_then_redeem_one_time_secret() {
		let (service, _broadcaster, _pool) = make_service().await;

		let metadata = service
			.create_from_text(None, "hello".to_string(), "pw", Some(1), Some(0))
			.await
			.unwrap();
		assert_eq!(metadata.usage_count, 0);
		assert_eq!(metadata.usage_limit, Some(1));
		assert_eq!(metadata.secret_type, "text");
		assert!(metadata.destruction.is_none());

		let id = SecretId::new(metadata.uuid);
		match service.redeem(&id, "pw").await.unwrap() {
			RedeemedSecret::Text { metadata, content } => {
				assert_eq!(content, "hello");
				assert_eq!(metadata.usage_count, 1);
			}
			RedeemedSecret::File { .. } => panic!("expected text"),
		}

		// Same credentials, second attempt: uniformly NotFound.
		assert!(matches!(
			service.redeem(&id, "pw").await,
			Err(ServerError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_wrong_password_is_not_found() {
		let (service, _broadcaster, _pool) = make_service().await;

		let metadata = service
			.create_from_text(None, "s".to_string(), "pw", None, None)
			.await
			.unwrap();
		let id = SecretId::new(metadata.uuid);

		assert!(matches!(
			service.redeem(&id, "nope").await,
			Err(ServerError::NotFound(_))
		));

		// The failed attempt consumed nothing.
		match service.redeem(&id, "pw").await.unwrap() {
			RedeemedSecret::Text { metadata, .. } => assert_eq!(metadata.usage_count, 1),
			RedeemedSecret::File { .. } => panic!("expected text"),
		}
	}

	#[tokio::test]
	async fn test_file_secret_redeems_with_filename() {
		let (service, _broadcaster, _pool) = make_service().await;

		let metadata = service
			.create_from_file(
				None,
				b"binary payload".to_vec(),
				"payload.bin".to_string(),
				"pw",
				None,
				None,
			)
			.await
			.unwrap();
		assert_eq!(metadata.secret_type, "file");

		let id = SecretId::new(metadata.uuid);
		match service.redeem(&id, "pw").await.unwrap() {
			RedeemedSecret::File { filename, bytes } => {
				assert_eq!(filename, "payload.bin");
				assert_eq!(bytes, b"binary payload");
			}
			RedeemedSecret::Text { .. } => panic!("expected file"),
		}
	}

	#[tokio::test]
	async fn test_unknown_secret_type_defaults_to_text() {
		let (service, _broadcaster, _pool) = make_service().await;
		let missing = SecretId::generate();
		assert_eq!(
			service.secret_type(&missing).await.unwrap(),
			SecretType::Text
		);
	}

	#[tokio::test]
	async fn test_list_requires_caller() {
		let (service, _broadcaster, _pool) = make_service().await;
		assert!(matches!(
			service.list(None, 10, 0).await,
			Err(ServerError::Unauthorized(_))
		));
	}

	#[tokio::test]
	async fn test_owned_create_list_delete() {
		let (service, _broadcaster, pool) = make_service().await;
		let alice = insert_test_user(&pool, "alice", "password", false).await;
		let bob = insert_test_user(&pool, "bob", "password", false).await;

		let metadata = service
			.create_from_text(Some(&alice), "mine".to_string(), "pw", None, None)
			.await
			.unwrap();
		let id = SecretId::new(metadata.uuid);

		let mine = service.list(Some(&alice), 10, 0).await.unwrap();
		assert_eq!(mine.len(), 1);
		assert!(service.list(Some(&bob), 10, 0).await.unwrap().is_empty());

		// Cross-owner delete reports false and leaves the secret intact.
		assert!(!service.delete(&id, &bob).await.unwrap());
		assert!(service.redeem(&id, "pw").await.is_ok());

		let metadata = service
			.create_from_text(Some(&alice), "two".to_string(), "pw", None, None)
			.await
			.unwrap();
		let id2 = SecretId::new(metadata.uuid);
		assert!(service.delete(&id2, &alice).await.unwrap());
	}

	#[tokio::test]
	async fn test_count_tracks_creates() {
		let (service, _broadcaster, _pool) = make_service().await;
		assert_eq!(service.count().await.unwrap(), 0);

		service
			.create_from_text(None, "a".to_string(), "pw", None, None)
			.await
			.unwrap();
		service
			.create_from_text(None, "b".to_string(), "pw", None, None)
			.await
			.unwrap();
		assert_eq!(service.count().await.unwrap(), 2);
	}

	#[tokio::test]
	async fn test_create_signals_broadcaster() {
		let (service, broadcaster, _pool) = make_service().await;

		let waiter = {
			let broadcaster = Arc::clone(&broadcaster);
			tokio::spawn(async move { broadcaster.changed().await })
		};
		tokio::time::sleep(Duration::from_millis(10)).await;

		service
			.create_from_text(None, "ping".to_string(), "pw", None, None)
			.await
			.unwrap();

		timeout(Duration::from_secs(1), waiter)
			.await
			.expect("create should signal the broadcaster")
			.unwrap();
	}
}
