// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User accounts.
//!
//! A user optionally owns secrets; ownership governs who may delete a secret
//! or list it outside of redemption. The `is_admin` flag grants read access
//! to all secrets and the audit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Reserved usernames that cannot be registered.
pub const RESERVED_USERNAMES: &[&str] = &[
	"root",
	"admin",
	"administrator",
	"system",
	"support",
	"help",
	"api",
	"auth",
	"login",
	"logout",
	"register",
	"secrets",
	"vanish",
	"null",
	"none",
	"anonymous",
	"guest",
	"user",
	"test",
];

/// Check if a username is reserved.
pub fn is_username_reserved(username: &str) -> bool {
	let lower = username.to_lowercase();
	RESERVED_USERNAMES.iter().any(|&reserved| reserved == lower)
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	/// Unique identifier for this user.
	pub id: UserId,

	/// Unique login name.
	pub username: String,

	/// Stored credential hash (see [`crate::password`]). Never serialized
	/// into API responses; kept here because the entity maps 1:1 to its row.
	#[serde(skip_serializing)]
	pub hashed_password: String,

	/// Whether this user may read all secrets and audit logs.
	pub is_admin: bool,

	/// When the account was created.
	pub created_at: DateTime<Utc>,
}

/// Validates a username.
/// Rules:
/// - 3-32 characters
/// - Alphanumeric and underscores only
/// - Cannot start with underscore
/// - Cannot be a reserved username
pub fn validate_username(username: &str) -> Result<(), &'static str> {
	if username.len() < 3 {
		return Err("Username must be at least 3 characters");
	}
	if username.len() > 32 {
		return Err("Username must be at most 32 characters");
	}
	if !username
		.chars()
		.all(|c| c.is_ascii_alphanumeric() || c == '_')
	{
		return Err("Username can only contain letters, numbers, and underscores");
	}
	if username.starts_with('_') {
		return Err("Username cannot start with underscore");
	}
	if is_username_reserved(username) {
		return Err("This username is reserved");
	}
	Ok(())
}
