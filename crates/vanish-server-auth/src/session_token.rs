// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bearer-token helpers for login sessions.
//!
//! Tokens are 32 random bytes, hex-encoded, handed to the client once at
//! login. Only the SHA-256 hash of the token is persisted, so a database
//! leak does not expose live credentials.

use rand::RngCore;
use sha2::{Digest, Sha256};

const TOKEN_LEN: usize = 32;

/// Generate a fresh opaque session token.
pub fn generate_session_token() -> String {
	let mut bytes = [0u8; TOKEN_LEN];
	rand::rngs::OsRng.fill_bytes(&mut bytes);
	hex::encode(bytes)
}

/// Hash a session token for storage or lookup.
pub fn session_token_hash(token: &str) -> String {
	hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_tokens_are_unique() {
		assert_ne!(generate_session_token(), generate_session_token());
	}

	#[test]
	fn test_token_is_hex() {
		let token = generate_session_token();
		assert_eq!(token.len(), 2 * TOKEN_LEN);
		assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
	}

	#[test]
	fn test_hash_is_deterministic() {
		let token = generate_session_token();
		assert_eq!(session_token_hash(&token), session_token_hash(&token));
		assert_ne!(session_token_hash(&token), token);
	}
}
