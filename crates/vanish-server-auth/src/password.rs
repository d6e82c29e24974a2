// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Slow salted credential hashing.
//!
//! Used both for user account passwords and for the redemption gate on
//! secrets. The scheme is PBKDF2-HMAC-SHA256 over the UTF-8 password bytes
//! with a per-hash random 16-byte salt, encoded as
//! `hex(salt) || hex(derived_key)`.
//!
//! # Security Note
//!
//! Production iteration count is 100,000. Tests use a reduced count for
//! speed; the reduced parameters MUST NOT be used in production.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Returns the PBKDF2 iteration count for the build context.
///
/// In production (`#[cfg(not(test))]`), 100,000 iterations.
/// In tests (`#[cfg(test)]`), a minimal count for fast test execution.
#[inline]
fn iterations() -> u32 {
	#[cfg(test)]
	{
		// Fast, insecure iteration count for tests ONLY.
		1_000
	}

	#[cfg(not(test))]
	{
		100_000
	}
}

/// Hash a password with a fresh random salt.
///
/// Returns `hex(salt) || hex(derived_key)`: 32 hex characters of salt
/// followed by 64 hex characters of derived key.
pub fn hash_password(password: &str) -> String {
	let mut salt = [0u8; SALT_LEN];
	rand::rngs::OsRng.fill_bytes(&mut salt);

	let mut key = [0u8; KEY_LEN];
	pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations(), &mut key);

	format!("{}{}", hex::encode(salt), hex::encode(key))
}

/// Verify a password against a stored hash string.
///
/// Re-derives the key with the salt embedded in `stored` and compares in
/// constant time. A malformed stored hash is treated as a non-match rather
/// than an error: it indicates data corruption, and the safe behavior is to
/// fail closed.
pub fn verify_password(password: &str, stored: &str) -> bool {
	let Some((salt, expected)) = decode_stored_hash(stored) else {
		tracing::warn!("malformed stored credential hash");
		return false;
	};

	let mut key = [0u8; KEY_LEN];
	pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations(), &mut key);

	key.ct_eq(&expected).into()
}

fn decode_stored_hash(stored: &str) -> Option<([u8; SALT_LEN], [u8; KEY_LEN])> {
	if stored.len() != 2 * (SALT_LEN + KEY_LEN) {
		return None;
	}
	let (salt_hex, key_hex) = stored.split_at(2 * SALT_LEN);

	let mut salt = [0u8; SALT_LEN];
	hex::decode_to_slice(salt_hex, &mut salt).ok()?;

	let mut key = [0u8; KEY_LEN];
	hex::decode_to_slice(key_hex, &mut key).ok()?;

	Some((salt, key))
}
