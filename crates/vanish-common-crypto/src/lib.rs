// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Password-derived authenticated encryption for secret payloads.
//!
//! The encryption key is the SHA-256 digest of the redemption password:
//! deliberately no per-record salt and no slow KDF, so the same password
//! always reproduces the same key without storing anything alongside the
//! ciphertext. Brute-force resistance is the job of the credential hash gate
//! in `vanish-server-auth`, which is checked before decryption is ever
//! attempted; this layer only protects payload confidentiality at rest.
//!
//! Construction: XChaCha20-Poly1305 with a fresh random 24-byte nonce,
//! emitted as `nonce || ciphertext+tag`.

use chacha20poly1305::{
	aead::{Aead, KeyInit, OsRng},
	AeadCore, Key, XChaCha20Poly1305, XNonce,
};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Length of the XChaCha20-Poly1305 nonce prepended to every ciphertext.
pub const NONCE_LEN: usize = 24;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
	/// Encryption failed. Should not occur with a well-formed key.
	#[error("encryption failed")]
	Encryption,

	/// Wrong password, truncated input, or corrupted ciphertext.
	/// The causes are indistinguishable by design.
	#[error("decryption failed")]
	Decryption,
}

/// Derive the 256-bit payload key from the redemption password.
fn derive_key(password: &str) -> Zeroizing<[u8; 32]> {
	Zeroizing::new(Sha256::digest(password.as_bytes()).into())
}

/// Encrypt `plaintext` under a key derived from `password`.
///
/// Returns `nonce || ciphertext+tag`. Every call uses a fresh random nonce,
/// so encrypting the same plaintext twice yields different outputs.
pub fn encrypt(plaintext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
	let key = derive_key(password);
	let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
	let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

	let ciphertext = cipher
		.encrypt(&nonce, plaintext)
		.map_err(|_| CryptoError::Encryption)?;

	let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
	out.extend_from_slice(&nonce);
	out.extend_from_slice(&ciphertext);
	Ok(out)
}

/// Decrypt a `nonce || ciphertext+tag` blob produced by [`encrypt`].
///
/// Fails with [`CryptoError::Decryption`] when the password is wrong or the
/// blob has been truncated or tampered with (the Poly1305 tag check fails).
pub fn decrypt(ciphertext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
	if ciphertext.len() < NONCE_LEN {
		return Err(CryptoError::Decryption);
	}
	let (nonce, body) = ciphertext.split_at(NONCE_LEN);

	let key = derive_key(password);
	let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_ref()));

	cipher
		.decrypt(XNonce::from_slice(nonce), body)
		.map_err(|_| CryptoError::Decryption)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_round_trip() {
		let ciphertext = encrypt(b"hello", "pw").unwrap();
		let plaintext = decrypt(&ciphertext, "pw").unwrap();
		assert_eq!(plaintext, b"hello");
	}

	#[test]
	fn test_round_trip_empty_plaintext() {
		let ciphertext = encrypt(b"", "pw").unwrap();
		assert_eq!(decrypt(&ciphertext, "pw").unwrap(), b"");
	}

	#[test]
	fn test_wrong_password_fails() {
		let ciphertext = encrypt(b"hello", "pw").unwrap();
		assert!(matches!(
			decrypt(&ciphertext, "not-pw"),
			Err(CryptoError::Decryption)
		));
	}

	#[test]
	fn test_tampered_ciphertext_fails() {
		let mut ciphertext = encrypt(b"hello", "pw").unwrap();
		let last = ciphertext.len() - 1;
		ciphertext[last] ^= 0x01;
		assert!(matches!(
			decrypt(&ciphertext, "pw"),
			Err(CryptoError::Decryption)
		));
	}

	#[test]
	fn test_truncated_ciphertext_fails() {
		let ciphertext = encrypt(b"hello", "pw").unwrap();
		assert!(decrypt(&ciphertext[..NONCE_LEN - 1], "pw").is_err());
		assert!(decrypt(&[], "pw").is_err());
	}

	#[test]
	fn test_fresh_nonce_per_call() {
		let a = encrypt(b"hello", "pw").unwrap();
		let b = encrypt(b"hello", "pw").unwrap();
		assert_ne!(a, b);
	}

	proptest! {
		#[test]
		fn round_trip_any_payload(plaintext in proptest::collection::vec(any::<u8>(), 0..2048), password in ".{0,64}") {
			let ciphertext = encrypt(&plaintext, &password).unwrap();
			prop_assert_eq!(decrypt(&ciphertext, &password).unwrap(), plaintext);
		}

		#[test]
		fn wrong_password_never_decrypts(payload in proptest::collection::vec(any::<u8>(), 1..256)) {
			let ciphertext = encrypt(&payload, "correct").unwrap();
			prop_assert!(decrypt(&ciphertext, "incorrect").is_err());
		}
	}
}
