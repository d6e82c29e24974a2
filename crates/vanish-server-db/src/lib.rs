// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for the vanish server.
//!
//! This crate provides SQLite-backed repositories for the secret lifecycle:
//! - [`SecretRepository`] - creation, password-gated redemption, listing,
//!   deletion
//! - [`SecretLogRepository`] - the append-only audit trail
//! - [`UserRepository`] / [`SessionRepository`] - accounts and bearer
//!   sessions
//!
//! Redemption is transactional: the predicate check, hash gate, usage-count
//! increment and audit appends commit or roll back as a unit.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod secret;
pub mod secret_log;
pub mod session;
pub mod testing;
pub mod user;

pub use error::DbError;
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use secret::{
	Secret, SecretContent, SecretPayload, SecretRepository, SecretStore, SecretSummary, SecretType,
};
pub use secret_log::{LogAction, SecretLogEntry, SecretLogRepository, SecretLogStore};
pub use session::SessionRepository;
pub use user::{UserRepository, UserStore};
