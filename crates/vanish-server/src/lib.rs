// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP server for the vanish self-destructing secret service.
//!
//! This crate wires the lifecycle engine ([`service::SecretService`]) to an
//! axum API: password-protected secrets are created with optional expiry and
//! usage limits, redeemed with UUID + password, and audited on every
//! transition. A process-wide [`notify::CountBroadcaster`] drives the live
//! secret-count stream.

pub mod api;
pub mod api_docs;
pub mod auth_middleware;
pub mod config;
pub mod error;
pub mod notify;
pub mod pagination;
pub mod routes;
pub mod service;

pub use api::{create_app_state, create_router, AppState};
pub use api_docs::ApiDoc;
pub use config::ServerConfig;
pub use error::{ErrorResponse, ServerError};
pub use notify::CountBroadcaster;
pub use service::{RedeemedSecret, SecretMetadata, SecretService};
