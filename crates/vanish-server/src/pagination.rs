// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared pagination utilities for API handlers.

use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PaginationParams {
	/// Number of items to skip from the start of the listing.
	pub skip: Option<i64>,
	/// Maximum number of items to return.
	pub limit: Option<i64>,
}

impl PaginationParams {
	pub fn limit_clamped(&self, default: i64, max: i64) -> i64 {
		self.limit.unwrap_or(default).min(max).max(1)
	}

	pub fn skip_or_default(&self) -> i64 {
		self.skip.unwrap_or(0).max(0)
	}
}
