// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process-wide "secret count changed" signal.
//!
//! Owned by the composition root and shared by reference: the creation and
//! deletion paths are the producers, the live-count SSE stream is the
//! consumer. Best-effort only: signals may coalesce or be dropped under
//! load, and no correctness rests on delivery.

use tokio::sync::Notify;

/// Broadcast primitive for the live secret counter.
#[derive(Debug, Default)]
pub struct CountBroadcaster {
	notify: Notify,
}

impl CountBroadcaster {
	pub fn new() -> Self {
		Self {
			notify: Notify::new(),
		}
	}

	/// Signal that the secret count changed. Idempotent and non-blocking;
	/// wakes every task currently waiting in [`changed`](Self::changed).
	pub fn signal(&self) {
		self.notify.notify_waiters();
	}

	/// Suspend until the next signal. Auto-resets: a subsequent call waits
	/// for a fresh signal.
	pub async fn changed(&self) {
		self.notify.notified().await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::time::Duration;
	use tokio::time::timeout;

	#[tokio::test]
	async fn test_signal_wakes_waiter() {
		let broadcaster = Arc::new(CountBroadcaster::new());

		let waiter = {
			let broadcaster = Arc::clone(&broadcaster);
			tokio::spawn(async move { broadcaster.changed().await })
		};
		// Let the waiter register before signalling.
		tokio::time::sleep(Duration::from_millis(10)).await;

		broadcaster.signal();
		timeout(Duration::from_secs(1), waiter)
			.await
			.expect("waiter should wake")
			.unwrap();
	}

	#[tokio::test]
	async fn test_signal_wakes_all_waiters() {
		let broadcaster = Arc::new(CountBroadcaster::new());

		let waiters: Vec<_> = (0..3)
			.map(|_| {
				let broadcaster = Arc::clone(&broadcaster);
				tokio::spawn(async move { broadcaster.changed().await })
			})
			.collect();
		tokio::time::sleep(Duration::from_millis(10)).await;

		broadcaster.signal();
		for waiter in waiters {
			timeout(Duration::from_secs(1), waiter)
				.await
				.expect("waiter should wake")
				.unwrap();
		}
	}

	#[tokio::test]
	async fn test_signal_without_waiters_is_noop() {
		let broadcaster = CountBroadcaster::new();
		broadcaster.signal();
		broadcaster.signal();
	}
}
