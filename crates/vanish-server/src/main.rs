// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Vanish secret-sharing server binary.

use clap::{Parser, Subcommand};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vanish_server::{create_app_state, create_router, ServerConfig};

/// Vanish server - HTTP server for self-destructing secrets.
#[derive(Parser, Debug)]
#[command(name = "vanish-server", about = "Vanish secret-sharing server", version)]
struct Args {
	/// Subcommands for vanish-server (e.g., `version`)
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("vanish-server {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = ServerConfig::load_from_env();

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(
			host = %config.http.host,
			port = config.http.port,
			database = %config.database.url,
			"starting vanish-server"
	);

	// Create database pool and apply schema
	let pool = vanish_server_db::create_pool(&config.database.url).await?;
	vanish_server_db::run_migrations(&pool).await?;

	let state = create_app_state(pool);

	// Reap expired sessions periodically
	{
		let sessions = std::sync::Arc::clone(&state.sessions);
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
			loop {
				interval.tick().await;
				if let Err(e) = sessions.delete_expired().await {
					tracing::warn!(error = %e, "session cleanup failed");
				}
			}
		});
	}

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	// Run server with graceful shutdown
	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}
