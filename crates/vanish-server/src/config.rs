// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server configuration resolved from environment variables.
//!
//! All variables use the `VANISH_SERVER_*` prefix and fall back to local
//! development defaults.

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
	pub host: String,
	pub port: u16,
}

impl Default for HttpConfig {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_string(),
			port: 8081,
		}
	}
}

/// Database settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub url: String,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			url: "sqlite:./vanish.db".to_string(),
		}
	}
}

/// Logging settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
	pub level: String,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
		}
	}
}

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Load configuration from `VANISH_SERVER_*` environment variables,
	/// falling back to defaults for anything unset or unparseable.
	pub fn load_from_env() -> Self {
		let mut config = Self::default();

		if let Ok(host) = std::env::var("VANISH_SERVER_HOST") {
			config.http.host = host;
		}
		if let Ok(port) = std::env::var("VANISH_SERVER_PORT") {
			match port.parse() {
				Ok(port) => config.http.port = port,
				Err(_) => {
					tracing::warn!(value = %port, "invalid VANISH_SERVER_PORT, using default")
				}
			}
		}
		if let Ok(url) = std::env::var("VANISH_SERVER_DATABASE_URL") {
			config.database.url = url;
		}
		if let Ok(level) = std::env::var("VANISH_SERVER_LOG") {
			config.logging.level = level;
		}

		config
	}

	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = ServerConfig::default();
		assert_eq!(config.http.port, 8081);
		assert_eq!(config.database.url, "sqlite:./vanish.db");
		assert_eq!(config.logging.level, "info");
	}

	#[test]
	fn test_socket_addr() {
		let config = ServerConfig::default();
		assert_eq!(config.socket_addr(), "127.0.0.1:8081");
	}
}
