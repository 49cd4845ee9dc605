//! Configuration management for the authorization core

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "json" for flattened JSON lines, anything else for plain text
    pub log_format: String,
    pub service_name: String,
    /// Install a Prometheus recorder for the process
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            service_name: "zapier-authz".to_string(),
            metrics_enabled: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            telemetry: TelemetryConfig::from_env(),
        })
    }
}

impl TelemetryConfig {
    /// Telemetry settings alone; never fails.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_format: env::var("LOG_FORMAT").unwrap_or(defaults.log_format),
            service_name: env::var("SERVICE_NAME").unwrap_or(defaults.service_name),
            metrics_enabled: env::var("METRICS_ENABLED")
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    pub fn is_json(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}
