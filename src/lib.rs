//! Zapier authorization core
//!
//! This crate decides whether a principal may act on a protected resource of
//! the Zapier integration: webhook subscriptions, enrollment records and
//! users. It keeps per-resource grants, computes per-user site-admin
//! permissions, and upgrades stored data between schema generations.

pub mod config;
pub mod domain;
pub mod error;
pub mod generations;
pub mod migration;
pub mod repository;
pub mod security;
pub mod service;
pub mod store;
pub mod subscribers;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
