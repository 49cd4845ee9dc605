//! Data access layer (Repository pattern)

pub mod security;

pub use security::{GenerationMark, SecurityRepository, SecurityRepositoryImpl};
