//! Domain models for the authorization core

pub mod common;
pub mod course;
pub mod resource;
pub mod subscription;
pub mod user;

pub use common::*;
pub use course::*;
pub use resource::*;
pub use subscription::*;
pub use user::*;
