//! Business logic layer

pub mod authorization;
pub mod subscription;

pub use authorization::AuthorizationService;
pub use subscription::{create_subscription, SubscriptionService};
