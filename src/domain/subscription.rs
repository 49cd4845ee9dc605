//! Webhook subscription models

use crate::security::{PermissionId, PrincipalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Platform events an integration can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "user.created")]
    UserCreated,
    #[serde(rename = "user.enrolled")]
    UserEnrolled,
    #[serde(rename = "course.created")]
    CourseCreated,
    #[serde(rename = "course.progress_updated")]
    ProgressUpdated,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::UserCreated,
        EventType::UserEnrolled,
        EventType::CourseCreated,
        EventType::ProgressUpdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::UserCreated => "user.created",
            EventType::UserEnrolled => "user.enrolled",
            EventType::CourseCreated => "course.created",
            EventType::ProgressUpdated => "course.progress_updated",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| format!("unknown event type: {}", s))
    }
}

/// Delivery dialect of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Created through the Zapier integration; hidden from site admins
    Zapier,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub target: String,
    pub event: EventType,
    pub dialect: Dialect,
    pub owner_id: Option<PrincipalId>,
    /// Permission the owner needs on an event's object for delivery
    pub permission_id: PermissionId,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a subscription
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSubscriptionInput {
    #[validate(url, custom(function = "validate_http_target"))]
    pub target: String,
    #[validate(custom(function = "validate_event_type"))]
    pub event_type: String,
}

fn validate_http_target(target: &str) -> Result<(), validator::ValidationError> {
    if target.starts_with("https://") || target.starts_with("http://") {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_target_scheme"))
    }
}

fn validate_event_type(event_type: &str) -> Result<(), validator::ValidationError> {
    event_type
        .parse::<EventType>()
        .map(|_| ())
        .map_err(|_| validator::ValidationError::new("invalid_event_type"))
}
