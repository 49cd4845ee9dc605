//! Protected resources and their containment tree

use super::common::ResourceId;
use super::course::{Course, EnrollmentRecord};
use super::subscription::WebhookSubscription;
use super::user::User;
use serde::{Deserialize, Serialize};

/// Name of the folder that holds a site's webhook subscriptions.
pub const SUBSCRIPTIONS_FOLDER: &str = "webhook_subscriptions";

/// A node in the containment tree, from the root down to leaf objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    /// `None` only for the root
    pub parent_id: Option<ResourceId>,
    pub data: ResourceData,
}

impl Resource {
    pub fn root() -> Self {
        Self {
            id: ResourceId::new_v4(),
            parent_id: None,
            data: ResourceData::Root,
        }
    }

    pub fn new(parent_id: ResourceId, data: ResourceData) -> Self {
        Self {
            id: ResourceId::new_v4(),
            parent_id: Some(parent_id),
            data,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.data.kind()
    }

    /// Site name for site resources
    pub fn site_name(&self) -> Option<&str> {
        match &self.data {
            ResourceData::Site { name } => Some(name),
            _ => None,
        }
    }

    pub fn folder_name(&self) -> Option<&str> {
        match &self.data {
            ResourceData::Folder { name } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceData {
    Root,
    Site { name: String },
    Folder { name: String },
    User(User),
    Course(Course),
    EnrollmentRecord(EnrollmentRecord),
    WebhookSubscription(WebhookSubscription),
}

impl ResourceData {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceData::Root => ResourceKind::Root,
            ResourceData::Site { .. } => ResourceKind::Site,
            ResourceData::Folder { .. } => ResourceKind::Folder,
            ResourceData::User(_) => ResourceKind::User,
            ResourceData::Course(_) => ResourceKind::Course,
            ResourceData::EnrollmentRecord(_) => ResourceKind::EnrollmentRecord,
            ResourceData::WebhookSubscription(_) => ResourceKind::WebhookSubscription,
        }
    }
}

/// Resource type used to select security adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Root,
    Site,
    Folder,
    User,
    Course,
    EnrollmentRecord,
    WebhookSubscription,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Root => "root",
            ResourceKind::Site => "site",
            ResourceKind::Folder => "folder",
            ResourceKind::User => "user",
            ResourceKind::Course => "course",
            ResourceKind::EnrollmentRecord => "enrollment_record",
            ResourceKind::WebhookSubscription => "webhook_subscription",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
