//! Course and enrollment models

use super::common::ResourceId;
use crate::security::PrincipalId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub provider_id: Option<String>,
}

/// A user's enrollment in a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub course_id: ResourceId,
    /// Enrolled principal. Optional: records may exist with a broken or
    /// missing principal reference.
    pub principal: Option<PrincipalId>,
    pub scope: String,
    pub created_at: DateTime<Utc>,
}

impl EnrollmentRecord {
    pub fn new(course_id: ResourceId, principal: Option<PrincipalId>) -> Self {
        Self {
            course_id,
            principal,
            scope: "Public".to_string(),
            created_at: Utc::now(),
        }
    }
}
