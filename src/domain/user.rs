//! User domain model

use crate::security::PrincipalId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A platform user, as seen by the authorization core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: PrincipalId,
    /// Name of the site the user was created in, if recorded
    pub creation_site: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: PrincipalId, creation_site: Option<String>) -> Self {
        Self {
            username,
            creation_site,
            created_at: Utc::now(),
        }
    }
}
