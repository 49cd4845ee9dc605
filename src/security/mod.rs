//! Permission resolution for protected resources
//!
//! Grants are kept per resource in a [`SecurityAnnotation`]. The
//! [`SecurityPolicy`] walks a resource's containment chain and combines
//! principal grants, role grants and computed per-kind maps into a single
//! decision.

pub mod annotation;
pub mod directory;
pub mod enrollment;
pub mod map;
pub mod policy;
pub mod registry;
pub mod subscription;
pub mod user_map;

pub use annotation::{PrincipalPermissions, PrincipalRoles, RolePermissions, SecurityAnnotation};
pub use directory::{SiteAdminDirectory, SiteScopedDirectory};
pub use map::{
    PrincipalPermissionManager, PrincipalPermissionMap, PrincipalRoleManager, PrincipalRoleMap,
    RolePermissionManager, RolePermissionMap,
};
pub use policy::{Decision, DecisionSource, SecurityPolicy};
pub use registry::{AdapterRegistry, SecurityAdapter};
pub use user_map::UserPrincipalPermissionMap;

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Read access (`zope.View`)
pub const ACT_READ: PermissionId = PermissionId::from_static("zope.View");
/// Delete access
pub const ACT_DELETE: PermissionId = PermissionId::from_static("nti.actions.delete");
/// Can receive events for the associated object
pub const ACT_VIEW_EVENTS: PermissionId = PermissionId::from_static("nti.actions.view_events");

/// Platform administrators, across all sites
pub const ROLE_ADMIN: RoleId = RoleId::from_static("role:nti.admin");
/// Administrators of a single site
pub const ROLE_SITE_ADMIN: RoleId = RoleId::from_static("role:nti.dataserver.site-admin");

/// A single grant value.
///
/// `Unset` is the absence of a grant and is never stored; `Deny` is stored
/// explicitly so it can be told apart from a missing grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Setting {
    Allow,
    Deny,
    Unset,
}

impl Setting {
    pub fn is_unset(self) -> bool {
        self == Setting::Unset
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Setting::Allow => "allow",
            Setting::Deny => "deny",
            Setting::Unset => "unset",
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! security_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            pub const fn from_static(id: &'static str) -> Self {
                Self(Cow::Borrowed(id))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(Cow::Owned(id.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(Cow::Owned(id))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

security_id!(
    /// Identity of an authenticated user (e.g. a username)
    PrincipalId
);
security_id!(
    /// Identity of a synthetic role, always prefixed with `role:`
    RoleId
);
security_id!(
    /// Named capability checked against a resource (e.g. `zope.View`)
    PermissionId
);

impl PrincipalId {
    /// Parse a principal id supplied from outside the process.
    pub fn parse(id: &str) -> Result<Self> {
        if PRINCIPAL_ID_REGEX.is_match(id) {
            Ok(Self::from(id))
        } else {
            Err(AppError::Validation(format!("invalid principal id: {:?}", id)))
        }
    }
}

impl RoleId {
    pub fn parse(id: &str) -> Result<Self> {
        if ROLE_ID_REGEX.is_match(id) {
            Ok(Self::from(id))
        } else {
            Err(AppError::Validation(format!("invalid role id: {:?}", id)))
        }
    }
}

impl PermissionId {
    pub fn parse(id: &str) -> Result<Self> {
        if PERMISSION_ID_REGEX.is_match(id) {
            Ok(Self::from(id))
        } else {
            Err(AppError::Validation(format!("invalid permission id: {:?}", id)))
        }
    }
}

lazy_static::lazy_static! {
    static ref PRINCIPAL_ID_REGEX: regex::Regex =
        regex::Regex::new(r"^[^\s:][^\s]{0,127}$").unwrap();
    static ref ROLE_ID_REGEX: regex::Regex =
        regex::Regex::new(r"^role:[A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)*$").unwrap();
    static ref PERMISSION_ID_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z][A-Za-z0-9_\-]*(?:\.[A-Za-z0-9_\-]+)+$").unwrap();
}
