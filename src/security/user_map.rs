//! Computed permission map for users
//!
//! Lets site admins receive events about the users they administer, e.g.
//! when a webhook created by a site admin is delivered for a user object.
//! Nothing here is stored; the admin set is recomputed for every map.

use super::directory::SiteAdminDirectory;
use super::map::PrincipalPermissionMap;
use super::{PermissionId, PrincipalId, Setting, ACT_VIEW_EVENTS};
use crate::domain::User;
use std::cell::OnceCell;
use std::collections::HashSet;
use std::sync::Arc;

/// Permissions effective site admins hold on a user
pub const SITE_ADMIN_PERMISSIONS: &[PermissionId] = &[ACT_VIEW_EVENTS];

pub struct UserPrincipalPermissionMap<'a> {
    user: &'a User,
    directory: Option<Arc<dyn SiteAdminDirectory>>,
    effective_admins: OnceCell<Vec<PrincipalId>>,
}

impl<'a> UserPrincipalPermissionMap<'a> {
    pub fn new(user: &'a User, directory: Option<Arc<dyn SiteAdminDirectory>>) -> Self {
        Self {
            user,
            directory,
            effective_admins: OnceCell::new(),
        }
    }

    fn supports(permission: &PermissionId) -> bool {
        SITE_ADMIN_PERMISSIONS.contains(permission)
    }

    /// Site admins able to administer this user, computed on first use.
    pub fn effective_admins(&self) -> &[PrincipalId] {
        self.effective_admins
            .get_or_init(|| self.compute_effective_admins())
    }

    fn compute_effective_admins(&self) -> Vec<PrincipalId> {
        let Some(directory) = &self.directory else {
            tracing::warn!(
                user = %self.user.username,
                "Site admin directory unavailable, no effective admins"
            );
            return Vec::new();
        };

        let admins = match directory.site_admins() {
            Ok(admins) => admins,
            Err(e) => {
                tracing::warn!(
                    user = %self.user.username,
                    error = %e,
                    "Failed to enumerate site admins, no effective admins"
                );
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        admins
            .into_iter()
            .filter(|admin| seen.insert(admin.clone()))
            .filter(|admin| match directory.can_administer_user(admin, self.user) {
                Ok(can_admin) => can_admin,
                Err(e) => {
                    tracing::warn!(
                        user = %self.user.username,
                        admin = %admin,
                        error = %e,
                        "Site admin scope check failed, treating as not an admin"
                    );
                    false
                }
            })
            .collect()
    }

    fn is_effective_admin(&self, principal: &PrincipalId) -> bool {
        self.effective_admins().contains(principal)
    }
}

impl PrincipalPermissionMap for UserPrincipalPermissionMap<'_> {
    fn principals_for_permission(&self, permission: &PermissionId) -> Vec<(PrincipalId, Setting)> {
        if !Self::supports(permission) {
            return Vec::new();
        }
        self.effective_admins()
            .iter()
            .map(|admin| (admin.clone(), Setting::Allow))
            .collect()
    }

    fn permissions_for_principal(&self, principal: &PrincipalId) -> Vec<(PermissionId, Setting)> {
        if !self.is_effective_admin(principal) {
            return Vec::new();
        }
        SITE_ADMIN_PERMISSIONS
            .iter()
            .map(|permission| (permission.clone(), Setting::Allow))
            .collect()
    }

    fn setting(
        &self,
        permission: &PermissionId,
        principal: &PrincipalId,
        default: Setting,
    ) -> Setting {
        if Self::supports(permission) && self.is_effective_admin(principal) {
            Setting::Allow
        } else {
            default
        }
    }

    fn principals_and_permissions(&self) -> Vec<(PrincipalId, PermissionId, Setting)> {
        self.effective_admins()
            .iter()
            .flat_map(|admin| {
                SITE_ADMIN_PERMISSIONS
                    .iter()
                    .map(move |permission| (admin.clone(), permission.clone(), Setting::Allow))
            })
            .collect()
    }
}
