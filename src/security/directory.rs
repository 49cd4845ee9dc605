//! Site-admin directory: who the site admins are, and whom they administer

use super::annotation::PrincipalRoles;
use super::map::PrincipalRoleMap;
use super::{PrincipalId, Setting, ROLE_SITE_ADMIN};
use crate::domain::User;
use crate::error::Result;
use crate::store::ObjectStore;
use std::collections::{BTreeMap, BTreeSet};

/// External view of site administration.
///
/// Implementations decide cross-site scoping; the permission maps built on
/// top of this never re-derive it.
#[cfg_attr(test, mockall::automock)]
pub trait SiteAdminDirectory: Send + Sync {
    /// Every principal that is a site admin anywhere
    fn site_admins(&self) -> Result<Vec<PrincipalId>>;

    fn can_administer_user(&self, admin: &PrincipalId, user: &User) -> Result<bool>;
}

/// Directory where an admin administers exactly the users created in the
/// sites they administer.
#[derive(Debug, Clone, Default)]
pub struct SiteScopedDirectory {
    admin_sites: BTreeMap<PrincipalId, BTreeSet<String>>,
}

impl SiteScopedDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admin(mut self, admin: PrincipalId, site_name: impl Into<String>) -> Self {
        self.admin_sites
            .entry(admin)
            .or_default()
            .insert(site_name.into());
        self
    }

    /// Collect site admins from the site-admin role assignments stored on
    /// each site.
    pub fn from_store<S: ObjectStore + ?Sized>(store: &S) -> Self {
        let mut directory = Self::new();
        for site_id in store.sites() {
            let (Some(site), Some(annotation)) = (store.resource(site_id), store.annotation(site_id))
            else {
                continue;
            };
            let Some(site_name) = site.site_name() else {
                continue;
            };
            for (principal, setting) in
                PrincipalRoles::new(annotation).principals_for_role(&ROLE_SITE_ADMIN)
            {
                if setting == Setting::Allow {
                    directory
                        .admin_sites
                        .entry(principal)
                        .or_default()
                        .insert(site_name.to_string());
                }
            }
        }
        directory
    }

    pub fn admin_sites(&self, admin: &PrincipalId) -> Option<&BTreeSet<String>> {
        self.admin_sites.get(admin)
    }
}

impl SiteAdminDirectory for SiteScopedDirectory {
    fn site_admins(&self) -> Result<Vec<PrincipalId>> {
        Ok(self.admin_sites.keys().cloned().collect())
    }

    fn can_administer_user(&self, admin: &PrincipalId, user: &User) -> Result<bool> {
        Ok(match (self.admin_sites(admin), user.creation_site.as_deref()) {
            (Some(sites), Some(user_site)) => sites.contains(user_site),
            _ => false,
        })
    }
}
