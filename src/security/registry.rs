//! Per-kind security adapters

use super::annotation::SecurityAnnotation;
use super::directory::SiteAdminDirectory;
use super::enrollment::{
    EnrollmentRecordPrincipalPermissionManager, EnrollmentRecordRolePermissionManager,
};
use super::map::PrincipalPermissionMap;
use super::user_map::UserPrincipalPermissionMap;
use crate::domain::{Resource, ResourceData, ResourceKind};
use std::collections::HashMap;
use std::sync::Arc;

/// How the policy reads and prepares security for one kind of resource.
pub trait SecurityAdapter: Send + Sync {
    /// Bring the stored annotation to its baseline before it is consulted.
    /// Returns whether the annotation changed.
    fn prepare(&self, _resource: &Resource, _annotation: &mut SecurityAnnotation) -> bool {
        false
    }

    /// A principal permission map derived from the resource rather than
    /// stored with it.
    fn computed_map<'a>(
        &'a self,
        _resource: &'a Resource,
    ) -> Option<Box<dyn PrincipalPermissionMap + 'a>> {
        None
    }
}

/// Stored grants only.
#[derive(Debug, Default)]
pub struct AnnotationAdapter;

impl SecurityAdapter for AnnotationAdapter {}

#[derive(Debug, Default)]
pub struct EnrollmentRecordAdapter;

impl SecurityAdapter for EnrollmentRecordAdapter {
    fn prepare(&self, resource: &Resource, annotation: &mut SecurityAnnotation) -> bool {
        match &resource.data {
            ResourceData::EnrollmentRecord(record) => {
                let principals =
                    EnrollmentRecordPrincipalPermissionManager::new(record, annotation);
                let changed = principals.initialized();
                let roles = EnrollmentRecordRolePermissionManager::new(record, annotation);
                changed | roles.initialized()
            }
            _ => false,
        }
    }
}

pub struct UserAdapter {
    directory: Option<Arc<dyn SiteAdminDirectory>>,
}

impl UserAdapter {
    pub fn new(directory: Option<Arc<dyn SiteAdminDirectory>>) -> Self {
        Self { directory }
    }
}

impl SecurityAdapter for UserAdapter {
    fn computed_map<'a>(
        &'a self,
        resource: &'a Resource,
    ) -> Option<Box<dyn PrincipalPermissionMap + 'a>> {
        match &resource.data {
            ResourceData::User(user) => Some(Box::new(UserPrincipalPermissionMap::new(
                user,
                self.directory.clone(),
            ))),
            _ => None,
        }
    }
}

static ANNOTATION_ADAPTER: AnnotationAdapter = AnnotationAdapter;

/// Adapter lookup by resource kind. Kinds without a registration use
/// [`AnnotationAdapter`].
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ResourceKind, Box<dyn SecurityAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the enrollment and user adapters installed.
    pub fn with_defaults(directory: Option<Arc<dyn SiteAdminDirectory>>) -> Self {
        let mut registry = Self::new();
        registry.register(ResourceKind::EnrollmentRecord, EnrollmentRecordAdapter);
        registry.register(ResourceKind::User, UserAdapter::new(directory));
        registry
    }

    /// Install an adapter, replacing any previous one for `kind`.
    pub fn register<A: SecurityAdapter + 'static>(&mut self, kind: ResourceKind, adapter: A) {
        self.adapters.insert(kind, Box::new(adapter));
    }

    pub fn dispatch(&self, kind: ResourceKind) -> &dyn SecurityAdapter {
        match self.adapters.get(&kind) {
            Some(adapter) => adapter.as_ref(),
            None => &ANNOTATION_ADAPTER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EnrollmentRecord, ResourceId, User};
    use crate::security::{
        PrincipalId, RolePermissionMap, RolePermissions, Setting, SiteScopedDirectory, ACT_READ,
        ACT_VIEW_EVENTS, ROLE_ADMIN,
    };

    fn user_resource(name: &str, site: &str) -> Resource {
        Resource::new(
            ResourceId::new_v4(),
            ResourceData::User(User::new(PrincipalId::from(name), Some(site.to_string()))),
        )
    }

    #[test]
    fn test_unregistered_kind_uses_annotation_adapter() {
        let registry = AdapterRegistry::new();
        let resource = user_resource("joe", "alpha.nextthought.com");
        let mut annotation = SecurityAnnotation::default();

        let adapter = registry.dispatch(ResourceKind::User);
        assert!(!adapter.prepare(&resource, &mut annotation));
        assert!(adapter.computed_map(&resource).is_none());
    }

    #[test]
    fn test_enrollment_adapter_prepares_annotation() {
        let registry = AdapterRegistry::with_defaults(None);
        let resource = Resource::new(
            ResourceId::new_v4(),
            ResourceData::EnrollmentRecord(EnrollmentRecord::new(
                ResourceId::new_v4(),
                Some(PrincipalId::from("joe")),
            )),
        );
        let mut annotation = SecurityAnnotation::default();

        let adapter = registry.dispatch(ResourceKind::EnrollmentRecord);
        assert!(adapter.prepare(&resource, &mut annotation));
        assert!(!adapter.prepare(&resource, &mut annotation));
        assert_eq!(
            RolePermissions::new(&annotation).setting(&ACT_READ, &ROLE_ADMIN, Setting::Unset),
            Setting::Allow
        );
    }

    #[test]
    fn test_user_adapter_computes_admin_map() {
        let directory: Arc<dyn SiteAdminDirectory> = Arc::new(
            SiteScopedDirectory::new()
                .with_admin(PrincipalId::from("site.admin"), "alpha.nextthought.com"),
        );
        let registry = AdapterRegistry::with_defaults(Some(directory));
        let resource = user_resource("joe", "alpha.nextthought.com");

        let map = registry
            .dispatch(ResourceKind::User)
            .computed_map(&resource)
            .unwrap();
        assert_eq!(
            map.setting(&ACT_VIEW_EVENTS, &PrincipalId::from("site.admin"), Setting::Unset),
            Setting::Allow
        );
    }

    #[test]
    fn test_user_adapter_ignores_other_kinds() {
        let adapter = UserAdapter::new(None);
        let site = Resource::new(
            ResourceId::new_v4(),
            ResourceData::Site {
                name: "alpha.nextthought.com".to_string(),
            },
        );
        assert!(adapter.computed_map(&site).is_none());
    }
}
