//! Permission adapters for enrollment records
//!
//! Both adapters bring the record's annotation to its baseline every time
//! they are built: the enrolled principal and platform admins can read the
//! record. Building them is therefore idempotent and never removes grants
//! made by other code.

use super::annotation::{PrincipalPermissions, RolePermissions, SecurityAnnotation};
use super::map::{
    PrincipalPermissionManager, PrincipalPermissionMap, RolePermissionManager, RolePermissionMap,
};
use super::{PermissionId, PrincipalId, RoleId, Setting, ACT_READ, ROLE_ADMIN};
use crate::domain::EnrollmentRecord;

/// Apply the baseline grants for `record`. Returns whether anything changed.
pub fn initialize_enrollment_annotation(
    record: &EnrollmentRecord,
    annotation: &mut SecurityAnnotation,
) -> bool {
    let mut changed = false;
    if let Some(principal) = &record.principal {
        changed |= PrincipalPermissions::new(&mut *annotation)
            .grant_permission_to_principal(&ACT_READ, principal);
    }
    changed |=
        RolePermissions::new(&mut *annotation).grant_permission_to_role(&ACT_READ, &ROLE_ADMIN);
    changed
}

/// Principal grants of an enrollment record.
pub struct EnrollmentRecordPrincipalPermissionManager<'a> {
    inner: PrincipalPermissions<&'a mut SecurityAnnotation>,
    initialized: bool,
}

impl<'a> EnrollmentRecordPrincipalPermissionManager<'a> {
    pub fn new(record: &EnrollmentRecord, annotation: &'a mut SecurityAnnotation) -> Self {
        let initialized = initialize_enrollment_annotation(record, annotation);
        Self {
            inner: PrincipalPermissions::new(annotation),
            initialized,
        }
    }

    /// Whether building this manager added baseline grants.
    pub fn initialized(&self) -> bool {
        self.initialized
    }
}

impl PrincipalPermissionMap for EnrollmentRecordPrincipalPermissionManager<'_> {
    fn principals_for_permission(&self, permission: &PermissionId) -> Vec<(PrincipalId, Setting)> {
        self.inner.principals_for_permission(permission)
    }

    fn permissions_for_principal(&self, principal: &PrincipalId) -> Vec<(PermissionId, Setting)> {
        self.inner.permissions_for_principal(principal)
    }

    fn setting(
        &self,
        permission: &PermissionId,
        principal: &PrincipalId,
        default: Setting,
    ) -> Setting {
        self.inner.setting(permission, principal, default)
    }

    fn principals_and_permissions(&self) -> Vec<(PrincipalId, PermissionId, Setting)> {
        self.inner.principals_and_permissions()
    }
}

impl PrincipalPermissionManager for EnrollmentRecordPrincipalPermissionManager<'_> {
    fn grant_permission_to_principal(
        &mut self,
        permission: &PermissionId,
        principal: &PrincipalId,
    ) -> bool {
        self.inner.grant_permission_to_principal(permission, principal)
    }

    fn deny_permission_to_principal(
        &mut self,
        permission: &PermissionId,
        principal: &PrincipalId,
    ) -> bool {
        self.inner.deny_permission_to_principal(permission, principal)
    }

    fn unset_permission_for_principal(
        &mut self,
        permission: &PermissionId,
        principal: &PrincipalId,
    ) -> bool {
        self.inner.unset_permission_for_principal(permission, principal)
    }
}

/// Role grants of an enrollment record.
pub struct EnrollmentRecordRolePermissionManager<'a> {
    inner: RolePermissions<&'a mut SecurityAnnotation>,
    initialized: bool,
}

impl<'a> EnrollmentRecordRolePermissionManager<'a> {
    pub fn new(record: &EnrollmentRecord, annotation: &'a mut SecurityAnnotation) -> Self {
        let initialized = initialize_enrollment_annotation(record, annotation);
        Self {
            inner: RolePermissions::new(annotation),
            initialized,
        }
    }

    /// Whether building this manager added baseline grants.
    pub fn initialized(&self) -> bool {
        self.initialized
    }
}

impl RolePermissionMap for EnrollmentRecordRolePermissionManager<'_> {
    fn permissions_for_role(&self, role: &RoleId) -> Vec<(PermissionId, Setting)> {
        self.inner.permissions_for_role(role)
    }

    fn roles_for_permission(&self, permission: &PermissionId) -> Vec<(RoleId, Setting)> {
        self.inner.roles_for_permission(permission)
    }

    fn setting(&self, permission: &PermissionId, role: &RoleId, default: Setting) -> Setting {
        self.inner.setting(permission, role, default)
    }

    fn roles_and_permissions(&self) -> Vec<(RoleId, PermissionId, Setting)> {
        self.inner.roles_and_permissions()
    }
}

impl RolePermissionManager for EnrollmentRecordRolePermissionManager<'_> {
    fn grant_permission_to_role(&mut self, permission: &PermissionId, role: &RoleId) -> bool {
        self.inner.grant_permission_to_role(permission, role)
    }

    fn deny_permission_to_role(&mut self, permission: &PermissionId, role: &RoleId) -> bool {
        self.inner.deny_permission_to_role(permission, role)
    }

    fn unset_permission_from_role(&mut self, permission: &PermissionId, role: &RoleId) -> bool {
        self.inner.unset_permission_from_role(permission, role)
    }
}
