//! Permission, role and assignment map contracts
//!
//! The `*Map` traits are read-only views; the `*Manager` traits add the
//! mutations. Every mutation is idempotent and returns whether the stored
//! state actually changed.

use super::{PermissionId, PrincipalId, RoleId, Setting};

/// Which principals hold which permissions on one resource.
pub trait PrincipalPermissionMap {
    fn principals_for_permission(&self, permission: &PermissionId) -> Vec<(PrincipalId, Setting)>;

    fn permissions_for_principal(&self, principal: &PrincipalId) -> Vec<(PermissionId, Setting)>;

    /// The stored setting, or `default` when nothing applies.
    fn setting(
        &self,
        permission: &PermissionId,
        principal: &PrincipalId,
        default: Setting,
    ) -> Setting;

    fn principals_and_permissions(&self) -> Vec<(PrincipalId, PermissionId, Setting)>;
}

pub trait PrincipalPermissionManager: PrincipalPermissionMap {
    fn grant_permission_to_principal(
        &mut self,
        permission: &PermissionId,
        principal: &PrincipalId,
    ) -> bool;

    fn deny_permission_to_principal(
        &mut self,
        permission: &PermissionId,
        principal: &PrincipalId,
    ) -> bool;

    fn unset_permission_for_principal(
        &mut self,
        permission: &PermissionId,
        principal: &PrincipalId,
    ) -> bool;
}

/// Which roles hold which permissions on one resource.
pub trait RolePermissionMap {
    fn permissions_for_role(&self, role: &RoleId) -> Vec<(PermissionId, Setting)>;

    fn roles_for_permission(&self, permission: &PermissionId) -> Vec<(RoleId, Setting)>;

    fn setting(&self, permission: &PermissionId, role: &RoleId, default: Setting) -> Setting;

    fn roles_and_permissions(&self) -> Vec<(RoleId, PermissionId, Setting)>;
}

pub trait RolePermissionManager: RolePermissionMap {
    fn grant_permission_to_role(&mut self, permission: &PermissionId, role: &RoleId) -> bool;

    fn deny_permission_to_role(&mut self, permission: &PermissionId, role: &RoleId) -> bool;

    fn unset_permission_from_role(&mut self, permission: &PermissionId, role: &RoleId) -> bool;
}

/// Which principals are members of which roles at one resource.
pub trait PrincipalRoleMap {
    fn principals_for_role(&self, role: &RoleId) -> Vec<(PrincipalId, Setting)>;

    fn roles_for_principal(&self, principal: &PrincipalId) -> Vec<(RoleId, Setting)>;

    fn setting(&self, role: &RoleId, principal: &PrincipalId, default: Setting) -> Setting;

    fn principals_and_roles(&self) -> Vec<(RoleId, PrincipalId, Setting)>;
}

pub trait PrincipalRoleManager: PrincipalRoleMap {
    fn assign_role_to_principal(&mut self, role: &RoleId, principal: &PrincipalId) -> bool;

    fn remove_role_from_principal(&mut self, role: &RoleId, principal: &PrincipalId) -> bool;

    fn unset_role_for_principal(&mut self, role: &RoleId, principal: &PrincipalId) -> bool;
}
