//! Per-resource grant bookkeeping
//!
//! A [`SecurityAnnotation`] is stored alongside each protected resource,
//! keyed by resource id. The wrappers in this module expose it through the
//! map/manager contracts; they work over `&SecurityAnnotation` for reads and
//! `&mut SecurityAnnotation` for writes.

use super::map::{
    PrincipalPermissionManager, PrincipalPermissionMap, PrincipalRoleManager, PrincipalRoleMap,
    RolePermissionManager, RolePermissionMap,
};
use super::{PermissionId, PrincipalId, RoleId, Setting};
use serde::{Deserialize, Serialize};
use std::borrow::{Borrow, BorrowMut};
use std::collections::BTreeMap;

/// Two-level table of explicit settings. Only `Allow` and `Deny` are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "R: Serialize, C: Serialize",
    deserialize = "R: Ord + Deserialize<'de>, C: Ord + Deserialize<'de>"
))]
pub struct SecurityMap<R: Ord, C: Ord> {
    cells: BTreeMap<R, BTreeMap<C, Setting>>,
}

impl<R: Ord, C: Ord> Default for SecurityMap<R, C> {
    fn default() -> Self {
        Self {
            cells: BTreeMap::new(),
        }
    }
}

impl<R: Ord + Clone, C: Ord + Clone> SecurityMap<R, C> {
    pub fn add_cell(&mut self, row: &R, col: &C, setting: Setting) -> bool {
        if setting.is_unset() {
            return self.del_cell(row, col);
        }
        if self.query_cell(row, col) == Some(setting) {
            return false;
        }
        self.cells
            .entry(row.clone())
            .or_default()
            .insert(col.clone(), setting);
        true
    }

    pub fn del_cell(&mut self, row: &R, col: &C) -> bool {
        let Some(cols) = self.cells.get_mut(row) else {
            return false;
        };
        let removed = cols.remove(col).is_some();
        if cols.is_empty() {
            self.cells.remove(row);
        }
        removed
    }

    pub fn query_cell(&self, row: &R, col: &C) -> Option<Setting> {
        self.cells.get(row).and_then(|cols| cols.get(col)).copied()
    }

    pub fn get_row(&self, row: &R) -> Vec<(C, Setting)> {
        self.cells
            .get(row)
            .map(|cols| cols.iter().map(|(c, s)| (c.clone(), *s)).collect())
            .unwrap_or_default()
    }

    pub fn get_col(&self, col: &C) -> Vec<(R, Setting)> {
        self.cells
            .iter()
            .filter_map(|(r, cols)| cols.get(col).map(|s| (r.clone(), *s)))
            .collect()
    }

    pub fn get_all_cells(&self) -> Vec<(R, C, Setting)> {
        self.cells
            .iter()
            .flat_map(|(r, cols)| cols.iter().map(move |(c, s)| (r.clone(), c.clone(), *s)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Explicit grants attached to one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAnnotation {
    /// permission -> principal -> setting
    #[serde(default)]
    pub principal_permissions: SecurityMap<PermissionId, PrincipalId>,
    /// permission -> role -> setting
    #[serde(default)]
    pub role_permissions: SecurityMap<PermissionId, RoleId>,
    /// role -> principal -> setting
    #[serde(default)]
    pub principal_roles: SecurityMap<RoleId, PrincipalId>,
}

impl SecurityAnnotation {
    pub fn is_empty(&self) -> bool {
        self.principal_permissions.is_empty()
            && self.role_permissions.is_empty()
            && self.principal_roles.is_empty()
    }
}

/// Principal grants of one annotation.
pub struct PrincipalPermissions<A> {
    annotation: A,
}

impl<A: Borrow<SecurityAnnotation>> PrincipalPermissions<A> {
    pub fn new(annotation: A) -> Self {
        Self { annotation }
    }

    fn map(&self) -> &SecurityMap<PermissionId, PrincipalId> {
        &self.annotation.borrow().principal_permissions
    }
}

impl<A: Borrow<SecurityAnnotation>> PrincipalPermissionMap for PrincipalPermissions<A> {
    fn principals_for_permission(&self, permission: &PermissionId) -> Vec<(PrincipalId, Setting)> {
        self.map().get_row(permission)
    }

    fn permissions_for_principal(&self, principal: &PrincipalId) -> Vec<(PermissionId, Setting)> {
        self.map().get_col(principal)
    }

    fn setting(
        &self,
        permission: &PermissionId,
        principal: &PrincipalId,
        default: Setting,
    ) -> Setting {
        self.map().query_cell(permission, principal).unwrap_or(default)
    }

    fn principals_and_permissions(&self) -> Vec<(PrincipalId, PermissionId, Setting)> {
        self.map()
            .get_all_cells()
            .into_iter()
            .map(|(permission, principal, setting)| (principal, permission, setting))
            .collect()
    }
}

impl<A: BorrowMut<SecurityAnnotation>> PrincipalPermissionManager for PrincipalPermissions<A> {
    fn grant_permission_to_principal(
        &mut self,
        permission: &PermissionId,
        principal: &PrincipalId,
    ) -> bool {
        self.annotation
            .borrow_mut()
            .principal_permissions
            .add_cell(permission, principal, Setting::Allow)
    }

    fn deny_permission_to_principal(
        &mut self,
        permission: &PermissionId,
        principal: &PrincipalId,
    ) -> bool {
        self.annotation
            .borrow_mut()
            .principal_permissions
            .add_cell(permission, principal, Setting::Deny)
    }

    fn unset_permission_for_principal(
        &mut self,
        permission: &PermissionId,
        principal: &PrincipalId,
    ) -> bool {
        self.annotation
            .borrow_mut()
            .principal_permissions
            .del_cell(permission, principal)
    }
}

/// Role grants of one annotation.
pub struct RolePermissions<A> {
    annotation: A,
}

impl<A: Borrow<SecurityAnnotation>> RolePermissions<A> {
    pub fn new(annotation: A) -> Self {
        Self { annotation }
    }

    fn map(&self) -> &SecurityMap<PermissionId, RoleId> {
        &self.annotation.borrow().role_permissions
    }
}

impl<A: Borrow<SecurityAnnotation>> RolePermissionMap for RolePermissions<A> {
    fn permissions_for_role(&self, role: &RoleId) -> Vec<(PermissionId, Setting)> {
        self.map().get_col(role)
    }

    fn roles_for_permission(&self, permission: &PermissionId) -> Vec<(RoleId, Setting)> {
        self.map().get_row(permission)
    }

    fn setting(&self, permission: &PermissionId, role: &RoleId, default: Setting) -> Setting {
        self.map().query_cell(permission, role).unwrap_or(default)
    }

    fn roles_and_permissions(&self) -> Vec<(RoleId, PermissionId, Setting)> {
        self.map()
            .get_all_cells()
            .into_iter()
            .map(|(permission, role, setting)| (role, permission, setting))
            .collect()
    }
}

impl<A: BorrowMut<SecurityAnnotation>> RolePermissionManager for RolePermissions<A> {
    fn grant_permission_to_role(&mut self, permission: &PermissionId, role: &RoleId) -> bool {
        self.annotation
            .borrow_mut()
            .role_permissions
            .add_cell(permission, role, Setting::Allow)
    }

    fn deny_permission_to_role(&mut self, permission: &PermissionId, role: &RoleId) -> bool {
        self.annotation
            .borrow_mut()
            .role_permissions
            .add_cell(permission, role, Setting::Deny)
    }

    fn unset_permission_from_role(&mut self, permission: &PermissionId, role: &RoleId) -> bool {
        self.annotation
            .borrow_mut()
            .role_permissions
            .del_cell(permission, role)
    }
}

/// Role membership recorded on one annotation.
pub struct PrincipalRoles<A> {
    annotation: A,
}

impl<A: Borrow<SecurityAnnotation>> PrincipalRoles<A> {
    pub fn new(annotation: A) -> Self {
        Self { annotation }
    }

    fn map(&self) -> &SecurityMap<RoleId, PrincipalId> {
        &self.annotation.borrow().principal_roles
    }
}

impl<A: Borrow<SecurityAnnotation>> PrincipalRoleMap for PrincipalRoles<A> {
    fn principals_for_role(&self, role: &RoleId) -> Vec<(PrincipalId, Setting)> {
        self.map().get_row(role)
    }

    fn roles_for_principal(&self, principal: &PrincipalId) -> Vec<(RoleId, Setting)> {
        self.map().get_col(principal)
    }

    fn setting(&self, role: &RoleId, principal: &PrincipalId, default: Setting) -> Setting {
        self.map().query_cell(role, principal).unwrap_or(default)
    }

    fn principals_and_roles(&self) -> Vec<(RoleId, PrincipalId, Setting)> {
        self.map().get_all_cells()
    }
}

impl<A: BorrowMut<SecurityAnnotation>> PrincipalRoleManager for PrincipalRoles<A> {
    fn assign_role_to_principal(&mut self, role: &RoleId, principal: &PrincipalId) -> bool {
        self.annotation
            .borrow_mut()
            .principal_roles
            .add_cell(role, principal, Setting::Allow)
    }

    fn remove_role_from_principal(&mut self, role: &RoleId, principal: &PrincipalId) -> bool {
        self.annotation
            .borrow_mut()
            .principal_roles
            .add_cell(role, principal, Setting::Deny)
    }

    fn unset_role_for_principal(&mut self, role: &RoleId, principal: &PrincipalId) -> bool {
        self.annotation
            .borrow_mut()
            .principal_roles
            .del_cell(role, principal)
    }
}
