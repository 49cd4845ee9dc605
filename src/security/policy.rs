//! Permission resolution over the containment tree
//!
//! A check walks from the resource up to the root. The first explicit
//! principal grant found wins. Otherwise the principal's effective roles
//! are resolved (closest assignment wins) and each role's closest
//! permission setting is consulted; one allowing role is enough, and a
//! denying role only counts when no role allows. Computed maps of the
//! resources in the chain come last, and anything still unset is denied.

use super::annotation::{PrincipalPermissions, PrincipalRoles, RolePermissions};
use super::map::{PrincipalPermissionMap, PrincipalRoleMap, RolePermissionMap};
use super::registry::AdapterRegistry;
use super::{PermissionId, PrincipalId, RoleId, Setting};
use crate::domain::ResourceId;
use crate::store::ObjectStore;
use std::collections::BTreeMap;

/// Where a decision came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionSource {
    /// Principal grant stored on this resource
    Principal(ResourceId),
    /// Role grant stored on `at` for a role the principal holds
    Role { role: RoleId, at: ResourceId },
    /// Computed map of this resource
    Computed(ResourceId),
    /// Nothing applied
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub setting: Setting,
    pub source: DecisionSource,
}

impl Decision {
    fn unset() -> Self {
        Self {
            setting: Setting::Unset,
            source: DecisionSource::Default,
        }
    }

    /// Only an explicit allow grants access.
    pub fn is_allowed(&self) -> bool {
        self.setting == Setting::Allow
    }
}

pub struct SecurityPolicy {
    registry: AdapterRegistry,
}

impl SecurityPolicy {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Whether `principal` holds `permission` on `resource`.
    pub fn check_permission<S: ObjectStore + ?Sized>(
        &self,
        store: &mut S,
        principal: &PrincipalId,
        permission: &PermissionId,
        resource: ResourceId,
    ) -> bool {
        self.check(store, principal, permission, resource).is_allowed()
    }

    /// [`Self::decide`], recorded in logs and metrics.
    pub fn check<S: ObjectStore + ?Sized>(
        &self,
        store: &mut S,
        principal: &PrincipalId,
        permission: &PermissionId,
        resource: ResourceId,
    ) -> Decision {
        let decision = self.decide(store, principal, permission, resource);

        metrics::counter!(
            "zapier_authz_permission_checks_total",
            "decision" => if decision.is_allowed() { "allow" } else { "deny" }
        )
        .increment(1);
        tracing::debug!(
            principal = %principal,
            permission = %permission,
            resource_id = %resource,
            setting = %decision.setting,
            source = ?decision.source,
            "Permission check"
        );

        decision
    }

    /// Resolve the effective setting, recording where it came from.
    ///
    /// Adapters may update the stored annotations of the chain first, which
    /// is why the store is borrowed mutably.
    pub fn decide<S: ObjectStore + ?Sized>(
        &self,
        store: &mut S,
        principal: &PrincipalId,
        permission: &PermissionId,
        resource: ResourceId,
    ) -> Decision {
        let lineage = store.lineage(resource);
        if lineage.is_empty() {
            tracing::warn!(resource_id = %resource, "Permission check on unknown resource");
            return Decision::unset();
        }
        self.prepare(store, &lineage);
        let store: &S = store;

        if let Some(decision) = principal_decision(store, &lineage, principal, permission) {
            return decision;
        }
        if let Some(decision) = role_decision(store, &lineage, principal, permission) {
            return decision;
        }
        self.computed_decision(store, &lineage, principal, permission)
            .unwrap_or_else(Decision::unset)
    }

    fn prepare<S: ObjectStore + ?Sized>(&self, store: &mut S, lineage: &[ResourceId]) {
        for id in lineage {
            let Some(resource) = store.resource(*id).cloned() else {
                continue;
            };
            let adapter = self.registry.dispatch(resource.kind());
            if let Some(annotation) = store.annotation_mut(*id) {
                if adapter.prepare(&resource, annotation) {
                    tracing::debug!(
                        resource_id = %id,
                        kind = %resource.kind(),
                        "Annotation initialized"
                    );
                }
            }
        }
    }

    fn computed_decision<S: ObjectStore + ?Sized>(
        &self,
        store: &S,
        lineage: &[ResourceId],
        principal: &PrincipalId,
        permission: &PermissionId,
    ) -> Option<Decision> {
        lineage.iter().find_map(|id| {
            let resource = store.resource(*id)?;
            let map = self.registry.dispatch(resource.kind()).computed_map(resource)?;
            let setting = map.setting(permission, principal, Setting::Unset);
            (!setting.is_unset()).then(|| Decision {
                setting,
                source: DecisionSource::Computed(*id),
            })
        })
    }
}

fn principal_decision<S: ObjectStore + ?Sized>(
    store: &S,
    lineage: &[ResourceId],
    principal: &PrincipalId,
    permission: &PermissionId,
) -> Option<Decision> {
    lineage.iter().find_map(|id| {
        let annotation = store.annotation(*id)?;
        let setting =
            PrincipalPermissions::new(annotation).setting(permission, principal, Setting::Unset);
        (!setting.is_unset()).then(|| Decision {
            setting,
            source: DecisionSource::Principal(*id),
        })
    })
}

/// Roles the principal holds at the resource: the closest assignment of
/// each role decides.
pub fn effective_roles<S: ObjectStore + ?Sized>(
    store: &S,
    lineage: &[ResourceId],
    principal: &PrincipalId,
) -> Vec<RoleId> {
    let mut closest: BTreeMap<RoleId, Setting> = BTreeMap::new();
    for annotation in lineage.iter().filter_map(|id| store.annotation(*id)) {
        for (role, setting) in PrincipalRoles::new(annotation).roles_for_principal(principal) {
            closest.entry(role).or_insert(setting);
        }
    }
    closest
        .into_iter()
        .filter(|(_, setting)| *setting == Setting::Allow)
        .map(|(role, _)| role)
        .collect()
}

fn role_decision<S: ObjectStore + ?Sized>(
    store: &S,
    lineage: &[ResourceId],
    principal: &PrincipalId,
    permission: &PermissionId,
) -> Option<Decision> {
    let mut denied: Option<Decision> = None;
    for role in effective_roles(store, lineage, principal) {
        let closest = lineage.iter().find_map(|id| {
            let annotation = store.annotation(*id)?;
            let setting =
                RolePermissions::new(annotation).setting(permission, &role, Setting::Unset);
            (!setting.is_unset()).then_some((setting, *id))
        });
        match closest {
            Some((Setting::Allow, at)) => {
                return Some(Decision {
                    setting: Setting::Allow,
                    source: DecisionSource::Role { role, at },
                });
            }
            Some((setting, at)) if denied.is_none() => {
                denied = Some(Decision {
                    setting,
                    source: DecisionSource::Role { role, at },
                });
            }
            _ => {}
        }
    }
    denied
}
