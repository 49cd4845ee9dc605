//! Security initialization for webhook subscriptions

use super::annotation::{PrincipalPermissions, RolePermissions, SecurityAnnotation};
use super::map::{PrincipalPermissionManager, RolePermissionManager};
use super::{ACT_DELETE, ACT_READ, ROLE_ADMIN, ROLE_SITE_ADMIN};
use crate::domain::{Dialect, WebhookSubscription};

/// Give a subscription its initial grants.
///
/// Platform admins and the owner may read and delete it. Zapier
/// subscriptions are additionally hidden from site admins, so site admins
/// never see a subscription they did not create. Returns whether the
/// annotation changed.
pub fn apply_security_to_subscription(
    subscription: &WebhookSubscription,
    annotation: &mut SecurityAnnotation,
) -> bool {
    let mut changed = false;
    for permission in [&ACT_READ, &ACT_DELETE] {
        changed |= RolePermissions::new(&mut *annotation)
            .grant_permission_to_role(permission, &ROLE_ADMIN);
        if let Some(owner) = &subscription.owner_id {
            changed |= PrincipalPermissions::new(&mut *annotation)
                .grant_permission_to_principal(permission, owner);
        }
        if subscription.dialect == Dialect::Zapier {
            changed |= RolePermissions::new(&mut *annotation)
                .deny_permission_to_role(permission, &ROLE_SITE_ADMIN);
        }
    }
    changed
}
