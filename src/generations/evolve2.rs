//! Generation 2: platform admins can read and delete every webhook
//! subscription.
//!
//! Subscriptions created before default security was applied on creation
//! only carried grants for their owner.

use super::EvolveSummary;
use crate::domain::{ResourceId, ResourceKind};
use crate::security::{RolePermissionManager, RolePermissions, ACT_DELETE, ACT_READ, ROLE_ADMIN};
use crate::store::ObjectStore;

pub const GENERATION: u32 = 2;

/// Grant the platform-admin role read and delete on each subscription of
/// `site`. Returns how many subscriptions changed.
fn process_site(store: &mut dyn ObjectStore, site: ResourceId) -> usize {
    let mut updated = 0;
    for subscription in store.descendants_of_kind(site, ResourceKind::WebhookSubscription) {
        let Some(annotation) = store.annotation_mut(subscription) else {
            continue;
        };
        let mut roles = RolePermissions::new(annotation);
        let mut changed = false;
        for permission in [&ACT_READ, &ACT_DELETE] {
            changed |= roles.grant_permission_to_role(permission, &ROLE_ADMIN);
        }
        if changed {
            tracing::debug!(
                site_id = %site,
                subscription_id = %subscription,
                "Granted admin access"
            );
            updated += 1;
        }
    }
    updated
}

pub fn evolve(store: &mut dyn ObjectStore) -> EvolveSummary {
    let sites = store.sites();
    let mut summary = EvolveSummary {
        total_sites: sites.len(),
        ..EvolveSummary::default()
    };
    for site in sites {
        let updated = process_site(store, site);
        if updated > 0 {
            summary.subscriptions_updated += updated;
            summary.sites_updated += 1;
        }
    }

    metrics::counter!("zapier_authz_evolve_subscriptions_updated_total")
        .increment(summary.subscriptions_updated as u64);
    tracing::info!(
        generation = GENERATION,
        subscriptions_updated = summary.subscriptions_updated,
        sites_updated = summary.sites_updated,
        total_sites = summary.total_sites,
        "Evolution {} done. Updated {} subscriptions in {}/{} sites",
        GENERATION,
        summary.subscriptions_updated,
        summary.sites_updated,
        summary.total_sites
    );
    summary
}
