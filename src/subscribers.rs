//! Object lifecycle subscribers
//!
//! Resources get their initial grants when they are added to the tree.

use crate::domain::{ResourceData, ResourceId};
use crate::security::enrollment::initialize_enrollment_annotation;
use crate::security::subscription::apply_security_to_subscription;
use crate::store::ObjectStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectEvent {
    Added(ResourceId),
    Modified(ResourceId),
    Removed(ResourceId),
}

impl ObjectEvent {
    pub fn resource_id(&self) -> ResourceId {
        match self {
            ObjectEvent::Added(id) | ObjectEvent::Modified(id) | ObjectEvent::Removed(id) => *id,
        }
    }
}

/// Run the subscribers for `event`. Returns whether any annotation changed.
pub fn dispatch<S: ObjectStore + ?Sized>(store: &mut S, event: ObjectEvent) -> bool {
    let ObjectEvent::Added(id) = event else {
        return false;
    };
    let Some(data) = store.resource(id).map(|resource| resource.data.clone()) else {
        tracing::warn!(resource_id = %id, "Added event for unknown resource");
        return false;
    };
    let Some(annotation) = store.annotation_mut(id) else {
        return false;
    };

    let changed = match &data {
        ResourceData::WebhookSubscription(subscription) => {
            apply_security_to_subscription(subscription, annotation)
        }
        ResourceData::EnrollmentRecord(record) => {
            initialize_enrollment_annotation(record, annotation)
        }
        _ => false,
    };
    if changed {
        tracing::debug!(resource_id = %id, kind = %data.kind(), "Applied initial security");
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dialect, EventType, Resource, WebhookSubscription};
    use crate::security::{
        PrincipalId, RolePermissionMap, RolePermissions, Setting, ACT_DELETE, ACT_READ,
        ROLE_SITE_ADMIN,
    };
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn subscription_resource(store: &MemoryStore) -> Resource {
        Resource::new(
            store.root_id(),
            ResourceData::WebhookSubscription(WebhookSubscription {
                target: "https://hooks.zapier.com/hooks/standard/1/".to_string(),
                event: EventType::CourseCreated,
                dialect: Dialect::Zapier,
                owner_id: Some(PrincipalId::from("site.admin")),
                permission_id: ACT_READ,
                active: true,
                created_at: Utc::now(),
            }),
        )
    }

    #[test]
    fn test_added_subscription_gets_security() {
        let mut store = MemoryStore::new();
        let id = store.insert(subscription_resource(&store)).unwrap();

        assert!(dispatch(&mut store, ObjectEvent::Added(id)));
        let roles = RolePermissions::new(store.annotation(id).unwrap());
        assert_eq!(
            roles.setting(&ACT_DELETE, &ROLE_SITE_ADMIN, Setting::Unset),
            Setting::Deny
        );
    }

    #[test]
    fn test_other_events_are_ignored() {
        let mut store = MemoryStore::new();
        let id = store.insert(subscription_resource(&store)).unwrap();

        assert!(!dispatch(&mut store, ObjectEvent::Modified(id)));
        assert!(!dispatch(&mut store, ObjectEvent::Removed(id)));
        assert!(store.annotation(id).is_none());
        assert_eq!(ObjectEvent::Removed(id).resource_id(), id);
    }

    #[test]
    fn test_added_unknown_resource() {
        let mut store = MemoryStore::new();
        assert!(!dispatch(&mut store, ObjectEvent::Added(ResourceId::new_v4())));
    }
}
