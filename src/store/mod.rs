//! In-memory object store: the unit of work permission checks run against
//!
//! A store holds the containment tree and the security annotation of each
//! resource. Persistence loads a store, lets the caller mutate it, and
//! writes back whatever [`MemoryStore::pending_changes`] reports.

mod memory;

pub use memory::{AnnotationChange, MemoryStore, UnitOfWork};

use crate::domain::{Resource, ResourceId, ResourceKind, SUBSCRIPTIONS_FOLDER};
use crate::error::Result;
use crate::security::SecurityAnnotation;
use std::collections::HashSet;

pub trait ObjectStore {
    fn root_id(&self) -> ResourceId;

    fn resource(&self, id: ResourceId) -> Option<&Resource>;

    /// Direct children, in no particular order
    fn children(&self, id: ResourceId) -> Vec<ResourceId>;

    fn annotation(&self, id: ResourceId) -> Option<&SecurityAnnotation>;

    /// Annotation for a known resource, created empty on first access.
    fn annotation_mut(&mut self, id: ResourceId) -> Option<&mut SecurityAnnotation>;

    /// Add a resource under an existing parent.
    fn insert(&mut self, resource: Resource) -> Result<ResourceId>;

    /// The resource followed by its ancestors up to the root. Empty for
    /// unknown ids.
    fn lineage(&self, id: ResourceId) -> Vec<ResourceId> {
        let mut lineage = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(id);
        while let Some(id) = current {
            if !visited.insert(id) {
                tracing::warn!(resource_id = %id, "Containment cycle detected");
                break;
            }
            let Some(resource) = self.resource(id) else {
                break;
            };
            lineage.push(id);
            current = resource.parent_id;
        }
        lineage
    }

    fn sites(&self) -> Vec<ResourceId> {
        self.children(self.root_id())
            .into_iter()
            .filter(|id| self.resource(*id).is_some_and(|r| r.kind() == ResourceKind::Site))
            .collect()
    }

    fn find_site(&self, name: &str) -> Option<ResourceId> {
        self.sites()
            .into_iter()
            .find(|id| self.resource(*id).and_then(Resource::site_name) == Some(name))
    }

    fn find_child_folder(&self, parent: ResourceId, name: &str) -> Option<ResourceId> {
        self.children(parent)
            .into_iter()
            .find(|id| self.resource(*id).and_then(Resource::folder_name) == Some(name))
    }

    /// The folder holding a site's webhook subscriptions, if one exists yet.
    fn subscriptions_folder(&self, site: ResourceId) -> Option<ResourceId> {
        self.find_child_folder(site, SUBSCRIPTIONS_FOLDER)
    }

    /// All resources of `kind` strictly below `id`.
    fn descendants_of_kind(&self, id: ResourceId, kind: ResourceKind) -> Vec<ResourceId> {
        let mut found = Vec::new();
        let mut stack = self.children(id);
        let mut visited = HashSet::new();
        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            if let Some(resource) = self.resource(next) {
                if resource.kind() == kind {
                    found.push(next);
                }
                stack.extend(self.children(next));
            }
        }
        found
    }
}
