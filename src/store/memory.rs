use super::ObjectStore;
use crate::domain::{Resource, ResourceData, ResourceId};
use crate::error::{AppError, Result};
use crate::security::SecurityAnnotation;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct AnnotationSlot {
    current: SecurityAnnotation,
    /// Last persisted state and its row version
    persisted: Option<(SecurityAnnotation, i64)>,
}

impl AnnotationSlot {
    fn is_dirty(&self) -> bool {
        match &self.persisted {
            Some((annotation, _)) => *annotation != self.current,
            None => !self.current.is_empty(),
        }
    }
}

/// One annotation write, with the version it is expected to replace.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationChange {
    pub resource_id: ResourceId,
    pub annotation: SecurityAnnotation,
    /// `None` when no row exists yet
    pub expected_version: Option<i64>,
}

/// Everything that must be written to make the persisted state match the
/// store, applied atomically by the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitOfWork {
    pub new_resources: Vec<Resource>,
    pub annotations: Vec<AnnotationChange>,
}

impl UnitOfWork {
    pub fn is_empty(&self) -> bool {
        self.new_resources.is_empty() && self.annotations.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    root: ResourceId,
    resources: HashMap<ResourceId, Resource>,
    children: HashMap<ResourceId, Vec<ResourceId>>,
    annotations: HashMap<ResourceId, AnnotationSlot>,
    /// Resources added since load, in insertion order
    inserted: Vec<ResourceId>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty store holding only a fresh root.
    pub fn new() -> Self {
        let root = Resource::root();
        let root_id = root.id;
        let mut store = Self {
            root: root_id,
            resources: HashMap::from([(root_id, root)]),
            children: HashMap::new(),
            annotations: HashMap::new(),
            inserted: Vec::new(),
        };
        store.inserted.push(root_id);
        store
    }

    /// Rebuild a store from persisted rows. Rows may come in any order.
    pub fn from_parts(
        resources: Vec<Resource>,
        annotations: Vec<(ResourceId, SecurityAnnotation, i64)>,
    ) -> Result<Self> {
        let mut roots = resources
            .iter()
            .filter(|r| r.parent_id.is_none() && matches!(r.data, ResourceData::Root));
        let root = roots
            .next()
            .map(|r| r.id)
            .ok_or_else(|| AppError::NotFound("Root resource not found".to_string()))?;
        if roots.next().is_some() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "More than one root resource found"
            )));
        }

        let resources: HashMap<ResourceId, Resource> =
            resources.into_iter().map(|r| (r.id, r)).collect();
        let mut children: HashMap<ResourceId, Vec<ResourceId>> = HashMap::new();
        for resource in resources.values() {
            match resource.parent_id {
                Some(parent) if resources.contains_key(&parent) => {
                    children.entry(parent).or_default().push(resource.id);
                }
                Some(parent) => {
                    return Err(AppError::Internal(anyhow::anyhow!(
                        "Resource {} references missing parent {}",
                        resource.id,
                        parent
                    )));
                }
                None if resource.id == root => {}
                None => {
                    return Err(AppError::Internal(anyhow::anyhow!(
                        "Resource {} has no parent",
                        resource.id
                    )));
                }
            }
        }

        let annotations = annotations
            .into_iter()
            .filter(|(id, _, _)| resources.contains_key(id))
            .map(|(id, annotation, version)| {
                let slot = AnnotationSlot {
                    current: annotation.clone(),
                    persisted: Some((annotation, version)),
                };
                (id, slot)
            })
            .collect();

        Ok(Self {
            root,
            resources,
            children,
            annotations,
            inserted: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Writes needed to persist this store. Annotations that were touched
    /// but end up equal to their persisted state are left out.
    pub fn pending_changes(&self) -> UnitOfWork {
        let new_resources = self
            .inserted
            .iter()
            .filter_map(|id| self.resources.get(id).cloned())
            .collect();
        let mut annotations: Vec<AnnotationChange> = self
            .annotations
            .iter()
            .filter(|(_, slot)| slot.is_dirty())
            .map(|(id, slot)| AnnotationChange {
                resource_id: *id,
                annotation: slot.current.clone(),
                expected_version: slot.persisted.as_ref().map(|(_, version)| *version),
            })
            .collect();
        annotations.sort_by_key(|change| change.resource_id);
        UnitOfWork {
            new_resources,
            annotations,
        }
    }

    /// Record that `unit` has been written.
    pub fn mark_committed(&mut self, unit: &UnitOfWork) {
        self.inserted.clear();
        for change in &unit.annotations {
            if let Some(slot) = self.annotations.get_mut(&change.resource_id) {
                let version = change.expected_version.map_or(1, |v| v + 1);
                slot.persisted = Some((change.annotation.clone(), version));
            }
        }
    }
}

impl ObjectStore for MemoryStore {
    fn root_id(&self) -> ResourceId {
        self.root
    }

    fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    fn children(&self, id: ResourceId) -> Vec<ResourceId> {
        self.children.get(&id).cloned().unwrap_or_default()
    }

    fn annotation(&self, id: ResourceId) -> Option<&SecurityAnnotation> {
        self.annotations.get(&id).map(|slot| &slot.current)
    }

    fn annotation_mut(&mut self, id: ResourceId) -> Option<&mut SecurityAnnotation> {
        if !self.resources.contains_key(&id) {
            return None;
        }
        let slot = self.annotations.entry(id).or_insert_with(|| AnnotationSlot {
            current: SecurityAnnotation::default(),
            persisted: None,
        });
        Some(&mut slot.current)
    }

    fn insert(&mut self, resource: Resource) -> Result<ResourceId> {
        let Some(parent) = resource.parent_id else {
            return Err(AppError::BadRequest(
                "Only the root may be created without a parent".to_string(),
            ));
        };
        if !self.resources.contains_key(&parent) {
            return Err(AppError::NotFound(format!("Parent {} not found", parent)));
        }
        if self.resources.contains_key(&resource.id) {
            return Err(AppError::Conflict(format!(
                "Resource {} already exists",
                resource.id
            )));
        }

        let id = resource.id;
        self.children.entry(parent).or_default().push(id);
        self.resources.insert(id, resource);
        self.inserted.push(id);
        Ok(id)
    }
}
