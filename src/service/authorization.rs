//! Permission checks against persisted security data

use crate::domain::ResourceId;
use crate::error::Result;
use crate::generations::{SchemaManager, PACKAGE_NAME};
use crate::repository::SecurityRepository;
use crate::security::{
    AdapterRegistry, Decision, PermissionId, PrincipalId, SecurityPolicy, SiteAdminDirectory,
    SiteScopedDirectory,
};
use std::sync::Arc;

pub struct AuthorizationService<R: SecurityRepository> {
    repository: Arc<R>,
    schema: SchemaManager,
    directory: Option<Arc<dyn SiteAdminDirectory>>,
}

impl<R: SecurityRepository> AuthorizationService<R> {
    /// Site admins are taken from the role assignments of the loaded store.
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            schema: SchemaManager::new(),
            directory: None,
        }
    }

    /// Use an external directory instead of the stored assignments.
    pub fn with_directory(mut self, directory: Arc<dyn SiteAdminDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Resolve one check in its own unit of work. Annotations initialized
    /// while resolving are persisted.
    pub async fn check_permission(
        &self,
        principal: &PrincipalId,
        permission: &PermissionId,
        resource: ResourceId,
    ) -> Result<Decision> {
        let installed = self.repository.find_generation(PACKAGE_NAME).await?;
        self.schema.ensure_minimum(installed)?;

        let mut store = self.repository.load_store().await?;
        let directory = match &self.directory {
            Some(directory) => Arc::clone(directory),
            None => Arc::new(SiteScopedDirectory::from_store(&store)),
        };
        let policy = SecurityPolicy::new(AdapterRegistry::with_defaults(Some(directory)));

        let decision = policy.check(&mut store, principal, permission, resource);

        let unit = store.pending_changes();
        if !unit.is_empty() {
            self.repository.commit(&unit, None).await?;
        }
        Ok(decision)
    }
}
