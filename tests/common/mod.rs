//! Common test utilities

#![allow(dead_code)]

use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::sync::{Arc, Once};
use zapier_authz::config::DatabaseConfig;
use zapier_authz::domain::{
    Course, CreateSubscriptionInput, Dialect, EnrollmentRecord, EventType, Resource, ResourceData,
    ResourceId, User, WebhookSubscription, SUBSCRIPTIONS_FOLDER,
};
use zapier_authz::migration;
use zapier_authz::security::{
    AdapterRegistry, PrincipalId, PrincipalPermissionManager, PrincipalPermissions,
    PrincipalRoleManager, PrincipalRoles, RolePermissionManager, RolePermissions, SecurityPolicy,
    SiteAdminDirectory, SiteScopedDirectory, ACT_DELETE, ACT_READ, ROLE_ADMIN, ROLE_SITE_ADMIN,
};
use zapier_authz::service::create_subscription;
use zapier_authz::store::{MemoryStore, ObjectStore};

pub const PLATFORM_ADMIN: &str = "nti.admin";

/// Ensure .env file is loaded once
static ENV_INIT: Once = Once::new();

fn init_env() {
    ENV_INIT.call_once(|| {
        let _ = dotenvy::dotenv();
    });
}

/// An in-memory tree with a platform admin assigned at the root.
pub struct World {
    pub store: MemoryStore,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self::from_store(MemoryStore::new())
    }

    pub fn from_store(mut store: MemoryStore) -> Self {
        let root = store.root_id();
        PrincipalRoles::new(store.annotation_mut(root).unwrap())
            .assign_role_to_principal(&ROLE_ADMIN, &PrincipalId::from(PLATFORM_ADMIN));
        Self { store }
    }

    /// A site whose admins hold the site-admin role and read access to
    /// everything below the site.
    pub fn add_site(&mut self, name: &str, admins: &[&str]) -> ResourceId {
        let root = self.store.root_id();
        let site = self
            .store
            .insert(Resource::new(
                root,
                ResourceData::Site {
                    name: name.to_string(),
                },
            ))
            .unwrap();
        let annotation = self.store.annotation_mut(site).unwrap();
        let mut roles = PrincipalRoles::new(&mut *annotation);
        for admin in admins {
            roles.assign_role_to_principal(&ROLE_SITE_ADMIN, &PrincipalId::from(*admin));
        }
        RolePermissions::new(&mut *annotation)
            .grant_permission_to_role(&ACT_READ, &ROLE_SITE_ADMIN);
        site
    }

    pub fn site(&self, name: &str) -> ResourceId {
        self.store.find_site(name).unwrap()
    }

    pub fn add_user(&mut self, site_name: &str, username: &str) -> ResourceId {
        let site = self.site(site_name);
        self.store
            .insert(Resource::new(
                site,
                ResourceData::User(User::new(
                    PrincipalId::from(username),
                    Some(site_name.to_string()),
                )),
            ))
            .unwrap()
    }

    pub fn add_course(&mut self, site_name: &str, title: &str) -> ResourceId {
        let site = self.site(site_name);
        self.store
            .insert(Resource::new(
                site,
                ResourceData::Course(Course {
                    title: title.to_string(),
                    provider_id: None,
                }),
            ))
            .unwrap()
    }

    /// An enrollment record stored without any grants yet.
    pub fn enroll(&mut self, course: ResourceId, principal: Option<&str>) -> ResourceId {
        self.store
            .insert(Resource::new(
                course,
                ResourceData::EnrollmentRecord(EnrollmentRecord::new(
                    course,
                    principal.map(PrincipalId::from),
                )),
            ))
            .unwrap()
    }

    pub fn subscribe(&mut self, site_name: &str, owner: &str) -> ResourceId {
        create_subscription(
            &mut self.store,
            site_name,
            &PrincipalId::from(owner),
            CreateSubscriptionInput {
                target: "https://hooks.zapier.com/hooks/standard/1/".to_string(),
                event_type: "user.created".to_string(),
            },
        )
        .unwrap()
    }

    /// A subscription as older versions stored it: the owner has access,
    /// site admins are denied, platform admins were never granted anything.
    pub fn add_legacy_subscription(&mut self, site_name: &str, owner: &str) -> ResourceId {
        let site = self.site(site_name);
        let folder = match self.store.subscriptions_folder(site) {
            Some(folder) => folder,
            None => self
                .store
                .insert(Resource::new(
                    site,
                    ResourceData::Folder {
                        name: SUBSCRIPTIONS_FOLDER.to_string(),
                    },
                ))
                .unwrap(),
        };
        let owner = PrincipalId::from(owner);
        let id = self
            .store
            .insert(Resource::new(
                folder,
                ResourceData::WebhookSubscription(WebhookSubscription {
                    target: "https://hooks.zapier.com/hooks/standard/1/".to_string(),
                    event: EventType::UserCreated,
                    dialect: Dialect::Zapier,
                    owner_id: Some(owner.clone()),
                    permission_id: ACT_READ,
                    active: true,
                    created_at: chrono::Utc::now(),
                }),
            ))
            .unwrap();
        let annotation = self.store.annotation_mut(id).unwrap();
        let mut principals = PrincipalPermissions::new(&mut *annotation);
        principals.grant_permission_to_principal(&ACT_READ, &owner);
        principals.grant_permission_to_principal(&ACT_DELETE, &owner);
        let mut roles = RolePermissions::new(&mut *annotation);
        roles.deny_permission_to_role(&ACT_READ, &ROLE_SITE_ADMIN);
        roles.deny_permission_to_role(&ACT_DELETE, &ROLE_SITE_ADMIN);
        id
    }

    /// Policy whose site admins come from the stored role assignments.
    pub fn policy(&self) -> SecurityPolicy {
        let directory: Arc<dyn SiteAdminDirectory> =
            Arc::new(SiteScopedDirectory::from_store(&self.store));
        SecurityPolicy::new(AdapterRegistry::with_defaults(Some(directory)))
    }
}

/// A migrated database pool, or `None` when no database is reachable.
pub async fn database_pool() -> Option<MySqlPool> {
    init_env();
    let url = std::env::var("DATABASE_URL").ok()?;
    if url.trim().is_empty() {
        return None;
    }
    let config = DatabaseConfig {
        url,
        max_connections: 2,
        min_connections: 1,
    };
    if let Err(e) = migration::run_migrations(&config).await {
        eprintln!("Skipping database test: {}", e);
        return None;
    }
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .ok()
}

/// Empty every table so a test starts from a fresh install.
pub async fn reset_database(pool: &MySqlPool) {
    for table in ["security_annotations", "resources", "schema_generations"] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(pool)
            .await
            .unwrap();
    }
}
