//! Security repository: the containment tree, annotations and schema
//! generations.

use crate::domain::{Resource, ResourceData, ResourceId};
use crate::error::{AppError, Result};
use crate::security::SecurityAnnotation;
use crate::store::{MemoryStore, UnitOfWork};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, MySqlPool};

#[derive(Debug, FromRow)]
struct ResourceRow {
    id: ResourceId,
    parent_id: Option<ResourceId>,
    data: Json<ResourceData>,
}

#[derive(Debug, FromRow)]
struct AnnotationRow {
    resource_id: ResourceId,
    annotation: Json<SecurityAnnotation>,
    version: i64,
}

/// Generation to record in the same transaction as a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationMark {
    pub package: &'static str,
    pub generation: u32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecurityRepository: Send + Sync {
    /// Load the whole tree with its annotations. An empty database yields a
    /// store holding only a fresh root.
    async fn load_store(&self) -> Result<MemoryStore>;

    /// Apply `unit` atomically. Stale annotation versions fail with
    /// [`AppError::Conflict`] and nothing is written.
    async fn commit(&self, unit: &UnitOfWork, generation: Option<GenerationMark>) -> Result<()>;

    async fn find_generation(&self, package: &str) -> Result<Option<u32>>;
}

pub struct SecurityRepositoryImpl {
    pool: MySqlPool,
}

impl SecurityRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Map unique-key violations to conflicts, everything else to database errors.
fn conflict_on_duplicate(err: sqlx::Error, what: impl FnOnce() -> String) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(what()),
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl SecurityRepository for SecurityRepositoryImpl {
    async fn load_store(&self) -> Result<MemoryStore> {
        let resources =
            sqlx::query_as::<_, ResourceRow>("SELECT id, parent_id, data FROM resources")
                .fetch_all(&self.pool)
                .await?;

        if resources.is_empty() {
            tracing::info!("No resources stored yet, starting from an empty root");
            return Ok(MemoryStore::new());
        }

        let annotations = sqlx::query_as::<_, AnnotationRow>(
            "SELECT resource_id, annotation, version FROM security_annotations",
        )
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(
            resources = resources.len(),
            annotations = annotations.len(),
            "Loaded security store"
        );

        MemoryStore::from_parts(
            resources
                .into_iter()
                .map(|row| Resource {
                    id: row.id,
                    parent_id: row.parent_id,
                    data: row.data.0,
                })
                .collect(),
            annotations
                .into_iter()
                .map(|row| (row.resource_id, row.annotation.0, row.version))
                .collect(),
        )
    }

    async fn commit(&self, unit: &UnitOfWork, generation: Option<GenerationMark>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for resource in &unit.new_resources {
            sqlx::query("INSERT INTO resources (id, parent_id, kind, data) VALUES (?, ?, ?, ?)")
                .bind(resource.id)
                .bind(resource.parent_id)
                .bind(resource.kind().as_str())
                .bind(Json(&resource.data))
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    conflict_on_duplicate(e, || format!("Resource {} already exists", resource.id))
                })?;
        }

        for change in &unit.annotations {
            match change.expected_version {
                None => {
                    sqlx::query(
                        "INSERT INTO security_annotations (resource_id, annotation, version) VALUES (?, ?, 1)",
                    )
                    .bind(change.resource_id)
                    .bind(Json(&change.annotation))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        conflict_on_duplicate(e, || {
                            format!(
                                "Annotation for {} was created concurrently",
                                change.resource_id
                            )
                        })
                    })?;
                }
                Some(version) => {
                    let result = sqlx::query(
                        "UPDATE security_annotations SET annotation = ?, version = version + 1 WHERE resource_id = ? AND version = ?",
                    )
                    .bind(Json(&change.annotation))
                    .bind(change.resource_id)
                    .bind(version)
                    .execute(&mut *tx)
                    .await?;
                    if result.rows_affected() == 0 {
                        return Err(AppError::Conflict(format!(
                            "Annotation for {} changed since version {}",
                            change.resource_id, version
                        )));
                    }
                }
            }
        }

        if let Some(mark) = generation {
            sqlx::query(
                "INSERT INTO schema_generations (package, generation) VALUES (?, ?) ON DUPLICATE KEY UPDATE generation = VALUES(generation)",
            )
            .bind(mark.package)
            .bind(mark.generation)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            resources = unit.new_resources.len(),
            annotations = unit.annotations.len(),
            generation = generation.map(|mark| mark.generation),
            "Committed unit of work"
        );
        Ok(())
    }

    async fn find_generation(&self, package: &str) -> Result<Option<u32>> {
        let generation = sqlx::query_scalar::<_, u32>(
            "SELECT generation FROM schema_generations WHERE package = ?",
        )
        .bind(package)
        .fetch_optional(&self.pool)
        .await?;
        Ok(generation)
    }
}
