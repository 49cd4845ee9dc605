//! Schema generations of the persisted security data
//!
//! The installed generation is stored per package. A fresh database records
//! the current generation directly; an older one runs every pending evolver
//! in order, committed together with the new generation number.

pub mod evolve2;

use crate::error::{AppError, Result};
use crate::repository::{GenerationMark, SecurityRepository};
use crate::store::ObjectStore;
use std::collections::BTreeMap;

pub const PACKAGE_NAME: &str = "zapier";
pub const GENERATION: u32 = 2;
pub const MINIMUM_GENERATION: u32 = 2;

/// Counts reported by an evolver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvolveSummary {
    pub subscriptions_updated: usize,
    pub sites_updated: usize,
    pub total_sites: usize,
}

pub type Evolver = fn(&mut dyn ObjectStore) -> EvolveSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationPlan {
    Install,
    Evolve(Vec<u32>),
    UpToDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvolveOutcome {
    Installed(u32),
    Evolved {
        from: u32,
        to: u32,
        steps: Vec<(u32, EvolveSummary)>,
    },
    UpToDate(u32),
}

pub struct SchemaManager {
    package: &'static str,
    generation: u32,
    minimum_generation: u32,
    evolvers: BTreeMap<u32, Evolver>,
}

impl Default for SchemaManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaManager {
    pub fn new() -> Self {
        let mut evolvers: BTreeMap<u32, Evolver> = BTreeMap::new();
        evolvers.insert(evolve2::GENERATION, evolve2::evolve);
        Self {
            package: PACKAGE_NAME,
            generation: GENERATION,
            minimum_generation: MINIMUM_GENERATION,
            evolvers,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn plan(&self, installed: Option<u32>) -> GenerationPlan {
        match installed {
            None => GenerationPlan::Install,
            Some(current) if current >= self.generation => {
                if current > self.generation {
                    tracing::warn!(
                        package = self.package,
                        installed = current,
                        known = self.generation,
                        "Installed generation is newer than this build"
                    );
                }
                GenerationPlan::UpToDate
            }
            Some(current) => GenerationPlan::Evolve(
                self.evolvers
                    .range(current + 1..=self.generation)
                    .map(|(generation, _)| *generation)
                    .collect(),
            ),
        }
    }

    /// Run the given evolvers in order against `store`.
    pub fn evolve_store(
        &self,
        store: &mut dyn ObjectStore,
        steps: &[u32],
    ) -> Vec<(u32, EvolveSummary)> {
        steps
            .iter()
            .filter_map(|step| self.evolvers.get(step).map(|evolver| (*step, evolver)))
            .map(|(step, evolver)| {
                tracing::info!(package = self.package, generation = step, "Evolving");
                (step, evolver(&mut *store))
            })
            .collect()
    }

    /// Refuse to serve data older than the minimum generation.
    pub fn ensure_minimum(&self, installed: Option<u32>) -> Result<()> {
        match installed {
            Some(current) if current >= self.minimum_generation => Ok(()),
            Some(current) => Err(AppError::Conflict(format!(
                "Schema generation {} of {} is below the minimum {}; run evolve first",
                current, self.package, self.minimum_generation
            ))),
            None => Err(AppError::NotFound(format!(
                "Schema for {} is not installed; run evolve first",
                self.package
            ))),
        }
    }

    /// Bring the persisted data to the current generation.
    pub async fn run<R: SecurityRepository + ?Sized>(
        &self,
        repository: &R,
    ) -> Result<EvolveOutcome> {
        let installed = repository.find_generation(self.package).await?;
        let mark = GenerationMark {
            package: self.package,
            generation: self.generation,
        };

        match self.plan(installed) {
            GenerationPlan::UpToDate => {
                let current = installed.unwrap_or(self.generation);
                tracing::info!(
                    package = self.package,
                    generation = current,
                    "Schema is up to date"
                );
                Ok(EvolveOutcome::UpToDate(current))
            }
            GenerationPlan::Install => {
                let store = repository.load_store().await?;
                repository
                    .commit(&store.pending_changes(), Some(mark))
                    .await?;
                tracing::info!(
                    package = self.package,
                    generation = self.generation,
                    "Installed schema"
                );
                Ok(EvolveOutcome::Installed(self.generation))
            }
            GenerationPlan::Evolve(steps) => {
                let from = installed.unwrap_or_default();
                let mut store = repository.load_store().await?;
                let results = self.evolve_store(&mut store, &steps);
                repository
                    .commit(&store.pending_changes(), Some(mark))
                    .await?;
                tracing::info!(
                    package = self.package,
                    from,
                    to = self.generation,
                    "Schema evolved"
                );
                Ok(EvolveOutcome::Evolved {
                    from,
                    to: self.generation,
                    steps: results,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Resource, ResourceData};
    use crate::repository::security::MockSecurityRepository;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(None, GenerationPlan::Install)]
    #[case(Some(1), GenerationPlan::Evolve(vec![2]))]
    #[case(Some(0), GenerationPlan::Evolve(vec![2]))]
    #[case(Some(2), GenerationPlan::UpToDate)]
    #[case(Some(3), GenerationPlan::UpToDate)]
    fn test_plan(#[case] installed: Option<u32>, #[case] expected: GenerationPlan) {
        assert_eq!(SchemaManager::new().plan(installed), expected);
    }

    #[rstest]
    #[case(Some(2), true)]
    #[case(Some(3), true)]
    #[case(Some(1), false)]
    #[case(None, false)]
    fn test_ensure_minimum(#[case] installed: Option<u32>, #[case] ok: bool) {
        assert_eq!(SchemaManager::new().ensure_minimum(installed).is_ok(), ok);
    }

    #[test]
    fn test_install_records_generation_without_evolving() {
        let mut repository = MockSecurityRepository::new();
        repository
            .expect_find_generation()
            .returning(|_| Ok(None));
        repository
            .expect_load_store()
            .times(1)
            .returning(|| Ok(MemoryStore::new()));
        repository
            .expect_commit()
            .withf(|unit, mark| {
                unit.new_resources.len() == 1
                    && *mark
                        == Some(GenerationMark {
                            package: PACKAGE_NAME,
                            generation: GENERATION,
                        })
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = tokio_test::block_on(SchemaManager::new().run(&repository)).unwrap();
        assert_eq!(outcome, EvolveOutcome::Installed(GENERATION));
    }

    #[tokio::test]
    async fn test_evolve_from_generation_one() {
        let mut store = MemoryStore::new();
        let root = store.root_id();
        store
            .insert(Resource::new(
                root,
                ResourceData::Site {
                    name: "alpha.nextthought.com".to_string(),
                },
            ))
            .unwrap();

        let mut repository = MockSecurityRepository::new();
        repository
            .expect_find_generation()
            .returning(|_| Ok(Some(1)));
        repository
            .expect_load_store()
            .returning(move || Ok(store.clone()));
        repository
            .expect_commit()
            .withf(|_, mark| mark.map(|m| m.generation) == Some(GENERATION))
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = SchemaManager::new().run(&repository).await.unwrap();
        assert_eq!(
            outcome,
            EvolveOutcome::Evolved {
                from: 1,
                to: 2,
                steps: vec![(
                    2,
                    EvolveSummary {
                        subscriptions_updated: 0,
                        sites_updated: 0,
                        total_sites: 1,
                    }
                )],
            }
        );
    }

    #[tokio::test]
    async fn test_up_to_date_touches_nothing() {
        let mut repository = MockSecurityRepository::new();
        repository
            .expect_find_generation()
            .returning(|_| Ok(Some(GENERATION)));
        repository.expect_load_store().never();
        repository.expect_commit().never();

        let outcome = SchemaManager::new().run(&repository).await.unwrap();
        assert_eq!(outcome, EvolveOutcome::UpToDate(GENERATION));
    }

    #[tokio::test]
    async fn test_commit_failure_propagates() {
        let mut repository = MockSecurityRepository::new();
        repository
            .expect_find_generation()
            .returning(|_| Ok(Some(1)));
        repository
            .expect_load_store()
            .returning(|| Ok(MemoryStore::new()));
        repository
            .expect_commit()
            .returning(|_, _| Err(AppError::Conflict("stale".to_string())));

        let result = SchemaManager::new().run(&repository).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
