use std::sync::Arc;

use diagnosis_core::RoundCatalog;
use diagnosis_core::model::{Department, LearnerContext};
use storage::repository::ProgressRepository;

use crate::error::CatalogError;

/// Builds a learner's round catalog from backend progress and round metadata.
#[derive(Clone)]
pub struct RoundCatalogService {
    learner: LearnerContext,
    progress: Arc<dyn ProgressRepository>,
}

impl RoundCatalogService {
    #[must_use]
    pub fn new(learner: LearnerContext, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { learner, progress }
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if progress or rounds cannot be fetched.
    pub async fn load(&self, department: &Department) -> Result<RoundCatalog, CatalogError> {
        let progress = self.progress.get_progress(&self.learner, department).await?;
        let records = self.progress.list_rounds(&self.learner, department).await?;
        let catalog = RoundCatalog::build(progress, &records);
        tracing::debug!(
            department = %department,
            rounds = catalog.rounds().len(),
            completed = catalog.completed_count(),
            "catalog loaded"
        );
        Ok(catalog)
    }
}

impl std::fmt::Debug for RoundCatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundCatalogService")
            .field("learner", &self.learner)
            .finish_non_exhaustive()
    }
}
