//! Wiring shared by every command: catalog, backend, learner and settings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use diagnosis_core::model::{
    AssessmentSettings, AssessmentSettingsDraft, Department, LearnerContext, LearnerId,
};
use storage::InMemoryRepository;
use storage::fixtures::CatalogFixture;
use storage::repository::Storage;

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Catalog JSON with departments, rounds and questions
    #[arg(long, env = "DIAGNOSIS_CATALOG")]
    pub catalog: PathBuf,

    /// Department name as it appears in the catalog
    #[arg(long)]
    pub department: String,

    /// Learner id progress is tracked under
    #[arg(long, env = "DIAGNOSIS_LEARNER_ID", default_value_t = 1)]
    pub learner: u64,
}

/// An in-process backend seeded from a catalog file.
pub struct Workspace {
    pub storage: Storage,
    pub department: Department,
    pub learner: LearnerContext,
}

impl Workspace {
    pub fn open(target: &TargetArgs) -> Result<Self> {
        let repo = seed(&target.catalog)?;
        let department = Department::new(target.department.as_str())
            .with_context(|| format!("invalid department name {:?}", target.department))?;
        if !repo.departments()?.contains(&department) {
            anyhow::bail!(
                "department {department} is not in {}",
                target.catalog.display()
            );
        }

        Ok(Self {
            storage: Storage::from_repository(repo),
            department,
            learner: LearnerContext::new(LearnerId::new(target.learner)),
        })
    }
}

pub fn seed(catalog: &Path) -> Result<InMemoryRepository> {
    let repo = InMemoryRepository::new();
    let loaded = CatalogFixture::load(catalog)
        .and_then(|fixture| fixture.seed(&repo))
        .with_context(|| format!("failed to load catalog {}", catalog.display()))?;
    tracing::info!(catalog = %catalog.display(), rounds = loaded, "catalog loaded");
    Ok(repo)
}

/// Read settings from a TOML file; defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<AssessmentSettings> {
    let Some(path) = path else {
        return Ok(AssessmentSettings::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings {}", path.display()))?;
    parse_settings(&raw).with_context(|| format!("invalid settings in {}", path.display()))
}

fn parse_settings(raw: &str) -> Result<AssessmentSettings> {
    let draft: AssessmentSettingsDraft = toml::from_str(raw)?;
    Ok(draft.validate()?)
}
