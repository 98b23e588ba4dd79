use std::sync::Arc;

use anyhow::{Context, Result};
use diagnosis_core::RoundCatalog;
use services::RoundCatalogService;

use crate::context::{TargetArgs, Workspace};
use crate::render;

pub async fn execute(target: &TargetArgs) -> Result<()> {
    let workspace = Workspace::open(target)?;
    let catalog = load_catalog(&workspace).await?;
    println!("{}", render::catalog(&catalog));
    Ok(())
}

pub async fn load_catalog(workspace: &Workspace) -> Result<RoundCatalog> {
    RoundCatalogService::new(
        workspace.learner.clone(),
        Arc::clone(&workspace.storage.progress),
    )
    .load(&workspace.department)
    .await
    .with_context(|| format!("failed to load rounds for {}", workspace.department))
}
