use std::path::Path;

use anyhow::Result;

use crate::context;

pub fn execute(catalog: &Path) -> Result<()> {
    let repo = context::seed(catalog)?;
    let departments = repo.departments()?;
    if departments.is_empty() {
        println!("No departments in {}", catalog.display());
        return Ok(());
    }
    for department in departments {
        println!("{department}");
    }
    Ok(())
}
