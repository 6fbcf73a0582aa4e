//! Snapshot a directory to JSON files readable by [`InMemoryDirectory::load`].
//!
//! [`InMemoryDirectory::load`]: crate::InMemoryDirectory::load

use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument, warn};

use canonic_shared::{CanonicError, Result};

use crate::memory::{CUSTOMERS_FILE, EMPLOYEES_FILE, PROJECTS_FILE};
use crate::pagination::{load_full_customers, search_all_employees, search_all_projects};
use crate::{Directory, EmployeeQuery, ProjectQuery};

/// Counts written by [`dump_directory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpSummary {
    pub employees: usize,
    pub projects: usize,
    pub customers: usize,
}

/// Write full employee, project and customer records into `out_dir`.
///
/// Listing failures abort the dump; a single record that fails to load is
/// logged and left out.
#[instrument(skip_all, fields(out = %out_dir.display()))]
pub async fn dump_directory(dir: &dyn Directory, out_dir: &Path) -> Result<DumpSummary> {
    std::fs::create_dir_all(out_dir).map_err(|e| CanonicError::io(out_dir, e))?;

    let mut employees = Vec::new();
    for brief in search_all_employees(dir, &EmployeeQuery::default()).await? {
        match dir.get_employee(&brief.id).await {
            Ok(Some(employee)) => employees.push(employee),
            Ok(None) => warn!(employee = %brief.id, "listed employee not found"),
            Err(e) => warn!(employee = %brief.id, error = %e, "failed to load employee"),
        }
    }

    let mut projects = Vec::new();
    for brief in search_all_projects(dir, &ProjectQuery::everything(), None).await? {
        match dir.get_project(&brief.id).await {
            Ok(Some(project)) => projects.push(project),
            Ok(None) => warn!(project = %brief.id, "listed project not found"),
            Err(e) => warn!(project = %brief.id, error = %e, "failed to load project"),
        }
    }

    let customers = load_full_customers(dir).await?;

    write_json(&out_dir.join(EMPLOYEES_FILE), &employees)?;
    write_json(&out_dir.join(PROJECTS_FILE), &projects)?;
    write_json(&out_dir.join(CUSTOMERS_FILE), &customers)?;

    let summary = DumpSummary {
        employees: employees.len(),
        projects: projects.len(),
        customers: customers.len(),
    };
    info!(
        employees = summary.employees,
        projects = summary.projects,
        customers = summary.customers,
        "directory dump written"
    );
    Ok(summary)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CanonicError::parse(format!("serialize {}: {e}", path.display())))?;
    std::fs::write(path, json).map_err(|e| CanonicError::io(path, e))
}
