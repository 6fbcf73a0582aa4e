//! In-memory directory, loaded from a data dump or built in code.
//!
//! Besides serving offline snapshots it can emulate a store page-size limit
//! and inject failures per operation, and it counts calls.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use canonic_shared::{CanonicError, Result};

use crate::records::{Company, CompanyBrief, Employee, EmployeeBrief, Project, ProjectBrief};
use crate::{Directory, EmployeeQuery, Page, ProjectQuery};

pub const EMPLOYEES_FILE: &str = "employees.json";
pub const PROJECTS_FILE: &str = "projects.json";
pub const CUSTOMERS_FILE: &str = "customers.json";

/// Directory operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetEmployee,
    GetProject,
    GetCustomer,
    ListCustomers,
    SearchProjects,
    SearchEmployees,
}

/// Directory held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    employees: Vec<Employee>,
    projects: Vec<Project>,
    customers: Vec<Company>,
    max_page_size: Option<usize>,
    failing: HashSet<Operation>,
    failing_ids: HashSet<String>,
    calls: Mutex<HashMap<Operation, usize>>,
}

impl InMemoryDirectory {
    pub fn new(employees: Vec<Employee>, projects: Vec<Project>, customers: Vec<Company>) -> Self {
        Self {
            employees,
            projects,
            customers,
            ..Default::default()
        }
    }

    /// Load `employees.json`, `projects.json` and `customers.json` from `dir`.
    /// A missing file yields an empty collection.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(CanonicError::validation(format!(
                "dump directory {} does not exist",
                dir.display()
            )));
        }

        let employees: Vec<Employee> = read_collection(&dir.join(EMPLOYEES_FILE))?;
        let projects: Vec<Project> = read_collection(&dir.join(PROJECTS_FILE))?;
        let customers: Vec<Company> = read_collection(&dir.join(CUSTOMERS_FILE))?;

        info!(
            employees = employees.len(),
            projects = projects.len(),
            customers = customers.len(),
            "loaded directory dump"
        );

        Ok(Self::new(employees, projects, customers))
    }

    /// Reject pages larger than `limit`, like the remote store does.
    pub fn with_max_page_size(mut self, limit: usize) -> Self {
        self.max_page_size = Some(limit);
        self
    }

    /// Make every call to `op` fail with a transport error.
    pub fn failing(mut self, op: Operation) -> Self {
        self.failing.insert(op);
        self
    }

    /// Make every `get_*` for this id fail with a transport error.
    pub fn failing_id(mut self, id: impl Into<String>) -> Self {
        self.failing_ids.insert(id.into());
        self
    }

    /// How many times `op` was called.
    pub fn calls(&self, op: Operation) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.values().sum())
            .unwrap_or(0)
    }

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn customers(&self) -> &[Company] {
        &self.customers
    }

    fn enter(&self, op: Operation, id: Option<&str>) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(op).or_default() += 1;
        }
        if self.failing.contains(&op) {
            return Err(CanonicError::Transport(format!("{op:?} unavailable")));
        }
        if let Some(id) = id {
            if self.failing_ids.contains(id) {
                return Err(CanonicError::Transport(format!("{op:?} failed for {id}")));
            }
        }
        Ok(())
    }

    fn page<T: Clone>(&self, items: impl Iterator<Item = T>, page: Page) -> Result<Vec<T>> {
        if let Some(max) = self.max_page_size {
            if page.limit > max {
                return Err(CanonicError::PageLimitExceeded { limit: page.limit });
            }
        }
        Ok(items.skip(page.offset).take(page.limit).collect())
    }
}

fn read_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        debug!(?path, "dump file missing, using empty collection");
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| CanonicError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| CanonicError::parse(format!("{}: {e}", path.display())))
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn get_employee(&self, id: &str) -> Result<Option<Employee>> {
        self.enter(Operation::GetEmployee, Some(id))?;
        Ok(self.employees.iter().find(|e| e.id == id).cloned())
    }

    async fn get_project(&self, id: &str) -> Result<Option<Project>> {
        self.enter(Operation::GetProject, Some(id))?;
        Ok(self.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn get_customer(&self, id: &str) -> Result<Option<Company>> {
        self.enter(Operation::GetCustomer, Some(id))?;
        Ok(self.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn list_customers_page(&self, page: Page) -> Result<Vec<CompanyBrief>> {
        self.enter(Operation::ListCustomers, None)?;
        self.page(self.customers.iter().map(Company::brief), page)
    }

    async fn search_projects_page(
        &self,
        query: &ProjectQuery,
        page: Page,
    ) -> Result<Vec<ProjectBrief>> {
        self.enter(Operation::SearchProjects, None)?;
        let matching = self
            .projects
            .iter()
            .filter(|p| query.include_archived || !p.is_archived())
            .filter(|p| {
                query
                    .team_member
                    .as_deref()
                    .is_none_or(|member| p.has_member(member))
            })
            .map(Project::brief);
        self.page(matching, page)
    }

    async fn search_employees_page(
        &self,
        query: &EmployeeQuery,
        page: Page,
    ) -> Result<Vec<EmployeeBrief>> {
        self.enter(Operation::SearchEmployees, None)?;
        let needle = query.query.as_deref().map(str::to_lowercase);
        let matching = self
            .employees
            .iter()
            .filter(|e| {
                needle.as_deref().is_none_or(|n| {
                    e.name.to_lowercase().contains(n) || e.id.to_lowercase().contains(n)
                })
            })
            .map(Employee::brief);
        self.page(matching, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{load_full_customers, search_all_employees, search_all_projects};

    fn fixture() -> InMemoryDirectory {
        InMemoryDirectory::load(Path::new("../../../fixtures/directory")).expect("load fixture dump")
    }

    #[test]
    fn loads_fixture_dump() {
        let dir = fixture();
        assert!(!dir.employees().is_empty());
        assert!(!dir.projects().is_empty());
        assert!(!dir.customers().is_empty());
    }

    #[test]
    fn missing_dump_dir_is_error() {
        assert!(InMemoryDirectory::load(Path::new("/definitely/not/here")).is_err());
    }

    #[tokio::test]
    async fn team_filter_and_archived_flag() {
        let dir = fixture();
        let all = search_all_projects(&dir, &ProjectQuery::everything(), None)
            .await
            .expect("search");
        assert_eq!(all.len(), dir.projects().len());

        let live = search_all_projects(&dir, &ProjectQuery::default(), None)
            .await
            .expect("search");
        assert!(live.iter().all(|p| p.status.as_deref() != Some("archived")));

        let member = &dir.projects()[0].team[0].employee;
        let mine = search_all_projects(&dir, &ProjectQuery::with_member(member.clone()), None)
            .await
            .expect("search");
        assert!(!mine.is_empty());
        assert!(mine.len() <= all.len());
    }

    #[tokio::test]
    async fn page_limit_is_enforced_and_discovered() {
        let dir = fixture().with_max_page_size(3);
        let err = dir
            .list_customers_page(Page { offset: 0, limit: 4 })
            .await
            .unwrap_err();
        assert!(err.is_page_limit());

        let customers = load_full_customers(&dir).await.expect("load");
        assert_eq!(customers.len(), dir.customers().len());
    }

    #[tokio::test]
    async fn failure_injection_and_call_counts() {
        let dir = fixture().failing(Operation::SearchEmployees);
        let err = search_all_employees(&dir, &EmployeeQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CanonicError::Transport(_)));
        assert_eq!(dir.calls(Operation::SearchEmployees), 1);
        assert_eq!(dir.calls(Operation::GetEmployee), 0);
    }

    #[tokio::test]
    async fn failing_customer_is_skipped_when_loading_full_records() {
        let base = fixture();
        let skipped = base.customers()[0].id.clone();
        let total = base.customers().len();
        let dir = base.failing_id(skipped.clone());

        let customers = load_full_customers(&dir).await.expect("load");
        assert_eq!(customers.len(), total - 1);
        assert!(customers.iter().all(|c| c.id != skipped));
    }
}
