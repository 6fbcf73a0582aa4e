//! Per-task pools for fuzzy search.
//!
//! Owned by the caller and threaded through resolution. Each category is
//! loaded at most once per task. Full customer records (with contacts) are
//! also written by the standard generator, tagged with the task that loaded
//! them, so a reset for that same task keeps them.

use tracing::debug;

use canonic_directory::{Company, EmployeeBrief, ProjectBrief};

#[derive(Debug, Clone, Default)]
pub struct FuzzyCache {
    task_id: Option<String>,
    projects: Option<Vec<ProjectBrief>>,
    customers: Option<Vec<Company>>,
    customers_task: Option<String>,
    employees: Option<Vec<EmployeeBrief>>,
}

impl FuzzyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Task the cache currently belongs to.
    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    /// Switch to `task_id`. No-op when it is already active.
    ///
    /// Projects and employees are dropped. Customers survive only if they
    /// were loaded for `task_id`.
    pub fn reset_for_task(&mut self, task_id: &str) {
        if self.task_id.as_deref() == Some(task_id) {
            return;
        }
        debug!(task_id, previous = ?self.task_id, "resetting fuzzy cache");

        self.task_id = Some(task_id.to_string());
        self.projects = None;
        self.employees = None;
        if self.customers_task.as_deref() != Some(task_id) {
            self.customers = None;
            self.customers_task = None;
        }
    }

    pub fn projects(&self) -> Option<&[ProjectBrief]> {
        self.projects.as_deref()
    }

    pub fn set_projects(&mut self, projects: Vec<ProjectBrief>) {
        self.projects = Some(projects);
    }

    pub fn employees(&self) -> Option<&[EmployeeBrief]> {
        self.employees.as_deref()
    }

    pub fn set_employees(&mut self, employees: Vec<EmployeeBrief>) {
        self.employees = Some(employees);
    }

    /// Full customer records loaded for `task_id`, if any.
    pub fn customers_for(&self, task_id: &str) -> Option<&[Company]> {
        if self.customers_task.as_deref() != Some(task_id) {
            return None;
        }
        self.customers.as_deref()
    }

    /// Record the full customer list loaded while serving `task_id`.
    pub fn store_customers(&mut self, task_id: &str, customers: Vec<Company>) {
        self.customers = Some(customers);
        self.customers_task = Some(task_id.to_string());
    }
}
