//! Directory and document store access for Canonic.
//!
//! The resolution engine only talks to [`Directory`] and [`DocumentStore`];
//! [`HttpDirectory`] and [`InMemoryDirectory`] are the two directory backends
//! and [`FsDocumentStore`] serves documents from disk.

pub mod documents;
pub mod dump;
pub mod http;
pub mod memory;
pub mod pagination;
pub mod records;

use async_trait::async_trait;
use serde::Serialize;

use canonic_shared::Result;

pub use documents::{DocumentStore, FsDocumentStore};
pub use dump::{DumpSummary, dump_directory};
pub use http::HttpDirectory;
pub use memory::{InMemoryDirectory, Operation};
pub use pagination::{
    list_all_customers, load_full_customers, paginate_all, search_all_employees,
    search_all_projects,
};
pub use records::{
    Company, CompanyBrief, Employee, EmployeeBrief, NamedRecord, Project, ProjectBrief,
    SkillLevel, TeamMember,
};

/// One page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

/// Server-side project filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectQuery {
    /// Only projects whose team includes this employee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_member: Option<String>,
    /// Include archived projects.
    pub include_archived: bool,
}

impl ProjectQuery {
    /// Every project, archived ones included.
    pub fn everything() -> Self {
        Self {
            team_member: None,
            include_archived: true,
        }
    }

    /// Every project (archived included) that `employee_id` works on.
    pub fn with_member(employee_id: impl Into<String>) -> Self {
        Self {
            team_member: Some(employee_id.into()),
            include_archived: true,
        }
    }
}

/// Server-side employee filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmployeeQuery {
    /// Substring matched against name or id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// The corporate directory: employees, projects, and customers.
///
/// `get_*` returns `Ok(None)` for a confirmed miss; `Err` means the store
/// could not answer. Page operations return at most `page.limit` items and
/// fail with `PageLimitExceeded` when the store rejects the page size.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn get_employee(&self, id: &str) -> Result<Option<Employee>>;

    async fn get_project(&self, id: &str) -> Result<Option<Project>>;

    async fn get_customer(&self, id: &str) -> Result<Option<Company>>;

    async fn list_customers_page(&self, page: Page) -> Result<Vec<CompanyBrief>>;

    async fn search_projects_page(
        &self,
        query: &ProjectQuery,
        page: Page,
    ) -> Result<Vec<ProjectBrief>>;

    async fn search_employees_page(
        &self,
        query: &EmployeeQuery,
        page: Page,
    ) -> Result<Vec<EmployeeBrief>>;
}
