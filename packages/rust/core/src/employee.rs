//! Employee projections attached to object tables.
//!
//! [`SecurityView`] carries just what access decisions need: department
//! flags and per-project roles with team rosters. [`ExtendedInfo`] is the
//! richer record used for solving the task, with optional field selection.

use serde::Serialize;
use tracing::{debug, instrument, warn};

use canonic_directory::{Directory, Employee, ProjectBrief, ProjectQuery, search_all_projects};
use canonic_shared::{ResolverSettings, Result};

/// Name given to an employee id the directory does not know.
pub const MISSING_EMPLOYEE_NAME: &str = "<employee not found>";

// ---------------------------------------------------------------------------
// Security view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityTeamMember {
    pub employee: String,
    /// Role within the project, not the department.
    pub role_in_project: String,
    pub time_slice: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSecurityView {
    pub id: String,
    pub status: String,
    /// The viewed employee's own role, empty if absent from the roster.
    pub role_in_project: String,
    pub team: Vec<SecurityTeamMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityView {
    pub id: String,
    pub name: String,
    pub location: String,
    pub department: String,
    pub is_executive: bool,
    pub is_operational: bool,
    pub projects: Vec<ProjectSecurityView>,
}

/// Build the access-control projection of `employee_id`.
///
/// An unknown employee gets a stub record. Project lookups that fail are
/// logged and skipped; only a failed employee fetch is an error.
#[instrument(skip(dir, settings))]
pub async fn security_view(
    dir: &dyn Directory,
    employee_id: &str,
    settings: &ResolverSettings,
) -> Result<SecurityView> {
    let (name, location, department) = match dir.get_employee(employee_id).await? {
        Some(emp) => (
            emp.name,
            emp.location.unwrap_or_default(),
            emp.department.unwrap_or_default(),
        ),
        None => {
            debug!("employee not found, using stub");
            (MISSING_EMPLOYEE_NAME.to_string(), String::new(), String::new())
        }
    };

    let briefs = match search_all_projects(dir, &ProjectQuery::with_member(employee_id), None).await
    {
        Ok(briefs) => briefs,
        Err(e) => {
            warn!(error = %e, "project search failed");
            Vec::new()
        }
    };

    let mut projects = Vec::with_capacity(briefs.len());
    for brief in briefs {
        let project = match dir.get_project(&brief.id).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                warn!(project = %brief.id, "listed project not found");
                continue;
            }
            Err(e) => {
                warn!(project = %brief.id, error = %e, "failed to load project");
                continue;
            }
        };

        let role = project
            .team
            .iter()
            .find(|m| m.employee == employee_id)
            .map(|m| m.role.clone())
            .unwrap_or_default();
        projects.push(ProjectSecurityView {
            id: project.id,
            status: project.status.unwrap_or_default(),
            role_in_project: role,
            team: project
                .team
                .into_iter()
                .map(|m| SecurityTeamMember {
                    employee: m.employee,
                    role_in_project: m.role,
                    time_slice: m.time_slice,
                })
                .collect(),
        });
    }

    Ok(SecurityView {
        id: employee_id.to_string(),
        is_executive: department == settings.executive_department,
        is_operational: settings.operational_departments.contains(&department),
        name,
        location,
        department,
        projects,
    })
}

// ---------------------------------------------------------------------------
// Extended info
// ---------------------------------------------------------------------------

/// Optional parts of [`ExtendedInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoField {
    Name,
    Email,
    Salary,
    Notes,
    Location,
    Department,
    Skills,
    Wills,
    Projects,
}

impl InfoField {
    pub const ALL: [InfoField; 9] = [
        Self::Name,
        Self::Email,
        Self::Salary,
        Self::Notes,
        Self::Location,
        Self::Department,
        Self::Skills,
        Self::Wills,
        Self::Projects,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillWillLevel {
    pub skill_will_id: String,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub customer: String,
    pub status: String,
}

impl From<ProjectBrief> for ProjectSummary {
    fn from(p: ProjectBrief) -> Self {
        Self {
            id: p.id,
            name: p.name,
            customer: p.customer.unwrap_or_default(),
            status: p.status.unwrap_or_default(),
        }
    }
}

/// Unselected fields are `None` and left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtendedInfo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<SkillWillLevel>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wills: Option<Vec<SkillWillLevel>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<ProjectSummary>>,
}

/// Build the task-solving projection of `employee_id` with the requested
/// fields. Projects are only searched when [`InfoField::Projects`] is asked
/// for; a failed search yields an empty list.
#[instrument(skip(dir))]
pub async fn extended_info(
    dir: &dyn Directory,
    employee_id: &str,
    fields: &[InfoField],
) -> Result<ExtendedInfo> {
    let emp = match dir.get_employee(employee_id).await? {
        Some(emp) => emp,
        None => {
            debug!("employee not found, using stub");
            missing_employee(employee_id)
        }
    };

    let wants = |f: InfoField| fields.contains(&f);
    let levels = |list: &[canonic_directory::SkillLevel]| {
        list.iter()
            .map(|s| SkillWillLevel {
                skill_will_id: s.name.clone(),
                level: s.level,
            })
            .collect::<Vec<_>>()
    };

    let projects = if wants(InfoField::Projects) {
        match search_all_projects(dir, &ProjectQuery::with_member(employee_id), None).await {
            Ok(briefs) => Some(briefs.into_iter().map(ProjectSummary::from).collect()),
            Err(e) => {
                warn!(error = %e, "project search failed");
                Some(Vec::new())
            }
        }
    } else {
        None
    };

    Ok(ExtendedInfo {
        id: emp.id.clone(),
        name: wants(InfoField::Name).then(|| emp.name.clone()),
        email: wants(InfoField::Email).then(|| emp.email.clone().unwrap_or_default()),
        salary: wants(InfoField::Salary).then(|| emp.salary.unwrap_or_default()),
        notes: wants(InfoField::Notes).then(|| emp.notes.clone().unwrap_or_default()),
        location: wants(InfoField::Location).then(|| emp.location.clone().unwrap_or_default()),
        department: wants(InfoField::Department)
            .then(|| emp.department.clone().unwrap_or_default()),
        skills: wants(InfoField::Skills).then(|| levels(&emp.skills)),
        wills: wants(InfoField::Wills).then(|| levels(&emp.wills)),
        projects,
    })
}

fn missing_employee(employee_id: &str) -> Employee {
    Employee {
        id: employee_id.to_string(),
        name: MISSING_EMPLOYEE_NAME.to_string(),
        email: Some(String::new()),
        salary: Some(0),
        notes: Some(String::new()),
        location: Some(String::new()),
        department: Some(String::new()),
        skills: Vec::new(),
        wills: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonic_directory::{InMemoryDirectory, Operation};
    use std::path::Path;

    fn fixture() -> InMemoryDirectory {
        InMemoryDirectory::load(Path::new("../../../fixtures/directory")).expect("fixture")
    }

    #[tokio::test]
    async fn security_view_lists_roles_and_rosters() {
        let view = security_view(&fixture(), "BwFV_151", &ResolverSettings::default())
            .await
            .expect("view");

        assert_eq!(view.name, "Marta Bianchi");
        assert!(view.is_operational);
        assert!(!view.is_executive);

        let ids: Vec<_> = view.projects.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["proj_roof_coating", "proj_line_audit"]);
        assert_eq!(view.projects[0].role_in_project, "QA");
        assert_eq!(view.projects[1].role_in_project, "Lead");
        assert_eq!(view.projects[1].status, "archived");
        assert_eq!(view.projects[0].team.len(), 2);
    }

    #[tokio::test]
    async fn executive_flag() {
        let view = security_view(&fixture(), "emp_007", &ResolverSettings::default())
            .await
            .expect("view");
        assert!(view.is_executive);
        assert!(!view.is_operational);
        assert!(view.projects.is_empty());
    }

    #[tokio::test]
    async fn unknown_employee_gets_stub() {
        let view = security_view(&fixture(), "emp_404", &ResolverSettings::default())
            .await
            .expect("view");
        assert_eq!(view.name, MISSING_EMPLOYEE_NAME);
        assert_eq!(view.department, "");

        let info = extended_info(&fixture(), "emp_404", &InfoField::ALL)
            .await
            .expect("info");
        assert_eq!(info.name.as_deref(), Some(MISSING_EMPLOYEE_NAME));
        assert_eq!(info.salary, Some(0));
        assert_eq!(info.projects, Some(Vec::new()));
    }

    #[tokio::test]
    async fn failing_project_is_skipped() {
        let dir = fixture().failing_id("proj_line_audit");
        let view = security_view(&dir, "BwFV_151", &ResolverSettings::default())
            .await
            .expect("view");
        let ids: Vec<_> = view.projects.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["proj_roof_coating"]);
    }

    #[tokio::test]
    async fn employee_fetch_error_propagates() {
        let dir = fixture().failing(Operation::GetEmployee);
        assert!(security_view(&dir, "BwFV_151", &ResolverSettings::default()).await.is_err());
        assert!(extended_info(&dir, "BwFV_151", &InfoField::ALL).await.is_err());
    }

    #[tokio::test]
    async fn extended_info_full_record() {
        let info = extended_info(&fixture(), "emp_101", &InfoField::ALL)
            .await
            .expect("info");

        assert_eq!(info.department.as_deref(), Some("Production – Italy"));
        let skills = info.skills.expect("skills");
        assert_eq!(skills[0].skill_will_id, "skill_coatings");
        assert_eq!(skills[0].level, 9);
        let projects = info.projects.expect("projects");
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].customer, "cust_nordic");
    }

    #[tokio::test]
    async fn field_selection_skips_project_search() {
        let dir = fixture();
        let info = extended_info(&dir, "emp_101", &[InfoField::Name])
            .await
            .expect("info");

        assert_eq!(info.name.as_deref(), Some("Luca Conti"));
        assert!(info.salary.is_none());
        assert_eq!(dir.calls(Operation::SearchProjects), 0);

        let json = serde_json::to_value(&info).expect("json");
        assert_eq!(json, serde_json::json!({"id": "emp_101", "name": "Luca Conti"}));
    }
}
