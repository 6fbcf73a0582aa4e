//! Record shapes returned by the directory store.

use serde::{Deserialize, Serialize};

/// Common accessors for records that can be matched by name.
pub trait NamedRecord: Serialize {
    fn id(&self) -> &str;
    fn name(&self) -> &str;

    /// Raw JSON form, attached to candidates as opaque data.
    fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Employees
// ---------------------------------------------------------------------------

/// A skill or will with its level on the 1-10 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillLevel {
    pub name: String,
    pub level: u32,
}

/// Employee summary as returned by search and listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeBrief {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub salary: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

/// Full employee record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub salary: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub skills: Vec<SkillLevel>,
    #[serde(default)]
    pub wills: Vec<SkillLevel>,
}

impl Employee {
    pub fn brief(&self) -> EmployeeBrief {
        EmployeeBrief {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            salary: self.salary,
            location: self.location.clone(),
            department: self.department.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// One member of a project team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub employee: String,
    #[serde(default)]
    pub time_slice: f64,
    /// Role in this project (Lead, Engineer, ...), not the employee's department.
    #[serde(default)]
    pub role: String,
}

/// Project summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectBrief {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Full project record with its team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub team: Vec<TeamMember>,
}

impl Project {
    pub fn brief(&self) -> ProjectBrief {
        ProjectBrief {
            id: self.id.clone(),
            name: self.name.clone(),
            customer: self.customer.clone(),
            status: self.status.clone(),
        }
    }

    pub fn is_archived(&self) -> bool {
        self.status.as_deref() == Some("archived")
    }

    pub fn has_member(&self, employee_id: &str) -> bool {
        self.team.iter().any(|m| m.employee == employee_id)
    }
}

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

/// Customer summary. Listing does not carry contact details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyBrief {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub deal_phase: Option<String>,
}

/// Full customer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub deal_phase: Option<String>,
    #[serde(default)]
    pub primary_contact_name: Option<String>,
    #[serde(default)]
    pub primary_contact_email: Option<String>,
    #[serde(default)]
    pub account_manager: Option<String>,
    #[serde(default)]
    pub brief: Option<String>,
}

impl Company {
    pub fn brief(&self) -> CompanyBrief {
        CompanyBrief {
            id: self.id.clone(),
            name: self.name.clone(),
            location: self.location.clone(),
            deal_phase: self.deal_phase.clone(),
        }
    }

    /// Contact name, if set and non-blank.
    pub fn contact(&self) -> Option<&str> {
        self.primary_contact_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

macro_rules! named_record {
    ($($ty:ty),* $(,)?) => {
        $(
            impl NamedRecord for $ty {
                fn id(&self) -> &str {
                    &self.id
                }
                fn name(&self) -> &str {
                    &self.name
                }
            }
        )*
    };
}

named_record!(EmployeeBrief, Employee, ProjectBrief, Project, CompanyBrief, Company);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_records_deserialize() {
        let emp: Employee =
            serde_json::from_str(r#"{"id":"emp_1","name":"Ana Rossi"}"#).expect("employee");
        assert!(emp.skills.is_empty());
        assert_eq!(emp.brief().name, "Ana Rossi");

        let proj: Project = serde_json::from_str(
            r#"{"id":"proj_roof","name":"Roof Coating","status":"archived","team":[{"employee":"emp_1"}]}"#,
        )
        .expect("project");
        assert!(proj.is_archived());
        assert!(proj.has_member("emp_1"));
        assert_eq!(proj.team[0].time_slice, 0.0);
        assert_eq!(proj.team[0].role, "");
    }

    #[test]
    fn blank_contact_is_none() {
        let company = Company {
            id: "cust_1".into(),
            name: "Nordic Paints".into(),
            location: None,
            deal_phase: None,
            primary_contact_name: Some("  ".into()),
            primary_contact_email: None,
            account_manager: None,
            brief: None,
        };
        assert_eq!(company.contact(), None);
        assert_eq!(company.to_value()["id"], "cust_1");
    }
}
