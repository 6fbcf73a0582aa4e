//! Security and solver views of one resolved task.
//!
//! The security view always knows who is asking. The solver view only does
//! when the requester asks about themselves. Each table is enriched on its
//! own: employees get a [`SecurityView`](crate::employee::SecurityView) in
//! the security table and [`ExtendedInfo`](crate::employee::ExtendedInfo)
//! in the solver table.

use serde::Serialize;
use tracing::{debug, instrument, warn};

use canonic_directory::Directory;
use canonic_shared::{
    CanonicError, CanonicalTag, EntityType, ObjectEntry, ObjectTable, Requester, ResolverSettings,
    Result,
};

use crate::arbitration::Resolution;
use crate::employee::{InfoField, extended_info, security_view};

/// Who is asking, relative to what they ask about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// Guests, and employees with no known id.
    Guest,
    SelfReferencingEmployee { employee_id: String },
    OtherReferencingEmployee { employee_id: String },
}

impl ViewState {
    pub fn new(requester: &Requester, asking_about_self: bool) -> Self {
        match requester.employee_id() {
            None => Self::Guest,
            Some(id) if asking_about_self => Self::SelfReferencingEmployee {
                employee_id: id.to_string(),
            },
            Some(id) => Self::OtherReferencingEmployee {
                employee_id: id.to_string(),
            },
        }
    }

    pub fn requester_tag(&self) -> Option<CanonicalTag> {
        match self {
            Self::Guest => None,
            Self::SelfReferencingEmployee { employee_id }
            | Self::OtherReferencingEmployee { employee_id } => {
                Some(CanonicalTag::new(EntityType::Employee, employee_id.clone()))
            }
        }
    }
}

/// First line of the task text, naming the requester when known.
pub fn requester_prefix(requester: &Requester) -> String {
    let today = requester.today.as_deref().unwrap_or_default();
    if requester.is_public {
        return format!("Today, {today}. Guest asks:\n");
    }
    match requester.employee_id() {
        Some(id) => format!(
            "Today, {today}. Requester {} asks:\n",
            CanonicalTag::new(EntityType::Employee, id).braced()
        ),
        None => format!("Today, {today}. Employee asks:\n"),
    }
}

/// What the engine hands downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineOutput {
    pub security_text: String,
    pub security_objects: ObjectTable,
    pub solver_text: String,
    pub solver_objects: ObjectTable,
    /// Advisory: mentions that could not be tied to an object.
    pub unresolved_mentions: Vec<String>,
    /// Entity kinds present in the solver table.
    pub detected_entity_types: Vec<EntityType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    Security,
    Solver,
}

/// Build both views from a finished resolution.
#[instrument(skip_all, fields(objects = resolution.objects.len(), asking_about_self = asking_about_self))]
pub async fn construct_views(
    resolution: Resolution,
    requester: &Requester,
    asking_about_self: bool,
    dir: &dyn Directory,
    settings: &ResolverSettings,
) -> EngineOutput {
    let state = ViewState::new(requester, asking_about_self);
    let prefix = requester_prefix(requester);
    debug!(?state, "constructing views");

    let Resolution {
        text,
        objects,
        unresolved,
    } = resolution;

    let prefixed = format!("{prefix}{text}");
    let (mut security_objects, mut solver_objects, solver_text) = match &state {
        ViewState::Guest => (objects.clone(), objects, prefixed.clone()),
        ViewState::SelfReferencingEmployee { employee_id } => {
            let with_author = objects.with_leading(author_entry(dir, employee_id).await);
            (with_author.clone(), with_author, prefixed.clone())
        }
        ViewState::OtherReferencingEmployee { employee_id } => {
            let with_author = objects.with_leading(author_entry(dir, employee_id).await);
            (with_author, objects, text)
        }
    };

    enrich(&mut security_objects, Projection::Security, dir, settings).await;
    enrich(&mut solver_objects, Projection::Solver, dir, settings).await;

    EngineOutput {
        security_text: prefixed,
        detected_entity_types: solver_objects.entity_types(),
        security_objects,
        solver_text,
        solver_objects,
        unresolved_mentions: unresolved,
    }
}

/// Requester entry with the raw directory record, or no data if it could
/// not be fetched.
async fn author_entry(dir: &dyn Directory, employee_id: &str) -> ObjectEntry {
    let data = match dir.get_employee(employee_id).await {
        Ok(Some(employee)) => serde_json::to_value(employee).ok(),
        Ok(None) => None,
        Err(e) => {
            warn!(employee = employee_id, error = %e, "failed to load requester");
            None
        }
    };
    ObjectEntry::new(EntityType::Employee, employee_id, data)
}

async fn enrich(
    table: &mut ObjectTable,
    projection: Projection,
    dir: &dyn Directory,
    settings: &ResolverSettings,
) {
    for entry in table.iter_mut() {
        let outcome = match entry.entity_type {
            EntityType::Employee => match projection {
                Projection::Security => security_view(dir, &entry.id, settings)
                    .await
                    .and_then(to_json)
                    .map(Some),
                Projection::Solver => extended_info(dir, &entry.id, &InfoField::ALL)
                    .await
                    .and_then(to_json)
                    .map(Some),
            },
            EntityType::Project => match dir.get_project(&entry.id).await {
                Ok(Some(project)) => to_json(project).map(Some),
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            },
            EntityType::Customer
            | EntityType::Wiki
            | EntityType::Department
            | EntityType::Skill
            | EntityType::Will
            | EntityType::Location => continue,
        };

        match outcome {
            Ok(Some(data)) => entry.data = Some(data),
            Ok(None) => debug!(tag = %entry.tag(), "nothing to enrich with"),
            Err(e) => {
                warn!(tag = %entry.tag(), ?projection, error = %e, "enrichment failed");
                entry.data = None;
            }
        }
    }
}

fn to_json<T: Serialize>(value: T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| CanonicError::parse(format!("serialize view: {e}")))
}
