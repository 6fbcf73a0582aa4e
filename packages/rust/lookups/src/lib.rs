//! Static reference tables: skills, wills, departments, and locations.
//!
//! Loaded once from a data directory holding `skills.json`, `wills.json`
//! (objects mapping id to description), `departments.json` (list of names)
//! and `locations.json` (list of `{location, synonyms}`). The store is
//! read-only after loading.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use canonic_shared::{CanonicError, Result};

const SKILLS_FILE: &str = "skills.json";
const WILLS_FILE: &str = "wills.json";
const DEPARTMENTS_FILE: &str = "departments.json";
const LOCATIONS_FILE: &str = "locations.json";

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

/// A skill or will: stable id plus human description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupEntry {
    pub id: String,
    pub description: String,
}

/// A canonical location and the other names it goes by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub location: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

// ---------------------------------------------------------------------------
// LookupStore
// ---------------------------------------------------------------------------

/// The loaded reference tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupStore {
    skills: Vec<LookupEntry>,
    wills: Vec<LookupEntry>,
    departments: Vec<String>,
    locations: Vec<Location>,
}

impl LookupStore {
    /// Build a store from already-loaded tables.
    pub fn from_parts(
        skills: Vec<LookupEntry>,
        wills: Vec<LookupEntry>,
        departments: Vec<String>,
        locations: Vec<Location>,
    ) -> Self {
        Self {
            skills,
            wills,
            departments,
            locations,
        }
    }

    /// Load every table from `dir`. A missing directory or file yields an
    /// empty table; a malformed file is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            debug!(?dir, "lookup directory not found, using empty tables");
            return Ok(Self::default());
        }

        let skills = read_entries(&dir.join(SKILLS_FILE))?;
        let wills = read_entries(&dir.join(WILLS_FILE))?;
        let departments = read_table(&dir.join(DEPARTMENTS_FILE))?.unwrap_or_default();
        let locations: Vec<Location> = read_table(&dir.join(LOCATIONS_FILE))?.unwrap_or_default();

        let store = Self::from_parts(skills, wills, departments, locations);
        info!(
            skills = store.skills.len(),
            wills = store.wills.len(),
            departments = store.departments.len(),
            locations = store.locations.len(),
            "loaded lookup tables"
        );
        Ok(store)
    }

    pub fn skills(&self) -> &[LookupEntry] {
        &self.skills
    }

    pub fn wills(&self) -> &[LookupEntry] {
        &self.wills
    }

    pub fn departments(&self) -> &[String] {
        &self.departments
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
            && self.wills.is_empty()
            && self.departments.is_empty()
            && self.locations.is_empty()
    }

    /// Reference block for mention extraction, one `Known ...:` line per
    /// non-empty table. Empty string when every table is empty.
    pub fn format_for_prompt(&self) -> String {
        let mut lines = Vec::new();

        let entries = |rows: &[LookupEntry]| {
            rows.iter()
                .map(|e| format!("{} ({})", e.id, e.description))
                .collect::<Vec<_>>()
                .join(", ")
        };

        if !self.skills.is_empty() {
            lines.push(format!("Known skills: {}", entries(&self.skills)));
        }
        if !self.wills.is_empty() {
            lines.push(format!("Known wills: {}", entries(&self.wills)));
        }
        if !self.departments.is_empty() {
            lines.push(format!("Known departments: {}", self.departments.join(", ")));
        }
        if !self.locations.is_empty() {
            let names: Vec<_> = self.locations.iter().map(|l| l.location.as_str()).collect();
            lines.push(format!("Known locations: {}", names.join(", ")));
        }

        lines.join("\n")
    }
}

/// `{id: description}` object as entries in file order.
fn read_entries(path: &Path) -> Result<Vec<LookupEntry>> {
    let Some(table) = read_table::<Map<String, Value>>(path)? else {
        return Ok(Vec::new());
    };
    table
        .into_iter()
        .map(|(id, value)| match value {
            Value::String(description) => Ok(LookupEntry { id, description }),
            other => Err(CanonicError::parse(format!(
                "{}: description of '{id}' must be a string, got {other}",
                path.display()
            ))),
        })
        .collect()
}

fn read_table<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        debug!(?path, "lookup table missing");
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|e| CanonicError::io(path, e))?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| CanonicError::parse(format!("{}: {e}", path.display())))
}
