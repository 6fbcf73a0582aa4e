//! Core domain types for entity resolution.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::CanonicError;

/// Score carried by an exact, unambiguous match.
pub const EXACT_SCORE: f64 = 100.0;

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// The closed set of entity kinds a mention can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Employee,
    Project,
    Customer,
    Wiki,
    Department,
    Skill,
    Will,
    Location,
}

impl EntityType {
    /// Every entity kind, in declaration order.
    pub const ALL: [EntityType; 8] = [
        Self::Employee,
        Self::Project,
        Self::Customer,
        Self::Wiki,
        Self::Department,
        Self::Skill,
        Self::Will,
        Self::Location,
    ];

    /// Tag prefix used in `{type:id}` markers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Project => "project",
            Self::Customer => "customer",
            Self::Wiki => "wiki",
            Self::Department => "department",
            Self::Skill => "skill",
            Self::Will => "will",
            Self::Location => "location",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CanonicError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CanonicError::validation(format!("unknown entity type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A possible resolution of a mention to one database object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub entity_type: EntityType,
    pub object_id: String,
    pub display_name: String,
    /// Confidence in `[0, 100]`.
    pub score: f64,
    /// Raw record the candidate was built from, when one was fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Candidate {
    pub fn new(
        entity_type: EntityType,
        object_id: impl Into<String>,
        display_name: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            entity_type,
            object_id: object_id.into(),
            display_name: display_name.into(),
            score,
            data: None,
        }
    }

    /// Attach the raw record.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Whether this candidate is a perfect match.
    pub fn is_exact(&self) -> bool {
        self.score >= EXACT_SCORE
    }

    /// The tag this candidate would substitute into text.
    pub fn tag(&self) -> CanonicalTag {
        CanonicalTag::new(self.entity_type, self.object_id.clone())
    }
}

// ---------------------------------------------------------------------------
// CanonicalTag
// ---------------------------------------------------------------------------

/// A `type:id` pair identifying one object.
///
/// `Display` renders the bare key (`employee:emp_042`); [`CanonicalTag::braced`]
/// renders the inline marker (`{employee:emp_042}`) downstream consumers parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalTag {
    pub entity_type: EntityType,
    pub object_id: String,
}

impl CanonicalTag {
    pub fn new(entity_type: EntityType, object_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            object_id: object_id.into(),
        }
    }

    /// Inline marker form.
    pub fn braced(&self) -> String {
        format!("{{{self}}}")
    }
}

impl fmt::Display for CanonicalTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.object_id)
    }
}

impl FromStr for CanonicalTag {
    type Err = CanonicError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim_start_matches('{').trim_end_matches('}');
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| CanonicError::validation(format!("malformed tag '{s}'")))?;
        if id.is_empty() {
            return Err(CanonicError::validation(format!("tag '{s}' has no id")));
        }
        Ok(Self::new(kind.parse()?, id))
    }
}

// ---------------------------------------------------------------------------
// Object table
// ---------------------------------------------------------------------------

/// One resolved object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub id: String,
    pub data: Option<serde_json::Value>,
}

impl ObjectEntry {
    pub fn new(entity_type: EntityType, id: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            entity_type,
            id: id.into(),
            data,
        }
    }

    pub fn tag(&self) -> CanonicalTag {
        CanonicalTag::new(self.entity_type, self.id.clone())
    }
}

/// Insertion-ordered mapping from canonical tag to object entry.
///
/// Serializes as a JSON object keyed by `type:id`, preserving order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectTable {
    entries: Vec<ObjectEntry>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. An existing entry with the same tag is replaced in place.
    pub fn insert(&mut self, entry: ObjectEntry) {
        match self.position(&entry.tag()) {
            Some(idx) => self.entries[idx] = entry,
            None => self.entries.push(entry),
        }
    }

    /// Copy of this table with `entry` as the first key.
    ///
    /// Entries already in the table win over `entry` for the same tag, but
    /// the tag keeps the leading position.
    pub fn with_leading(&self, entry: ObjectEntry) -> Self {
        let mut table = Self { entries: vec![entry] };
        for existing in &self.entries {
            table.insert(existing.clone());
        }
        table
    }

    pub fn get(&self, tag: &CanonicalTag) -> Option<&ObjectEntry> {
        self.position(tag).map(|idx| &self.entries[idx])
    }

    pub fn get_mut(&mut self, tag: &CanonicalTag) -> Option<&mut ObjectEntry> {
        self.position(tag).map(|idx| &mut self.entries[idx])
    }

    pub fn contains(&self, tag: &CanonicalTag) -> bool {
        self.position(tag).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ObjectEntry> {
        self.entries.iter_mut()
    }

    /// Distinct entity kinds present, in first-seen order.
    pub fn entity_types(&self) -> Vec<EntityType> {
        let mut kinds = Vec::new();
        for entry in &self.entries {
            if !kinds.contains(&entry.entity_type) {
                kinds.push(entry.entity_type);
            }
        }
        kinds
    }

    fn position(&self, tag: &CanonicalTag) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.entity_type == tag.entity_type && e.id == tag.object_id)
    }
}

impl Serialize for ObjectTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.tag().to_string(), entry)?;
        }
        map.end()
    }
}

impl FromIterator<ObjectEntry> for ObjectTable {
    fn from_iter<I: IntoIterator<Item = ObjectEntry>>(iter: I) -> Self {
        let mut table = Self::new();
        for entry in iter {
            table.insert(entry);
        }
        table
    }
}

// ---------------------------------------------------------------------------
// Task context
// ---------------------------------------------------------------------------

/// Per-task facts derived once before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Detected language of the request, e.g. `English`.
    #[serde(default = "default_language")]
    pub language: String,
    /// Output format the requester asked for, if any.
    #[serde(default)]
    pub expected_format: Option<String>,
    /// English translation, present when the request is not in English.
    #[serde(default)]
    pub translation: Option<String>,
    /// Whether the requester is asking about themselves.
    #[serde(default)]
    pub is_asking_about_self: bool,
}

impl Default for TaskMetadata {
    fn default() -> Self {
        Self {
            language: default_language(),
            expected_format: None,
            translation: None,
            is_asking_about_self: false,
        }
    }
}

fn default_language() -> String {
    "English".into()
}

impl TaskMetadata {
    pub fn is_english(&self) -> bool {
        self.language.eq_ignore_ascii_case("english")
    }

    /// The translation to resolve against, if the request needs one.
    pub fn usable_translation(&self) -> Option<&str> {
        if self.is_english() {
            return None;
        }
        self.translation.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Who is asking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requester {
    /// Unauthenticated guest.
    #[serde(default)]
    pub is_public: bool,
    /// Employee id of the authenticated requester.
    #[serde(default)]
    pub current_user: Option<String>,
    /// Date string injected into the request prefix.
    #[serde(default)]
    pub today: Option<String>,
}

impl Requester {
    pub fn guest(today: impl Into<String>) -> Self {
        Self {
            is_public: true,
            current_user: None,
            today: Some(today.into()),
        }
    }

    pub fn employee(id: impl Into<String>, today: impl Into<String>) -> Self {
        Self {
            is_public: false,
            current_user: Some(id.into()),
            today: Some(today.into()),
        }
    }

    /// Employee id when the requester is an identified employee.
    pub fn employee_id(&self) -> Option<&str> {
        if self.is_public {
            return None;
        }
        self.current_user.as_deref().filter(|id| !id.is_empty())
    }
}

/// Subsystems a request touches beyond plain entity lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedSystem {
    Wiki,
    TimeEntry,
    Workload,
}
