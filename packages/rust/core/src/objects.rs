//! Object table from the tags present in substituted text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use canonic_shared::{CanonicalTag, EntityType, ObjectEntry, ObjectTable};

use crate::aggregator::CandidateMap;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+):([^}]+)\}").expect("valid regex"));

/// Every distinct tag in `text`, in order of first appearance, with an
/// unknown kind skipped.
pub fn find_tags(text: &str) -> Vec<CanonicalTag> {
    let mut tags: Vec<CanonicalTag> = Vec::new();
    for caps in TAG_RE.captures_iter(text) {
        let Ok(kind) = caps[1].parse::<EntityType>() else {
            continue;
        };
        let tag = CanonicalTag::new(kind, &caps[2]);
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// One entry per tag in `text`, carrying the first matching candidate's data.
///
/// A tag no candidate accounts for is left out.
pub fn build_object_table(text: &str, candidates: &CandidateMap) -> ObjectTable {
    let mut table = ObjectTable::new();
    for tag in find_tags(text) {
        match candidates.find(&tag) {
            Some(candidate) => table.insert(ObjectEntry::new(
                tag.entity_type,
                tag.object_id,
                candidate.data.clone(),
            )),
            None => debug!(tag = %tag, "tag without candidate"),
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonic_shared::Candidate;
    use serde_json::json;

    fn map() -> CandidateMap {
        let mut map = CandidateMap::new();
        map.insert(
            "Marta",
            vec![
                Candidate::new(EntityType::Employee, "BwFV_151", "Marta Bianchi", 100.0)
                    .with_data(json!({"name": "Marta Bianchi"})),
            ],
        );
        map.insert(
            "leave policy",
            vec![Candidate::new(EntityType::Wiki, "hr/leave_policy.md", "leave policy", 100.0)],
        );
        map
    }

    #[test]
    fn entries_follow_text_order() {
        let text = "Does {wiki:hr/leave_policy.md} apply to {employee:BwFV_151}?";
        let table = build_object_table(text, &map());

        let keys: Vec<_> = table.iter().map(|e| e.tag().to_string()).collect();
        assert_eq!(keys, vec!["wiki:hr/leave_policy.md", "employee:BwFV_151"]);
        let marta = table
            .get(&CanonicalTag::new(EntityType::Employee, "BwFV_151"))
            .expect("employee entry");
        assert_eq!(marta.data, Some(json!({"name": "Marta Bianchi"})));
    }

    #[test]
    fn unknown_tags_are_omitted() {
        let text = "{employee:ghost} and {team:alpha} and {employee:BwFV_151}";
        let table = build_object_table(text, &map());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn building_twice_is_identical() {
        let text = "{employee:BwFV_151} asks about {employee:BwFV_151}";
        let first = build_object_table(text, &map());
        let second = build_object_table(text, &map());
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }
}
