//! Static reference tables: departments, skills, wills, locations.
//!
//! Skills and wills only match when the task text mentions one of the
//! configured keywords; their ids and descriptions are too generic to
//! match everywhere.

use serde_json::{Value, json};
use tracing::debug;

use canonic_shared::{Candidate, EXACT_SCORE, EntityType};

use super::{Collector, Generated, SearchContext};
use crate::similarity::{normalize, token_set_ratio};

pub fn generate(mention: &str, ctx: &SearchContext<'_>) -> Generated {
    let matcher = Matcher {
        mention,
        needle: normalize(mention),
        threshold: ctx.settings.fuzzy_threshold,
    };
    let task = ctx.task_text.to_lowercase();
    let mut out = Collector::default();

    for dept in ctx.lookups.departments() {
        matcher.try_match(&mut out, EntityType::Department, dept, dept, dept, None);
    }

    if mentions_any(&task, &ctx.settings.skill_keywords) {
        for skill in ctx.lookups.skills() {
            let data = json!({"id": skill.id, "description": skill.description});
            for value in [&skill.id, &skill.description] {
                matcher.try_match(
                    &mut out,
                    EntityType::Skill,
                    value,
                    &skill.id,
                    &skill.description,
                    Some(&data),
                );
            }
        }
    }

    if mentions_any(&task, &ctx.settings.will_keywords) {
        for will in ctx.lookups.wills() {
            let data = json!({"id": will.id, "description": will.description});
            for value in [&will.id, &will.description] {
                matcher.try_match(
                    &mut out,
                    EntityType::Will,
                    value,
                    &will.id,
                    &will.description,
                    Some(&data),
                );
            }
        }
    }

    for loc in ctx.lookups.locations() {
        if loc.location.is_empty() {
            continue;
        }
        let data = json!({"location": loc.location, "synonyms": loc.synonyms});
        for value in std::iter::once(&loc.location).chain(&loc.synonyms) {
            matcher.try_match(
                &mut out,
                EntityType::Location,
                value,
                &loc.location,
                &loc.location,
                Some(&data),
            );
        }
    }

    debug!(mention, found = out.candidates().len(), "lookup search");
    out.finish()
}

fn mentions_any(task: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| task.contains(k.as_str()))
}

struct Matcher<'m> {
    mention: &'m str,
    needle: String,
    threshold: f64,
}

impl Matcher<'_> {
    /// Exact normalized equality scores 100. Otherwise the similarity score
    /// counts, but only against values at least as long as the mention.
    fn try_match(
        &self,
        out: &mut Collector,
        kind: EntityType,
        value: &str,
        id: &str,
        display: &str,
        data: Option<&Value>,
    ) {
        let value_norm = normalize(value);
        let score = if value_norm == self.needle {
            EXACT_SCORE
        } else if value.chars().count() >= self.mention.chars().count() {
            token_set_ratio(&self.needle, &value_norm)
        } else {
            return;
        };
        if score < self.threshold {
            return;
        }

        let mut candidate = Candidate::new(kind, id, display, score);
        if let Some(data) = data {
            candidate = candidate.with_data(data.clone());
        }
        out.push(candidate);
    }
}
