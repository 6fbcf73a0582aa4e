//! Resolution pass: auto-resolve, arbitrate, substitute, build the table.

use tracing::{debug, info, instrument, warn};

use canonic_shared::{Candidate, ObjectTable};

use crate::aggregator::CandidateMap;
use crate::classifier::{Classification, classify};
use crate::llm::{ArbitrationRequest, DecisionFunction, Selection};
use crate::objects::build_object_table;
use crate::substitution::Substitution;

/// Outcome of resolving one text against its candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub text: String,
    pub objects: ObjectTable,
    /// Mentions with no candidates, then mentions arbitration rejected or
    /// could not decide.
    pub unresolved: Vec<String>,
}

/// Candidate listing for the decision function, one block per mention.
///
/// ```text
/// "Luca":
///   [employee] id:'emp_101' name:'Luca Conti' score:85%
/// ```
pub fn describe(pending: &[(String, Vec<Candidate>)]) -> String {
    pending
        .iter()
        .map(|(mention, candidates)| {
            let lines: Vec<_> = candidates
                .iter()
                .map(|c| {
                    format!(
                        "  [{}] id:'{}' name:'{}' score:{:.0}%",
                        c.entity_type, c.object_id, c.display_name, c.score
                    )
                })
                .collect();
            format!("\"{mention}\":\n{}", lines.join("\n"))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Resolve `text` using `candidates`.
///
/// Unique perfect matches are substituted first. Remaining mentions with
/// candidates go to `decide` in one call, given the partly substituted text.
/// If that call fails, all of them stay unresolved.
#[instrument(skip_all, fields(mentions = candidates.len()))]
pub async fn resolve(
    text: &str,
    candidates: &CandidateMap,
    decide: &dyn DecisionFunction,
) -> Resolution {
    let Classification {
        auto,
        pending,
        unmatched,
    } = classify(candidates);
    let mut unresolved = unmatched;
    let mut pass = Substitution::new(text);

    for (mention, candidate) in &auto {
        if pass.apply(mention, candidate) {
            debug!(mention = %mention, tag = %candidate.tag(), "auto-resolved");
        }
    }

    if !pending.is_empty() {
        let request = ArbitrationRequest {
            task_text: pass.text().to_string(),
            mentions: pending.iter().map(|(m, _)| m.clone()).collect(),
            entities_with_candidates: describe(&pending),
        };
        match decide.select(&request).await {
            Ok(selections) => {
                unresolved.extend(apply_selections(&mut pass, &pending, candidates, &selections));
            }
            Err(e) => {
                warn!(error = %e, pending = pending.len(), "arbitration failed, leaving mentions unresolved");
                unresolved.extend(pending.into_iter().map(|(m, _)| m));
            }
        }
    }

    if !unresolved.is_empty() {
        info!(unresolved = ?unresolved, "mentions left unresolved");
    }

    let text = pass.into_text();
    let objects = build_object_table(&text, candidates);
    Resolution {
        text,
        objects,
        unresolved,
    }
}

/// Apply decisions in mention order. Returns the mentions that end up
/// rejected: explicit nulls, missing answers, and unknown ids.
fn apply_selections(
    pass: &mut Substitution,
    pending: &[(String, Vec<Candidate>)],
    all: &CandidateMap,
    selections: &[Selection],
) -> Vec<String> {
    let mut rejected = Vec::new();

    for (mention, own) in pending {
        let choice = selections
            .iter()
            .find(|s| s.entity == *mention)
            .and_then(|s| s.selected_id.as_deref())
            .filter(|id| !id.is_empty());
        let Some(id) = choice else {
            debug!(mention = %mention, "arbitration rejected mention");
            rejected.push(mention.clone());
            continue;
        };

        let candidate = own
            .iter()
            .find(|c| c.object_id == id)
            .or_else(|| all.find_by_id(id));
        match candidate {
            Some(candidate) => {
                if pass.apply(mention, candidate) {
                    debug!(mention = %mention, tag = %candidate.tag(), "arbitrated");
                }
            }
            None => {
                warn!(mention = %mention, selected = id, "selection names no known candidate");
                rejected.push(mention.clone());
            }
        }
    }

    for stray in selections.iter().filter(|s| !pending.iter().any(|(m, _)| *m == s.entity)) {
        debug!(entity = %stray.entity, "ignoring selection for unknown mention");
    }

    rejected
}
