//! Split mentions into auto-resolvable, needing arbitration, and unmatched.

use canonic_shared::Candidate;

use crate::aggregator::CandidateMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Exactly one perfect candidate.
    pub auto: Vec<(String, Candidate)>,
    /// Several candidates, or only imperfect ones.
    pub pending: Vec<(String, Vec<Candidate>)>,
    /// No candidates at all.
    pub unmatched: Vec<String>,
}

impl Classification {
    pub fn needs_arbitration(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Classify every mention, preserving discovery order within each group.
///
/// Two or more perfect candidates are never auto-resolved; the tie goes to
/// arbitration.
pub fn classify(map: &CandidateMap) -> Classification {
    let mut out = Classification::default();
    for (mention, candidates) in map.iter() {
        if candidates.is_empty() {
            out.unmatched.push(mention.to_string());
            continue;
        }
        let mut perfect = candidates.iter().filter(|c| c.is_exact());
        match (perfect.next(), perfect.next()) {
            (Some(only), None) => out.auto.push((mention.to_string(), only.clone())),
            _ => out.pending.push((mention.to_string(), candidates.to_vec())),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonic_shared::EntityType;

    fn cand(id: &str, score: f64) -> Candidate {
        Candidate::new(EntityType::Employee, id, id, score)
    }

    #[test]
    fn partitions_by_perfect_count() {
        let mut map = CandidateMap::new();
        map.insert("marta", vec![cand("e1", 100.0)]);
        map.insert("luca", vec![cand("e2", 85.0), cand("e3", 85.0)]);
        map.insert("tie", vec![cand("e4", 100.0), cand("e5", 100.0)]);
        map.insert("nobody", vec![]);
        map.insert("jon", vec![cand("e6", 78.0)]);

        let c = classify(&map);
        assert_eq!(c.auto.len(), 1);
        assert_eq!(c.auto[0].0, "marta");
        let pending: Vec<_> = c.pending.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(pending, vec!["luca", "tie", "jon"]);
        assert_eq!(c.unmatched, vec!["nobody"]);
        assert!(c.needs_arbitration());
    }

    #[test]
    fn empty_map_needs_nothing() {
        let c = classify(&CandidateMap::new());
        assert!(!c.needs_arbitration());
        assert!(c.auto.is_empty() && c.unmatched.is_empty());
    }
}
