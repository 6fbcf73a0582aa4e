//! Candidate aggregation: run the generators for each mention in cost order
//! and merge what they find.

use tracing::{debug, instrument, warn};

use canonic_shared::{Candidate, CanonicalTag, EXACT_SCORE};

use crate::fuzzy_cache::FuzzyCache;
use crate::generators::{
    self, Generated, SearchContext, exact_id, fuzzy, is_wiki_reference, looks_like_id, lookup,
    standard, wiki,
};

// ---------------------------------------------------------------------------
// CandidateMap
// ---------------------------------------------------------------------------

/// Candidates per mention, in mention discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateMap {
    entries: Vec<(String, Vec<Candidate>)>,
}

impl CandidateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record candidates for `mention`. A repeated mention keeps its first
    /// result and returns `false`.
    pub fn insert(&mut self, mention: impl Into<String>, candidates: Vec<Candidate>) -> bool {
        let mention = mention.into();
        if self.contains(&mention) {
            return false;
        }
        self.entries.push((mention, candidates));
        true
    }

    pub fn contains(&self, mention: &str) -> bool {
        self.entries.iter().any(|(m, _)| m == mention)
    }

    pub fn get(&self, mention: &str) -> Option<&[Candidate]> {
        self.entries
            .iter()
            .find(|(m, _)| m == mention)
            .map(|(_, c)| c.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Candidate])> {
        self.entries.iter().map(|(m, c)| (m.as_str(), c.as_slice()))
    }

    pub fn mentions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(m, _)| m.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First candidate anywhere in the map carrying `tag`.
    pub fn find(&self, tag: &CanonicalTag) -> Option<&Candidate> {
        self.entries
            .iter()
            .flat_map(|(_, c)| c.iter())
            .find(|c| c.entity_type == tag.entity_type && c.object_id == tag.object_id)
    }

    /// First candidate anywhere in the map with this object id.
    pub fn find_by_id(&self, object_id: &str) -> Option<&Candidate> {
        self.entries
            .iter()
            .flat_map(|(_, c)| c.iter())
            .find(|c| c.object_id == object_id)
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Candidates for every mention. Duplicate mentions collapse to the first.
#[instrument(skip_all, fields(task_id = ctx.task_id, mentions = mentions.len()))]
pub async fn search_candidates(
    mentions: &[String],
    ctx: &SearchContext<'_>,
    cache: &mut FuzzyCache,
) -> CandidateMap {
    let mut map = CandidateMap::new();
    for mention in mentions {
        if map.contains(mention) {
            debug!(mention = %mention, "duplicate mention skipped");
            continue;
        }
        let candidates = collect_candidates(mention, ctx, cache).await;
        debug!(mention = %mention, found = candidates.len(), "candidates collected");
        map.insert(mention.clone(), candidates);
    }
    map
}

/// Candidates for one mention, best first.
///
/// Cheap and unambiguous generators run first; later ones only run while
/// nothing better has been found. Generator failures are logged and their
/// partial results kept.
pub async fn collect_candidates(
    mention: &str,
    ctx: &SearchContext<'_>,
    cache: &mut FuzzyCache,
) -> Vec<Candidate> {
    if ctx.settings.is_excluded(mention) {
        debug!(mention, "excluded mention");
        return Vec::new();
    }

    let mut pool = Vec::new();

    if is_wiki_reference(mention) {
        let found = tolerate("wiki", mention, wiki::generate(mention, ctx).await);
        if found.iter().any(Candidate::is_exact) {
            return finalize(found, ctx.settings.max_candidates);
        }
        pool.extend(found);
    }

    if looks_like_id(mention) {
        pool.extend(tolerate("exact_id", mention, exact_id::generate(mention, ctx).await));
    }

    if pool.is_empty() {
        pool.extend(tolerate(
            "standard",
            mention,
            standard::generate(mention, ctx, cache).await,
        ));
    }

    if !pool.iter().any(Candidate::is_exact) {
        pool.extend(tolerate("lookup", mention, lookup::generate(mention, ctx)));
    }

    if pool.is_empty() {
        pool.extend(tolerate(
            "fuzzy",
            mention,
            fuzzy::generate(mention, ctx, cache).await,
        ));
    }

    finalize(pool, ctx.settings.max_candidates)
}

fn tolerate(generator: &str, mention: &str, result: Generated) -> Vec<Candidate> {
    match result {
        Ok(found) => found,
        Err(generators::GenerationError { partial, source }) => {
            warn!(generator, mention, error = %source, kept = partial.len(), "generator failed, keeping partial results");
            partial
        }
    }
}

/// Sort best first, keep the best per identity, drop imperfect candidates
/// when a perfect one exists, and cap.
fn finalize(mut pool: Vec<Candidate>, max: usize) -> Vec<Candidate> {
    pool.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut unique: Vec<Candidate> = Vec::with_capacity(pool.len());
    for candidate in pool {
        let seen = unique
            .iter()
            .any(|u| u.entity_type == candidate.entity_type && u.object_id == candidate.object_id);
        if !seen {
            unique.push(candidate);
        }
    }

    if unique.first().is_some_and(|c| c.score >= EXACT_SCORE) {
        unique.retain(Candidate::is_exact);
    }
    unique.truncate(max);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::testing::Fixture;
    use canonic_directory::{InMemoryDirectory, Operation};
    use canonic_shared::EntityType;
    use std::path::Path;

    async fn collect(fx: &Fixture, mention: &str, task: &str) -> Vec<Candidate> {
        let mut cache = FuzzyCache::new();
        collect_candidates(mention, &fx.ctx(task), &mut cache).await
    }

    #[tokio::test]
    async fn id_mention_auto_scores_exact() {
        let fx = Fixture::load();
        let found = collect(&fx, "BwFV_151", "").await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag().braced(), "{employee:BwFV_151}");
        assert_eq!(found[0].score, EXACT_SCORE);
    }

    #[tokio::test]
    async fn document_path_bypasses_directory() {
        let fx = Fixture::load();
        let found = collect(&fx, "production/line_safety_rules.md", "").await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entity_type, EntityType::Wiki);
        assert_eq!(found[0].score, EXACT_SCORE);
        assert_eq!(fx.directory.total_calls(), 0);
    }

    #[tokio::test]
    async fn excluded_mention_has_no_candidates() {
        let fx = Fixture::load();
        assert!(collect(&fx, "Bellini Coatings", "").await.is_empty());
        assert_eq!(fx.directory.total_calls(), 0);
    }

    #[tokio::test]
    async fn generic_word_never_resolves_to_a_customer() {
        let fx = Fixture::load();
        let found = collect(&fx, "customer", "").await;
        assert!(found.iter().all(|c| !c.is_exact()));
    }

    #[tokio::test]
    async fn standard_hit_skips_fuzzy() {
        let fx = Fixture::load();
        let found = collect(&fx, "Warehouse", "").await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].object_id, "proj_warehouse");
        assert_eq!(found[0].score, generators::STANDARD_SCORE);
    }

    #[tokio::test]
    async fn fuzzy_runs_only_when_nothing_else_matched() {
        let fx = Fixture::load();
        let found = collect(&fx, "Jon Smith", "").await;

        assert_eq!(found[0].object_id, "emp_042");
        assert!(found[0].score < EXACT_SCORE);
    }

    #[tokio::test]
    async fn failing_generator_keeps_partial_results() {
        let dir = InMemoryDirectory::load(Path::new("../../../fixtures/directory"))
            .expect("fixture")
            .failing(Operation::GetCustomer);
        let fx = Fixture::load().with_directory(dir);

        let found = collect(&fx, "proj_marine", "").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].object_id, "proj_marine");
    }

    #[test]
    fn finalize_dedupes_filters_and_caps() {
        let pool = vec![
            Candidate::new(EntityType::Project, "p1", "P1", 85.0),
            Candidate::new(EntityType::Customer, "c1", "C1", 100.0),
            Candidate::new(EntityType::Customer, "c1", "C1 contact", 90.0),
            Candidate::new(EntityType::Skill, "s1", "S1", 100.0),
        ];
        let out = finalize(pool, 10);
        let ids: Vec<_> = out.iter().map(|c| c.object_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "s1"]);

        let many = (0..15)
            .map(|i| Candidate::new(EntityType::Employee, format!("e{i}"), "E", 70.0))
            .collect();
        assert_eq!(finalize(many, 10).len(), 10);
    }

    #[tokio::test]
    async fn duplicate_mentions_collapse() {
        let fx = Fixture::load();
        let mut cache = FuzzyCache::new();
        let mentions = vec!["BwFV_151".to_string(), "BwFV_151".to_string()];
        let map = search_candidates(&mentions, &fx.ctx(""), &mut cache).await;

        assert_eq!(map.len(), 1);
        assert_eq!(fx.directory.calls(Operation::GetEmployee), 1);
    }
}
