//! Candidate generators.
//!
//! Each generator turns one mention into zero or more [`Candidate`]s. An
//! empty `Ok` means nothing matched; `Err` means some store could not answer,
//! and carries whatever was collected before or around the failure.

pub mod exact_id;
pub mod fuzzy;
pub mod lookup;
pub mod standard;
pub mod wiki;

use thiserror::Error;
use tracing::warn;

use canonic_directory::{Directory, DocumentStore};
use canonic_lookups::LookupStore;
use canonic_shared::{Candidate, CanonicError, ResolverSettings};

/// Score for a substring hit on a name or id.
pub const STANDARD_SCORE: f64 = 85.0;

/// Score for a substring hit on a customer's primary contact.
pub const CONTACT_SCORE: f64 = 90.0;

/// Everything a generator may consult for one task.
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    pub directory: &'a dyn Directory,
    pub documents: &'a dyn DocumentStore,
    pub lookups: &'a LookupStore,
    pub settings: &'a ResolverSettings,
    /// Organization whose documents are searched. No org, no document search.
    pub org: Option<&'a str>,
    pub task_id: &'a str,
    /// Full task text, used to gate skill and will matching.
    pub task_text: &'a str,
}

/// A generator failed part-way.
#[derive(Debug, Error)]
#[error("candidate generation failed: {source}")]
pub struct GenerationError {
    /// Candidates found before or around the failure.
    pub partial: Vec<Candidate>,
    #[source]
    pub source: CanonicError,
}

pub type Generated = std::result::Result<Vec<Candidate>, GenerationError>;

/// Accumulates candidates across independent store calls, remembering the
/// first failure.
#[derive(Debug, Default)]
pub(crate) struct Collector {
    candidates: Vec<Candidate>,
    error: Option<CanonicError>,
}

impl Collector {
    pub(crate) fn push(&mut self, candidate: Candidate) {
        self.candidates.push(candidate);
    }

    pub(crate) fn extend(&mut self, candidates: impl IntoIterator<Item = Candidate>) {
        self.candidates.extend(candidates);
    }

    pub(crate) fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub(crate) fn fail(&mut self, generator: &str, mention: &str, error: CanonicError) {
        warn!(generator, mention, error = %error, "store call failed");
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub(crate) fn finish(self) -> Generated {
        match self.error {
            None => Ok(self.candidates),
            Some(source) => Err(GenerationError {
                partial: self.candidates,
                source,
            }),
        }
    }
}

/// Whether a mention has the shape of an internal identifier.
pub fn looks_like_id(mention: &str) -> bool {
    mention.contains('_')
}

/// Whether a mention reads like a reference to a document.
pub fn is_wiki_reference(mention: &str) -> bool {
    let lower = mention.to_lowercase();
    lower.contains("wiki") || lower.contains(".md")
}

/// Whether a mention names a document path directly.
pub fn is_document_path(mention: &str) -> bool {
    mention.to_lowercase().contains(".md")
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;

    use canonic_directory::{FsDocumentStore, InMemoryDirectory};
    use canonic_lookups::LookupStore;
    use canonic_shared::ResolverSettings;

    use super::SearchContext;

    /// Fixture-backed stores for generator tests.
    pub(crate) struct Fixture {
        pub directory: InMemoryDirectory,
        pub documents: FsDocumentStore,
        pub lookups: LookupStore,
        pub settings: ResolverSettings,
    }

    impl Fixture {
        pub(crate) fn load() -> Self {
            Self {
                directory: InMemoryDirectory::load(Path::new("../../../fixtures/directory"))
                    .expect("directory fixture"),
                documents: FsDocumentStore::new("../../../fixtures/wiki"),
                lookups: LookupStore::load(Path::new("../../../fixtures/lookups"))
                    .expect("lookups fixture"),
                settings: ResolverSettings::default(),
            }
        }

        pub(crate) fn with_directory(mut self, directory: InMemoryDirectory) -> Self {
            self.directory = directory;
            self
        }

        pub(crate) fn ctx<'a>(&'a self, task_text: &'a str) -> SearchContext<'a> {
            SearchContext {
                directory: &self.directory,
                documents: &self.documents,
                lookups: &self.lookups,
                settings: &self.settings,
                org: Some("acme"),
                task_id: "task-1",
                task_text,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mention_shapes() {
        assert!(looks_like_id("BwFV_151"));
        assert!(!looks_like_id("Marta Bianchi"));
        assert!(is_wiki_reference("the Wiki page on leave"));
        assert!(is_wiki_reference("hr/leave_policy.MD"));
        assert!(!is_document_path("the wiki page on leave"));
        assert!(is_document_path("hr/leave_policy.md"));
    }

    #[test]
    fn collector_keeps_partial_results_and_first_error() {
        let mut collector = Collector::default();
        collector.push(Candidate::new(
            canonic_shared::EntityType::Project,
            "p1",
            "P1",
            85.0,
        ));
        collector.fail("test", "p", CanonicError::Transport("first".into()));
        collector.fail("test", "p", CanonicError::Transport("second".into()));

        let err = collector.finish().unwrap_err();
        assert_eq!(err.partial.len(), 1);
        assert!(err.source.to_string().contains("first"));
    }
}
