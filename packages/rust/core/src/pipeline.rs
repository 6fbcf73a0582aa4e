//! End-to-end task resolution: metadata → mentions → candidates → resolve →
//! views.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument, warn};

use canonic_directory::{Directory, DocumentStore};
use canonic_lookups::LookupStore;
use canonic_shared::{CanonicError, DetectedSystem, Requester, ResolverSettings, Result, TaskMetadata};

use crate::aggregator::{CandidateMap, search_candidates};
use crate::arbitration::resolve;
use crate::fuzzy_cache::FuzzyCache;
use crate::generators::SearchContext;
use crate::llm::{DecisionFunction, TaskAnalyzer, clean_mentions};
use crate::views::{EngineOutput, construct_views};

/// One task to resolve.
#[derive(Debug, Clone)]
pub struct TaskInput {
    pub task_id: String,
    pub text: String,
    pub requester: Requester,
    /// Mentions to resolve as given, skipping model extraction.
    pub mentions: Option<Vec<String>>,
}

/// Result of [`Engine::resolve_task`].
#[derive(Debug, Clone, Serialize)]
pub struct TaskResolution {
    pub task_id: String,
    pub metadata: TaskMetadata,
    /// Original text when resolution ran on a translation.
    pub national_text: Option<String>,
    pub detected_systems: Vec<DetectedSystem>,
    #[serde(skip)]
    pub candidates: CandidateMap,
    #[serde(flatten)]
    pub output: EngineOutput,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Progress callback for long-running resolution.
pub trait ProgressReporter: Send + Sync {
    /// A new phase started.
    fn phase(&self, name: &str);
    /// Candidates were collected for one mention.
    fn mention_searched(&self, mention: &str, candidates: usize, current: usize, total: usize);
    /// Resolution finished.
    fn done(&self, result: &TaskResolution);
}

/// No-op progress reporter.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn mention_searched(&self, _mention: &str, _candidates: usize, _current: usize, _total: usize) {}
    fn done(&self, _result: &TaskResolution) {}
}

/// Everything resolution reads from.
#[derive(Clone, Copy)]
pub struct Engine<'a> {
    pub directory: &'a dyn Directory,
    pub documents: &'a dyn DocumentStore,
    pub lookups: &'a LookupStore,
    pub settings: &'a ResolverSettings,
    pub org: Option<&'a str>,
    pub analyzer: &'a dyn TaskAnalyzer,
    pub decider: &'a dyn DecisionFunction,
}

impl Engine<'_> {
    /// Candidate search context for one task.
    pub fn search_context<'s>(&'s self, task_id: &'s str, task_text: &'s str) -> SearchContext<'s> {
        SearchContext {
            directory: self.directory,
            documents: self.documents,
            lookups: self.lookups,
            settings: self.settings,
            org: self.org,
            task_id,
            task_text,
        }
    }

    /// Resolve one task.
    ///
    /// Model failures degrade the result (default metadata, no extracted
    /// mentions, unresolved arbitration) but never fail it. Only an empty
    /// task is rejected.
    #[instrument(skip_all, fields(task_id = %input.task_id))]
    pub async fn resolve_task(
        &self,
        input: TaskInput,
        cache: &mut FuzzyCache,
        progress: &dyn ProgressReporter,
    ) -> Result<TaskResolution> {
        let start = Instant::now();
        if input.text.trim().is_empty() {
            return Err(CanonicError::validation("task text is empty"));
        }
        info!("starting resolution");
        cache.reset_for_task(&input.task_id);

        // --- Metadata and translation ---
        progress.phase("Analyzing task");
        let metadata = match self.analyzer.metadata(&input.text).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(error = %e, "metadata extraction failed, using defaults");
                TaskMetadata::default()
            }
        };
        let (text, national_text) = match metadata.usable_translation() {
            Some(translation) => {
                info!(language = %metadata.language, "resolving on translation");
                (translation.to_string(), Some(input.text.clone()))
            }
            None => (input.text.clone(), None),
        };

        // --- Mentions ---
        let (mentions, detected_systems) = match &input.mentions {
            Some(given) => (clean_mentions(given), Vec::new()),
            None => {
                progress.phase("Extracting mentions");
                let reference = self.lookups.format_for_prompt();
                match self.analyzer.extract_mentions(&text, &reference).await {
                    Ok(extraction) => (extraction.mentions(), extraction.detected_systems()),
                    Err(e) => {
                        warn!(error = %e, "mention extraction failed");
                        (Vec::new(), Vec::new())
                    }
                }
            }
        };
        info!(mentions = mentions.len(), systems = ?detected_systems, "mentions extracted");

        // --- Candidates ---
        progress.phase("Searching candidates");
        let ctx = self.search_context(&input.task_id, &text);
        let candidates = search_candidates(&mentions, &ctx, cache).await;
        let total = candidates.len();
        for (i, (mention, found)) in candidates.iter().enumerate() {
            progress.mention_searched(mention, found.len(), i + 1, total);
        }

        // --- Resolve ---
        progress.phase("Resolving mentions");
        let resolution = resolve(&text, &candidates, self.decider).await;

        // --- Views ---
        progress.phase("Building views");
        let output = construct_views(
            resolution,
            &input.requester,
            metadata.is_asking_about_self,
            self.directory,
            self.settings,
        )
        .await;

        let result = TaskResolution {
            task_id: input.task_id,
            metadata,
            national_text,
            detected_systems,
            candidates,
            output,
            elapsed: start.elapsed(),
        };

        progress.done(&result);
        info!(
            objects = result.output.solver_objects.len(),
            unresolved = result.output.unresolved_mentions.len(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "resolution complete"
        );
        Ok(result)
    }
}
