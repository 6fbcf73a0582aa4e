//! Entity resolution engine for Canonic.
//!
//! Turns free-text requests into text annotated with `{type:id}` tags plus
//! object tables, in two views: one for access-control decisions and one
//! for solving the task. [`pipeline::Engine::resolve_task`] runs the whole
//! flow; the modules below are usable on their own.

pub mod aggregator;
pub mod arbitration;
pub mod bridge;
pub mod classifier;
pub mod employee;
pub mod fuzzy_cache;
pub mod generators;
pub mod llm;
pub mod objects;
pub mod pipeline;
pub mod similarity;
pub mod substitution;
pub mod views;

pub use aggregator::{CandidateMap, collect_candidates, search_candidates};
pub use arbitration::{Resolution, describe, resolve};
pub use bridge::LlmBridge;
pub use classifier::{Classification, classify};
pub use employee::{ExtendedInfo, InfoField, SecurityView, extended_info, security_view};
pub use fuzzy_cache::FuzzyCache;
pub use generators::{GenerationError, SearchContext};
pub use llm::{ArbitrationRequest, DecisionFunction, DisabledLlm, Extraction, Selection, TaskAnalyzer};
pub use objects::build_object_table;
pub use pipeline::{Engine, ProgressReporter, SilentProgress, TaskInput, TaskResolution};
pub use substitution::Substitution;
pub use views::{EngineOutput, ViewState, construct_views, requester_prefix};
