//! Interfaces to the language model layer.
//!
//! The engine never talks to a model directly. It asks a [`TaskAnalyzer`]
//! for task metadata and mentions, and a [`DecisionFunction`] to pick among
//! ambiguous candidates. [`crate::bridge::LlmBridge`] implements both.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use canonic_shared::{CanonicError, DetectedSystem, Result, TaskMetadata};

/// The model's pick for one mention. `None` rejects every candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub entity: String,
    #[serde(default)]
    pub selected_id: Option<String>,
}

/// Input for one arbitration round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrationRequest {
    /// Task text with auto-resolved mentions already substituted.
    pub task_text: String,
    /// Mentions awaiting a decision, in discovery order.
    pub mentions: Vec<String>,
    /// One block per mention listing its candidates.
    pub entities_with_candidates: String,
}

/// Raw mention extraction output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub systems: Vec<String>,
}

impl Extraction {
    /// Mentions trimmed of whitespace and surrounding quotes, empties dropped.
    pub fn mentions(&self) -> Vec<String> {
        clean_mentions(&self.entities)
    }

    /// Recognised subsystems; unknown names are ignored.
    pub fn detected_systems(&self) -> Vec<DetectedSystem> {
        let mut systems = Vec::new();
        for name in &self.systems {
            let system = match name.trim().to_lowercase().as_str() {
                "wiki" => DetectedSystem::Wiki,
                "timeentry" | "time_entry" => DetectedSystem::TimeEntry,
                "workload" => DetectedSystem::Workload,
                _ => continue,
            };
            if !systems.contains(&system) {
                systems.push(system);
            }
        }
        systems
    }
}

pub fn clean_mentions(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|m| m.trim().trim_matches(['"', '\'']).to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

/// Picks among ambiguous candidates.
#[async_trait]
pub trait DecisionFunction: Send + Sync {
    async fn select(&self, request: &ArbitrationRequest) -> Result<Vec<Selection>>;
}

/// Reads a task before resolution.
#[async_trait]
pub trait TaskAnalyzer: Send + Sync {
    async fn metadata(&self, text: &str) -> Result<TaskMetadata>;

    /// Mentions and subsystems in `text`. `reference` lists known lookup
    /// values to help the model recognise them.
    async fn extract_mentions(&self, text: &str, reference: &str) -> Result<Extraction>;
}

/// Stand-in when no model is configured. Every call fails, so arbitration
/// fails closed and only supplied mentions are resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLlm;

#[async_trait]
impl DecisionFunction for DisabledLlm {
    async fn select(&self, _request: &ArbitrationRequest) -> Result<Vec<Selection>> {
        Err(CanonicError::bridge("language model disabled"))
    }
}

#[async_trait]
impl TaskAnalyzer for DisabledLlm {
    async fn metadata(&self, _text: &str) -> Result<TaskMetadata> {
        Err(CanonicError::bridge("language model disabled"))
    }

    async fn extract_mentions(&self, _text: &str, _reference: &str) -> Result<Extraction> {
        Err(CanonicError::bridge("language model disabled"))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_are_trimmed_and_unquoted() {
        let extraction = Extraction {
            entities: vec![
                " \"Marta Bianchi\" ".into(),
                "'roof coating'".into(),
                "  ".into(),
                "\"\"".into(),
            ],
            systems: vec![],
        };
        assert_eq!(extraction.mentions(), vec!["Marta Bianchi", "roof coating"]);
    }

    #[test]
    fn systems_are_parsed_and_deduplicated() {
        let extraction = Extraction {
            entities: vec![],
            systems: vec!["Wiki".into(), "timeentry".into(), "wiki".into(), "crm".into()],
        };
        assert_eq!(
            extraction.detected_systems(),
            vec![DetectedSystem::Wiki, DetectedSystem::TimeEntry]
        );
    }

    #[test]
    fn selection_accepts_null() {
        let parsed: Selection =
            serde_json::from_str(r#"{"entity":"Luca","selected_id":null}"#).expect("parse");
        assert_eq!(parsed.selected_id, None);
    }

    #[tokio::test]
    async fn disabled_llm_always_fails() {
        assert!(DisabledLlm.metadata("hi").await.is_err());
        assert!(DisabledLlm.extract_mentions("hi", "").await.is_err());
    }
}
