//! Application configuration for Canonic.
//!
//! User config lives at `~/.canonic/canonic.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CanonicError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "canonic.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".canonic";

// ---------------------------------------------------------------------------
// Config structs (matching canonic.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory store connection.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// LLM bridge subprocess.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Local data locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Resolution tuning.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Organization facts used by employee projections.
    #[serde(default)]
    pub organization: OrganizationConfig,
}

/// `[directory]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Base URL of the directory API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Read a dumped snapshot from this directory instead of calling the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_dir: Option<String>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            dump_dir: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[bridge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Runtime that executes the bridge script.
    #[serde(default = "default_bridge_cmd")]
    pub cmd: String,

    /// Bridge script path, relative to `working_dir`.
    #[serde(default = "default_bridge_script")]
    pub script: String,

    /// Working directory for the bridge process. Empty means the current directory.
    #[serde(default)]
    pub working_dir: String,

    /// Model the bridge should use.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            cmd: default_bridge_cmd(),
            script: default_bridge_script(),
            working_dir: String::new(),
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_bridge_cmd() -> String {
    "bun".into()
}
fn default_bridge_script() -> String {
    "bridge/src/bridge.ts".into()
}
fn default_model() -> String {
    "openai/gpt-4.1-mini".into()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding `skills.json`, `wills.json`, `departments.json`, `locations.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Root of the document store; one subdirectory per organization.
    #[serde(default = "default_wiki_root")]
    pub wiki_root: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            wiki_root: default_wiki_root(),
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}
fn default_wiki_root() -> String {
    "wiki".into()
}

/// `[resolver]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Minimum similarity score (0-100) for fuzzy candidates.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Candidates kept per mention after ranking.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Results kept per entity kind by the substring search.
    #[serde(default = "default_standard_result_cap")]
    pub standard_result_cap: usize,

    /// Mentions that never resolve (compared case-insensitively).
    #[serde(default = "default_excluded_mentions")]
    pub excluded_mentions: Vec<String>,

    /// Task words that enable skill lookups.
    #[serde(default = "default_skill_keywords")]
    pub skill_keywords: Vec<String>,

    /// Task words that enable will lookups.
    #[serde(default = "default_will_keywords")]
    pub will_keywords: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            max_candidates: default_max_candidates(),
            standard_result_cap: default_standard_result_cap(),
            excluded_mentions: default_excluded_mentions(),
            skill_keywords: default_skill_keywords(),
            will_keywords: default_will_keywords(),
        }
    }
}

fn default_fuzzy_threshold() -> f64 {
    60.0
}
fn default_max_candidates() -> usize {
    10
}
fn default_standard_result_cap() -> usize {
    5
}
fn default_excluded_mentions() -> Vec<String> {
    ["bellini", "bellini coatings", "customer_id", "project_id", "employee_id"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_skill_keywords() -> Vec<String> {
    vec!["skill".into()]
}
fn default_will_keywords() -> Vec<String> {
    ["will", "willing", "eager", "interest", "travel"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// `[organization]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationConfig {
    /// Department whose members count as executives.
    #[serde(default = "default_executive_department")]
    pub executive_department: String,

    /// Departments whose members count as operational staff.
    #[serde(default = "default_operational_departments")]
    pub operational_departments: Vec<String>,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            executive_department: default_executive_department(),
            operational_departments: default_operational_departments(),
        }
    }
}

fn default_executive_department() -> String {
    "Corporate Leadership".into()
}
fn default_operational_departments() -> Vec<String> {
    [
        "Production – Italy",
        "Production – Serbia",
        "Logistics & Supply Chain",
        "Quality & HSE",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// ---------------------------------------------------------------------------
// Resolver settings (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime resolution settings, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub fuzzy_threshold: f64,
    pub max_candidates: usize,
    pub standard_result_cap: usize,
    /// Lowercased.
    pub excluded_mentions: Vec<String>,
    /// Lowercased.
    pub skill_keywords: Vec<String>,
    /// Lowercased.
    pub will_keywords: Vec<String>,
    pub executive_department: String,
    pub operational_departments: Vec<String>,
}

impl ResolverSettings {
    /// Whether a mention is on the never-resolve list.
    pub fn is_excluded(&self, mention: &str) -> bool {
        let folded = mention.trim().to_lowercase();
        self.excluded_mentions.iter().any(|m| *m == folded)
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ResolverSettings {
    fn from(config: &AppConfig) -> Self {
        let lower =
            |words: &[String]| -> Vec<String> { words.iter().map(|w| w.to_lowercase()).collect() };
        Self {
            fuzzy_threshold: config.resolver.fuzzy_threshold,
            max_candidates: config.resolver.max_candidates,
            standard_result_cap: config.resolver.standard_result_cap,
            excluded_mentions: lower(&config.resolver.excluded_mentions),
            skill_keywords: lower(&config.resolver.skill_keywords),
            will_keywords: lower(&config.resolver.will_keywords),
            executive_department: config.organization.executive_department.clone(),
            operational_departments: config.organization.operational_departments.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.canonic/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| CanonicError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.canonic/canonic.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CanonicError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| CanonicError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject values the resolver cannot work with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let threshold = config.resolver.fuzzy_threshold;
    if !(0.0..=100.0).contains(&threshold) {
        return Err(CanonicError::config(format!(
            "resolver.fuzzy_threshold must be within 0..=100, got {threshold}"
        )));
    }
    if config.resolver.max_candidates == 0 {
        return Err(CanonicError::config("resolver.max_candidates must be at least 1"));
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    init_config_in(&config_dir()?)
}

/// Write a default config file into `dir`.
pub fn init_config_in(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| CanonicError::io(dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CanonicError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CanonicError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the bridge API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.bridge.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(CanonicError::config(format!(
            "LLM API key not found. Set the {var_name} environment variable."
        ))),
    }
}
