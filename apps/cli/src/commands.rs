//! CLI command definitions, routing, and tracing setup.

use std::path::Path;

use canonic_core::{
    DecisionFunction, DisabledLlm, Engine, FuzzyCache, LlmBridge, ProgressReporter, SearchContext,
    TaskAnalyzer, TaskInput, TaskResolution, collect_candidates,
};
use canonic_directory::{
    Directory, DocumentStore, FsDocumentStore, HttpDirectory, InMemoryDirectory, dump_directory,
};
use canonic_lookups::LookupStore;
use canonic_shared::{
    AppConfig, ObjectTable, Requester, ResolverSettings, init_config, load_config,
    validate_api_key,
};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Canonic: tie names in free-text requests to directory records.
#[derive(Parser)]
#[command(
    name = "canonic",
    version,
    about = "Resolve people, projects, customers and documents mentioned in a request.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Where resolution reads from. Flags override the config file.
#[derive(Args, Clone, Debug, Default)]
pub(crate) struct SourceArgs {
    /// Organization whose documents are searched.
    #[arg(long)]
    pub org: Option<String>,

    /// Read a directory dump instead of calling the directory API.
    #[arg(long)]
    pub dump_dir: Option<String>,

    /// Minimum similarity score (0-100) for fuzzy candidates.
    #[arg(long)]
    pub fuzzy_threshold: Option<f64>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Resolve one request into security and solver views.
    Resolve {
        /// Request text.
        text: String,

        /// Mention to resolve (repeatable). Skips model extraction.
        #[arg(short, long = "mention")]
        mentions: Vec<String>,

        /// Employee id of the requester.
        #[arg(long, conflicts_with = "guest")]
        requester: Option<String>,

        /// Treat the requester as an unauthenticated guest.
        #[arg(long)]
        guest: bool,

        /// Task id (defaults to a fresh UUID).
        #[arg(long)]
        task_id: Option<String>,

        /// Date for the request prefix (defaults to today).
        #[arg(long)]
        today: Option<String>,

        /// Run without the language model bridge.
        #[arg(long)]
        no_llm: bool,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Show ranked candidates for a single mention.
    Candidates {
        /// Mention text.
        mention: String,

        /// Surrounding task text (enables skill and will matching).
        #[arg(long, default_value = "")]
        task: String,

        /// Print candidates as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Print the loaded lookup tables.
    Lookups,

    /// Browse the document store.
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Snapshot the directory API into JSON files.
    Dump {
        /// Output directory.
        #[arg(short, long)]
        out: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Document store subcommands.
#[derive(Subcommand)]
pub(crate) enum DocsAction {
    /// List document paths for an organization.
    List {
        #[arg(long)]
        org: String,
    },
    /// Print one document.
    Show {
        /// Document path relative to the organization root.
        path: String,

        #[arg(long)]
        org: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "canonic=info",
        1 => "canonic=debug",
        _ => "canonic=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Resolve {
            text,
            mentions,
            requester,
            guest,
            task_id,
            today,
            no_llm,
            json,
            sources,
        } => {
            let today = today.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
            let requester = build_requester(requester, guest, today);
            let input = TaskInput {
                task_id: task_id.unwrap_or_else(new_task_id),
                text,
                requester,
                mentions: (!mentions.is_empty()).then_some(mentions),
            };
            cmd_resolve(input, no_llm, json, &sources).await
        }
        Command::Candidates {
            mention,
            task,
            json,
            sources,
        } => cmd_candidates(&mention, &task, json, &sources).await,
        Command::Lookups => cmd_lookups(),
        Command::Docs { action } => match action {
            DocsAction::List { org } => cmd_docs_list(&org).await,
            DocsAction::Show { path, org } => cmd_docs_show(&org, &path).await,
        },
        Command::Dump { out } => cmd_dump(&out).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

fn new_task_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// `--guest` wins; an employee without `--requester` stays anonymous.
fn build_requester(employee_id: Option<String>, guest: bool, today: String) -> Requester {
    if guest {
        return Requester::guest(today);
    }
    match employee_id {
        Some(id) => Requester::employee(id, today),
        None => Requester {
            is_public: false,
            current_user: None,
            today: Some(today),
        },
    }
}

// ---------------------------------------------------------------------------
// Data sources
// ---------------------------------------------------------------------------

/// Stores and settings one command resolves against.
struct Sources {
    config: AppConfig,
    settings: ResolverSettings,
    org: Option<String>,
    directory: Box<dyn Directory>,
    documents: FsDocumentStore,
    lookups: LookupStore,
}

impl Sources {
    fn open(args: &SourceArgs) -> Result<Self> {
        let mut config = load_config()?;
        if let Some(dump_dir) = &args.dump_dir {
            config.directory.dump_dir = Some(dump_dir.clone());
        }
        if let Some(threshold) = args.fuzzy_threshold {
            if !(0.0..=100.0).contains(&threshold) {
                return Err(eyre!("--fuzzy-threshold must be within 0..=100, got {threshold}"));
            }
            config.resolver.fuzzy_threshold = threshold;
        }

        let directory = open_directory(&config)?;
        let documents = FsDocumentStore::new(&config.paths.wiki_root);
        let lookups = LookupStore::load(Path::new(&config.paths.data_dir))?;
        if lookups.is_empty() {
            warn!(data_dir = %config.paths.data_dir, "no lookup tables loaded");
        }

        Ok(Self {
            settings: ResolverSettings::from(&config),
            org: args.org.clone(),
            config,
            directory,
            documents,
            lookups,
        })
    }

    fn search_context<'a>(&'a self, task_id: &'a str, task_text: &'a str) -> SearchContext<'a> {
        SearchContext {
            directory: self.directory.as_ref(),
            documents: &self.documents,
            lookups: &self.lookups,
            settings: &self.settings,
            org: self.org.as_deref(),
            task_id,
            task_text,
        }
    }
}

fn open_directory(config: &AppConfig) -> Result<Box<dyn Directory>> {
    match &config.directory.dump_dir {
        Some(dump_dir) => {
            info!(dump_dir, "using directory dump");
            Ok(Box::new(InMemoryDirectory::load(Path::new(dump_dir))?))
        }
        None => {
            info!(base_url = %config.directory.base_url, "using directory API");
            Ok(Box::new(HttpDirectory::from_config(&config.directory)?))
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_resolve(input: TaskInput, no_llm: bool, json: bool, args: &SourceArgs) -> Result<()> {
    let sources = Sources::open(args)?;

    if no_llm && input.mentions.is_none() {
        warn!("no --mention given and the model is disabled, nothing will be resolved");
    }

    let bridge = if no_llm {
        None
    } else {
        validate_api_key(&sources.config)?;
        Some(LlmBridge::start(&sources.config.bridge)?)
    };
    let analyzer: &dyn TaskAnalyzer = match &bridge {
        Some(bridge) => bridge,
        None => &DisabledLlm,
    };
    let decider: &dyn DecisionFunction = match &bridge {
        Some(bridge) => bridge,
        None => &DisabledLlm,
    };

    let engine = Engine {
        directory: sources.directory.as_ref(),
        documents: &sources.documents,
        lookups: &sources.lookups,
        settings: &sources.settings,
        org: sources.org.as_deref(),
        analyzer,
        decider,
    };

    info!(task_id = %input.task_id, "resolving task");

    let reporter = CliProgress::new();
    let mut cache = FuzzyCache::new();
    let result = engine.resolve_task(input, &mut cache, &reporter).await;
    reporter.spinner.finish_and_clear();
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_resolution(&result);
    }
    Ok(())
}

fn print_resolution(result: &TaskResolution) {
    let out = &result.output;
    println!();
    println!("  Task:       {}", result.task_id);
    println!("  Language:   {}", result.metadata.language);
    if !result.detected_systems.is_empty() {
        println!("  Systems:    {:?}", result.detected_systems);
    }
    println!();
    println!("  Security view:");
    print_indented(&out.security_text);
    print_objects(&out.security_objects);
    println!();
    println!("  Solver view:");
    print_indented(&out.solver_text);
    print_objects(&out.solver_objects);
    if !out.unresolved_mentions.is_empty() {
        println!();
        println!("  Unresolved: {}", out.unresolved_mentions.join(", "));
    }
    println!();
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

fn print_indented(text: &str) {
    for line in text.lines() {
        println!("    {line}");
    }
}

fn print_objects(table: &ObjectTable) {
    for entry in table.iter() {
        let marker = if entry.data.is_some() { "" } else { "  (no data)" };
        println!("    - {}{marker}", entry.tag());
    }
}

async fn cmd_candidates(mention: &str, task: &str, json: bool, args: &SourceArgs) -> Result<()> {
    let sources = Sources::open(args)?;
    let task_id = new_task_id();
    let task_text = if task.is_empty() { mention } else { task };

    let ctx = sources.search_context(&task_id, task_text);
    let mut cache = FuzzyCache::new();
    cache.reset_for_task(&task_id);
    let candidates = collect_candidates(mention, &ctx, &mut cache).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    if candidates.is_empty() {
        println!("No candidates for '{mention}'.");
        return Ok(());
    }
    for c in &candidates {
        println!("{:>6.1}  {:<40}  {}", c.score, c.tag().to_string(), c.display_name);
    }
    Ok(())
}

fn cmd_lookups() -> Result<()> {
    let config = load_config()?;
    let lookups = LookupStore::load(Path::new(&config.paths.data_dir))?;
    if lookups.is_empty() {
        println!("No lookup tables found in '{}'.", config.paths.data_dir);
    } else {
        println!("{}", lookups.format_for_prompt());
    }
    Ok(())
}

async fn cmd_docs_list(org: &str) -> Result<()> {
    let config = load_config()?;
    let documents = FsDocumentStore::new(&config.paths.wiki_root);
    let paths = documents.list_paths(org).await?;
    if paths.is_empty() {
        println!("No documents for '{org}'.");
    }
    for path in paths {
        println!("{path}");
    }
    Ok(())
}

async fn cmd_docs_show(org: &str, path: &str) -> Result<()> {
    let config = load_config()?;
    let documents = FsDocumentStore::new(&config.paths.wiki_root);
    match documents.read(org, path).await? {
        Some(text) => {
            println!("{text}");
            Ok(())
        }
        None => Err(eyre!("document '{path}' not found for '{org}'")),
    }
}

async fn cmd_dump(out: &str) -> Result<()> {
    let config = load_config()?;
    let directory = HttpDirectory::from_config(&config.directory)?;

    info!(out, base_url = %config.directory.base_url, "dumping directory");

    let spinner = spinner();
    spinner.set_message("Dumping directory");
    let summary = dump_directory(&directory, Path::new(out)).await;
    spinner.finish_and_clear();
    let summary = summary?;

    println!();
    println!("  Directory dumped to {out}");
    println!("  Employees: {}", summary.employees);
    println!("  Projects:  {}", summary.projects);
    println!("  Customers: {}", summary.customers);
    println!();
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    spinner.set_style(style);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        Self { spinner: spinner() }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn mention_searched(&self, mention: &str, candidates: usize, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Searching [{current}/{total}] {mention} ({candidates} candidates)"
        ));
    }

    fn done(&self, _result: &TaskResolution) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_flags_parse() {
        let cli = Cli::try_parse_from([
            "canonic",
            "-vv",
            "resolve",
            "Is Luca on roof?",
            "-m",
            "Luca",
            "--mention",
            "roof",
            "--requester",
            "emp_042",
            "--org",
            "acme",
            "--no-llm",
        ])
        .expect("parse");

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Resolve {
                mentions,
                requester,
                guest,
                no_llm,
                sources,
                ..
            } => {
                assert_eq!(mentions, vec!["Luca", "roof"]);
                assert_eq!(requester.as_deref(), Some("emp_042"));
                assert!(!guest);
                assert!(no_llm);
                assert_eq!(sources.org.as_deref(), Some("acme"));
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn guest_conflicts_with_requester() {
        let parsed = Cli::try_parse_from([
            "canonic",
            "resolve",
            "hi",
            "--guest",
            "--requester",
            "emp_042",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn requester_variants() {
        let guest = build_requester(None, true, "2025-03-01".into());
        assert!(guest.is_public);

        let employee = build_requester(Some("emp_042".into()), false, "2025-03-01".into());
        assert_eq!(employee.employee_id(), Some("emp_042"));

        let anonymous = build_requester(None, false, "2025-03-01".into());
        assert!(!anonymous.is_public);
        assert_eq!(anonymous.employee_id(), None);
        assert_eq!(anonymous.today.as_deref(), Some("2025-03-01"));
    }

    #[test]
    fn docs_require_org() {
        assert!(Cli::try_parse_from(["canonic", "docs", "list"]).is_err());
        assert!(Cli::try_parse_from(["canonic", "docs", "show", "hr/leave.md", "--org", "acme"]).is_ok());
    }
}
