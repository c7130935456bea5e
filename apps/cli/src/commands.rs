//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use regreview_artifacts::ArtifactStore;
use regreview_capture::{CaptureOptions, RegistryClient};
use regreview_core::pipeline::{self, ProgressReporter, ReviewResult, ReviewRunConfig};
use regreview_extraction::OpenAiExtractor;
use regreview_shared::{AppConfig, Stage, init_config, load_config, validate_api_key};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// regreview: regulatory review documents for device procurement.
#[derive(Parser)]
#[command(
    name = "regreview",
    version,
    about = "Generate procurement-oriented MFDS regulatory review documents for medical devices.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output directory for artifacts and documents (overrides config).
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the whole review: capture, interpret, sections, conclusion, assemble.
    Run {
        /// Product name to search in the registry.
        #[arg(long, value_parser = non_empty)]
        product: String,

        /// Save every fetched registry page under <output>/debug/.
        #[arg(long)]
        show_browser: bool,

        /// Print the run summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Step 3: capture registry evidence for a product.
    Capture {
        #[arg(long, value_parser = non_empty)]
        product: String,

        /// Save every fetched registry page under <output>/debug/.
        #[arg(long)]
        show_browser: bool,
    },

    /// Step 4: interpret captured evidence (or fall back when there is none).
    Interpret {
        #[arg(long, value_parser = non_empty)]
        product: String,
    },

    /// Steps 5–8: render the rule-based sections.
    Sections {
        #[arg(long, value_parser = non_empty)]
        product: Option<String>,
    },

    /// Step 9: render the conclusion.
    Conclude {
        #[arg(long, value_parser = non_empty)]
        product: Option<String>,
    },

    /// Assemble the final review document.
    Assemble {
        #[arg(long, value_parser = non_empty)]
        product: Option<String>,
    },

    /// Print the newest review document in the output directory.
    Latest,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
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

fn non_empty(value: &str) -> std::result::Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("product name must not be empty".to_string());
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "regreview=info",
        1 => "regreview=debug",
        _ => "regreview=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
    let output_dir = cli.output_dir;
    match cli.command {
        Command::Run {
            product,
            show_browser,
            json,
        } => cmd_run(output_dir, &product, show_browser, json).await,
        Command::Capture {
            product,
            show_browser,
        } => cmd_capture(output_dir, &product, show_browser).await,
        Command::Interpret { product } => cmd_interpret(output_dir, &product).await,
        Command::Sections { product } => cmd_sections(output_dir, product.as_deref()),
        Command::Conclude { product } => cmd_conclude(output_dir, product.as_deref()),
        Command::Assemble { product } => cmd_assemble(output_dir, product.as_deref()),
        Command::Latest => cmd_latest(output_dir),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Loaded config plus the directories a command works in.
struct Workspace {
    config: AppConfig,
    output_dir: PathBuf,
    root_dir: PathBuf,
}

impl Workspace {
    fn load(output_dir: Option<PathBuf>) -> Result<Self> {
        let config = load_config()?;
        let root_dir = std::env::current_dir()
            .map_err(|e| eyre!("cannot determine working directory: {e}"))?;
        let output_dir = output_dir
            .unwrap_or_else(|| root_dir.join(&config.defaults.output_dir));
        Ok(Self {
            config,
            output_dir,
            root_dir,
        })
    }

    fn store(&self) -> ArtifactStore {
        ArtifactStore::new(
            &self.output_dir,
            &self.root_dir,
            &self.config.defaults.static_overview,
        )
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    output_dir: Option<PathBuf>,
    product: &str,
    show_browser: bool,
    json: bool,
) -> Result<()> {
    let ws = Workspace::load(output_dir)?;
    // Credential check before any stage work
    let api_key = validate_api_key(&ws.config)?;

    let run_config = ReviewRunConfig {
        product: product.to_string(),
        output_dir: ws.output_dir.clone(),
        root_dir: ws.root_dir.clone(),
        static_overview: ws.config.defaults.static_overview.clone(),
        registry: ws.config.registry.clone(),
        llm: ws.config.llm.clone(),
        api_key,
        show_browser,
    };

    info!(product, "starting regulatory review");

    let reporter = CliProgress::new();
    let result = match pipeline::run_review(&run_config, &reporter).await {
        Ok(result) => result,
        Err(e) => {
            reporter.spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!("  Regulatory review generated!");
    println!("  Product:    {}", result.product_name);
    println!("  Evidence:   {}", if result.evidence_found { "registry entry found" } else { "not found (conservative fallback)" });
    println!("  Risk class: {}", result.risk_class);
    println!("  Disclaimer: {}", if result.disclaimer_applied { "applied" } else { "not required" });
    println!("  Sections:   {}", result.section_count);
    println!("  Document:   {}", result.document.display());
    println!("  SHA-256:    {}", result.sha256);
    println!("  Size:       {} bytes", result.size_bytes);
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_capture(output_dir: Option<PathBuf>, product: &str, show_browser: bool) -> Result<()> {
    let ws = Workspace::load(output_dir)?;
    let store = ws.store();
    let client = RegistryClient::new(&ws.config.registry)?;

    let outcome = pipeline::run_capture(&store, &client, product, &CaptureOptions { show_browser })
        .await
        .map_err(|e| e.in_stage(Stage::Capture))?;

    if outcome.is_found() {
        println!("Evidence captured for '{product}'");
    } else {
        println!("No valid registry entry found for '{product}'; interpretation will fall back");
    }
    Ok(())
}

async fn cmd_interpret(output_dir: Option<PathBuf>, product: &str) -> Result<()> {
    let ws = Workspace::load(output_dir)?;
    let api_key = validate_api_key(&ws.config)?;
    let store = ws.store();
    let extractor = OpenAiExtractor::new(&ws.config.llm, api_key)?;

    let outcome =
        pipeline::stored_evidence(&store).map_err(|e| e.in_stage(Stage::Interpret))?;
    let understanding = pipeline::run_interpret(
        &store,
        &outcome,
        product,
        &extractor,
        &ws.config.registry.search_url,
    )
    .await
    .map_err(|e| e.in_stage(Stage::Interpret))?;

    println!(
        "Product understanding written for '{}' (risk class: {})",
        understanding.product_identity.product_name, understanding.classification.risk_class
    );
    Ok(())
}

fn cmd_sections(output_dir: Option<PathBuf>, product: Option<&str>) -> Result<()> {
    let ws = Workspace::load(output_dir)?;
    info!(product = product.unwrap_or_default(), "rendering sections");

    let bundle = pipeline::run_sections(&ws.store()).map_err(|e| e.in_stage(Stage::Sections))?;
    let rendered = bundle.steps().iter().flatten().count();
    println!("Steps 5–8 written ({rendered} sections, rules {})", bundle.rules_version.version);
    Ok(())
}

fn cmd_conclude(output_dir: Option<PathBuf>, product: Option<&str>) -> Result<()> {
    let ws = Workspace::load(output_dir)?;
    info!(product = product.unwrap_or_default(), "rendering conclusion");

    let conclusion =
        pipeline::run_conclusion(&ws.store()).map_err(|e| e.in_stage(Stage::Conclusion))?;
    println!(
        "Step 9 conclusion written (disclaimer {})",
        if conclusion.disclaimer_applied { "applied" } else { "not required" }
    );
    Ok(())
}

fn cmd_assemble(output_dir: Option<PathBuf>, product: Option<&str>) -> Result<()> {
    let ws = Workspace::load(output_dir)?;
    info!(product = product.unwrap_or_default(), "assembling document");

    let document =
        pipeline::run_assemble(&ws.store()).map_err(|e| e.in_stage(Stage::Assemble))?;
    println!("Review document generated: {}", document.written.path.display());
    Ok(())
}

fn cmd_latest(output_dir: Option<PathBuf>) -> Result<()> {
    let ws = Workspace::load(output_dir)?;
    let path = ws.store().latest_document()?;
    println!("{}", path.display());
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

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: Stage) {
        let position = Stage::ORDER.iter().position(|s| *s == stage).unwrap_or(0) + 1;
        self.spinner
            .set_message(format!("[{position}/{}] {stage}", Stage::ORDER.len()));
    }

    fn done(&self, _result: &ReviewResult) {
        self.spinner.finish_and_clear();
    }
}
