//! CLI command definitions, routing, and tracing setup.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

use watchshots_core::{CandidateStatus, ProgressReporter, generate_dataset_info};
use watchshots_shared::{
    AppConfig, CollectConfig, CollectSummary, DatasetInfo, init_config, load_config,
    load_config_from, renderer_token,
};
use watchshots_sources::{
    BlogSearchSource, BrowserlessRenderer, CandidateSource, LinkListSource, RedditSource,
    TableSource, UrlListSource,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// watchshots: build a smartwatch screenshot dataset.
#[derive(Parser)]
#[command(
    name = "watchshots",
    version,
    about = "Collect, normalize and catalogue smartwatch and running-app screenshots.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.watchshots/watchshots.toml).
    #[arg(long, global = true, env = "WATCHSHOTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Log file (defaults to <output_dir>/collection_log.txt).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

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

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Collect screenshots from a source.
    Collect {
        #[command(subcommand)]
        target: CollectTarget,
    },

    /// Count stored images and write dataset_info.json / dataset_info.txt.
    Report {
        #[command(flatten)]
        out: OutArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Output directory override shared by collect/report.
#[derive(Args, Clone, Debug, Default)]
pub(crate) struct OutArgs {
    /// Dataset root (defaults to `defaults.output_dir`).
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Where to collect from.
#[derive(Subcommand)]
pub(crate) enum CollectTarget {
    /// Top image posts from the configured subreddits.
    Reddit {
        #[command(flatten)]
        out: OutArgs,
    },
    /// A `category,theme,lang,url` file.
    File {
        /// Path to the URL list.
        path: PathBuf,
        #[command(flatten)]
        out: OutArgs,
    },
    /// The `[table]` URL table from the config file.
    Table {
        #[command(flatten)]
        out: OutArgs,
    },
    /// The `[[links]]` quick link list from the config file.
    Links {
        #[command(flatten)]
        out: OutArgs,
    },
    /// Blog search results rendered through a headless browser service.
    Blog {
        #[command(flatten)]
        out: OutArgs,
        /// Renderer base URL (overrides `blog.renderer_url`).
        #[arg(long)]
        renderer: Option<String>,
    },
    /// Reddit and quick links, plus blog search when a renderer is configured.
    All {
        #[command(flatten)]
        out: OutArgs,
    },
}

impl CollectTarget {
    fn out(&self) -> &OutArgs {
        match self {
            CollectTarget::Reddit { out }
            | CollectTarget::File { out, .. }
            | CollectTarget::Table { out }
            | CollectTarget::Links { out }
            | CollectTarget::Blog { out, .. }
            | CollectTarget::All { out } => out,
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

impl Cli {
    /// Dataset root this invocation works on, if it touches one.
    fn output_dir(&self, config: &AppConfig) -> Option<PathBuf> {
        let out = match &self.command {
            Command::Collect { target } => target.out(),
            Command::Report { out } => out,
            Command::Config { .. } => return None,
        };
        Some(
            out.out
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir)),
        )
    }
}

/// Load the config named by `--config`, or the default one.
pub(crate) fn load_app_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// `[YYYY-MM-DD HH:MM:SS]` in local time.
struct LocalTimestamp;

impl FormatTime for LocalTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "[{}]", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Initialize tracing based on CLI flags.
///
/// Events go to stdout and, for commands that work on a dataset, are
/// appended to the log file as well.
pub(crate) fn init_tracing(cli: &Cli, config: &AppConfig) -> Result<()> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

    let filter = match cli.verbose {
        0 => "watchshots=info",
        1 => "watchshots=debug",
        _ => "watchshots=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let log_path = cli.log_file.clone().or_else(|| {
        cli.output_dir(config)
            .map(|dir| dir.join(&config.defaults.log_file))
    });

    let log_file = match log_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .wrap_err_with(|| format!("creating log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .wrap_err_with(|| format!("opening log file {}", path.display()))?;
            Some(Mutex::new(file))
        }
        None => None,
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    match cli.log_format {
        LogFormat::Text => {
            layers.push(
                fmt::layer()
                    .with_timer(LocalTimestamp)
                    .with_level(false)
                    .with_target(false)
                    .with_writer(std::io::stdout)
                    .boxed(),
            );
            if let Some(file) = log_file {
                layers.push(
                    fmt::layer()
                        .with_timer(LocalTimestamp)
                        .with_level(false)
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(file)
                        .boxed(),
                );
            }
        }
        LogFormat::Json => {
            layers.push(fmt::layer().json().with_writer(std::io::stdout).boxed());
            if let Some(file) = log_file {
                layers.push(fmt::layer().json().with_ansi(false).with_writer(file).boxed());
            }
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    Ok(())
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let output_dir = cli.output_dir(&config);

    match cli.command {
        Command::Collect { target } => {
            let mut collect = CollectConfig::from(&config);
            if let Some(dir) = output_dir {
                collect.output_dir = dir;
            }
            cmd_collect(&config, &collect, target).await
        }
        Command::Report { .. } => {
            let dir = output_dir.unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));
            cmd_report(&dir)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_collect(config: &AppConfig, collect: &CollectConfig, target: CollectTarget) -> Result<()> {
    let sources = build_sources(config, collect, &target)?;
    let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();

    info!(
        sources = ?names,
        output_dir = %collect.output_dir.display(),
        "collecting screenshots"
    );

    let reporter = CliProgress::new();
    let summary = watchshots_core::collect(collect, &sources, &reporter).await?;
    let dataset = generate_dataset_info(&collect.output_dir)?;

    print_collect_summary(&summary, &collect.output_dir);
    print_dataset_summary(&dataset, &collect.output_dir);

    Ok(())
}

/// Instantiate the sources a collect target asks for.
fn build_sources(
    config: &AppConfig,
    collect: &CollectConfig,
    target: &CollectTarget,
) -> Result<Vec<Box<dyn CandidateSource>>> {
    let mut sources: Vec<Box<dyn CandidateSource>> = Vec::new();

    match target {
        CollectTarget::Reddit { .. } => {
            sources.push(Box::new(RedditSource::new(config.reddit.clone(), collect)?));
        }
        CollectTarget::File { path, .. } => {
            if !path.is_file() {
                return Err(eyre!("URL list '{}' does not exist", path.display()));
            }
            sources.push(Box::new(UrlListSource::new(path.clone())));
        }
        CollectTarget::Table { .. } => {
            if config.table.is_empty() {
                return Err(eyre!("no [table] entries in the config file"));
            }
            sources.push(Box::new(TableSource::new(config.table.clone())));
        }
        CollectTarget::Links { .. } => {
            sources.push(Box::new(LinkListSource::new(config.links.clone())));
        }
        CollectTarget::Blog { renderer, .. } => {
            let url = renderer
                .clone()
                .or_else(|| config.blog.renderer_url.clone())
                .ok_or_else(|| {
                    eyre!("no renderer configured: set blog.renderer_url or pass --renderer")
                })?;
            sources.push(blog_source(config, collect, &url)?);
        }
        CollectTarget::All { .. } => {
            sources.push(Box::new(RedditSource::new(config.reddit.clone(), collect)?));
            sources.push(Box::new(LinkListSource::new(config.links.clone())));
            if let Some(url) = &config.blog.renderer_url {
                sources.push(blog_source(config, collect, url)?);
            }
        }
    }

    Ok(sources)
}

fn blog_source(
    config: &AppConfig,
    collect: &CollectConfig,
    renderer_url: &str,
) -> Result<Box<dyn CandidateSource>> {
    let token = renderer_token(config);
    let renderer = BrowserlessRenderer::new(renderer_url, token.as_deref())?;
    Ok(Box::new(BlogSearchSource::new(
        renderer,
        config.blog.clone(),
        collect.source_delay,
    )))
}

fn cmd_report(output_dir: &Path) -> Result<()> {
    let dataset = generate_dataset_info(output_dir)?;
    print_dataset_summary(&dataset, output_dir);
    Ok(())
}

fn print_collect_summary(summary: &CollectSummary, output_dir: &Path) {
    println!();
    println!("  Collection finished");
    println!("  Run:        {}", summary.run_id);
    println!("  Downloaded: {}", summary.downloaded);
    println!("  Failed:     {}", summary.failed);
    println!("  Skipped:    {}", summary.skipped);
    if summary.malformed > 0 {
        println!("  Malformed:  {}", summary.malformed);
    }
    println!("  Output:     {}", output_dir.display());
    println!("  Time:       {:.1}s", summary.elapsed.as_secs_f64());
    println!();
}

fn print_dataset_summary(dataset: &DatasetInfo, output_dir: &Path) {
    println!("  Dataset: {} images in {}", dataset.total_images, output_dir.display());
    for (category, count) in &dataset.categories {
        println!("    {category:<40} {count}");
    }
    println!();
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn candidate_done(&self, url: &str, status: CandidateStatus, current: usize, total: usize) {
        let label = match status {
            CandidateStatus::Downloaded => "saved",
            CandidateStatus::Skipped => "exists",
            CandidateStatus::Failed(reason) => reason,
        };
        self.spinner
            .set_message(format!("[{current}/{total}] {label} {url}"));
    }

    fn done(&self, _summary: &CollectSummary) {
        self.spinner.finish_and_clear();
    }
}
