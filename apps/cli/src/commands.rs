//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use noteharvest_core::{HarvestSummary, ProgressReporter};
use noteharvest_crawler::{BrowserSession, ReadabilityExtractor};
use noteharvest_shared::{AppConfig, HarvestConfig, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// noteharvest: keep a local, incremental copy of your notes.
#[derive(Parser)]
#[command(
    name = "noteharvest",
    version,
    about = "Harvest notes into raw, readable, Markdown, and rendered copies.",
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

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Harvest every note, reusing cached stage outputs.
    Harvest {
        /// Wipe `notes/`, rediscover the listing, and recompute every stage.
        #[arg(long)]
        clean: bool,

        /// Account whose notes are listed (defaults to the config value).
        #[arg(short, long)]
        username: Option<String>,

        /// Working directory holding `notes/` (defaults to the config value).
        #[arg(short, long)]
        work_dir: Option<PathBuf>,

        /// Run Chromium without a window; interactive login needs one.
        #[arg(long)]
        headless: bool,
    },

    /// Show the cached listing and per-stage record counts.
    Status {
        /// Working directory holding `notes/` (defaults to the config value).
        #[arg(short, long)]
        work_dir: Option<PathBuf>,
    },

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

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "noteharvest=info",
        1 => "noteharvest=debug",
        _ => "noteharvest=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
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
        Command::Harvest {
            clean,
            username,
            work_dir,
            headless,
        } => cmd_harvest(clean, username, work_dir, headless).await,
        Command::Status { work_dir } => cmd_status(work_dir).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_harvest(
    clean: bool,
    username: Option<String>,
    work_dir: Option<PathBuf>,
    headless: bool,
) -> Result<()> {
    let config = load_config()?;

    let mut harvest_config = HarvestConfig::from(&config);
    harvest_config.force_recompute = clean;
    if let Some(username) = username {
        harvest_config.username = username;
    }
    if let Some(work_dir) = work_dir {
        harvest_config.work_dir = work_dir;
    }
    if headless {
        harvest_config.browser.headless = true;
    }
    harvest_config.validate()?;

    info!(
        user = %harvest_config.username,
        work_dir = %harvest_config.work_dir.display(),
        clean,
        "starting harvest"
    );

    let session = BrowserSession::new(
        harvest_config.browser.clone(),
        harvest_config.source.clone(),
    );
    let reporter = CliProgress::new();

    let result = noteharvest_core::harvest(
        &harvest_config,
        &session,
        &ReadabilityExtractor,
        &reporter,
    )
    .await;
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            reporter.spinner.abandon();
            return Err(e.into());
        }
    };

    println!();
    println!("  All done!");
    println!("  Notes:   {}", summary.documents);
    println!(
        "  Listing: {}",
        if summary.listing_cached { "cached" } else { "discovered" }
    );
    println!("  Cached:  {} stage outputs reused", summary.cache_hits);
    println!("  Fresh:   {} stage outputs computed", summary.cache_misses);
    println!(
        "  Time:    {:.1}s",
        summary.elapsed.as_secs_f64()
    );
    println!();

    Ok(())
}

async fn cmd_status(work_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let work_dir = work_dir.unwrap_or_else(|| PathBuf::from(&config.defaults.work_dir));

    let status = noteharvest_core::workspace_status(&work_dir).await?;

    println!();
    println!("  Workspace: {}", work_dir.join("notes").display());
    match (status.listed, status.discovered_at) {
        (Some(count), Some(at)) => println!("  Listing:   {count} notes (discovered {at})"),
        (Some(count), None) => println!("  Listing:   {count} notes"),
        _ => println!("  Listing:   not discovered yet"),
    }
    for (stage, count) in &status.stages {
        println!("  {:<10} {count}", format!("{stage}:"));
    }
    println!();

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

    fn note_started(&self, id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Harvesting [{current}/{total}] note {id}"));
    }

    fn done(&self, _summary: &HarvestSummary) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn headless_help_warns_about_login() {
        let mut cmd = Cli::command();
        let harvest = cmd
            .find_subcommand_mut("harvest")
            .expect("harvest subcommand");
        let help = harvest.render_help().to_string();
        assert!(help.contains("interactive login needs one"), "{help}");
    }

    #[test]
    fn headless_flag_parses() {
        let cli = Cli::try_parse_from(["noteharvest", "harvest", "--headless"]).unwrap();
        assert!(matches!(cli.command, Command::Harvest { headless: true, .. }));
    }
}
