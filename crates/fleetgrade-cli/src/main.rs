//! Fleetgrade - repository fleet grading CLI
//!
//! The `fleetgrade` command grades an origin repository and its forks
//! against a configured rule set and writes a comparable CSV report.
//!
//! ## Commands
//!
//! - `grade`: run the grading pipeline and write the report
//! - `sync`: discover forks and clone-or-fetch the fleet
//! - `report`: merge an existing computed report with a template

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use fleetgrade_core::{init_tracing, EvalConfig, RepoSet};
use fleetgrade_engine::{
    discover_and_sync, report, GithubForkSource, GradingOptions, GradingPipeline, ProcessRunner,
    ReportTable,
};

#[derive(Parser)]
#[command(name = "fleetgrade")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Grade a fleet of repository forks against configured rules", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade every repository in the working root and write the report
    Grade {
        /// Path to the configuration document
        #[arg(short, long, default_value = "fleetgrade.json")]
        config: PathBuf,

        /// Root directory holding one clone per repository
        #[arg(short, long, default_value = ".")]
        workdir: PathBuf,

        /// Discover forks and sync the fleet before grading
        #[arg(long)]
        sync: bool,

        /// API token for fork discovery
        #[arg(long, env = "FLEETGRADE_TOKEN")]
        token: Option<String>,

        /// Hard-reset each work tree before grading (destructive)
        #[arg(long)]
        reset: bool,

        /// Skip task stages (implies skipping prepare commands)
        #[arg(long)]
        skip_tasks: bool,

        /// Skip rule evaluation (implies --skip-tasks)
        #[arg(long)]
        skip_checks: bool,

        /// Suppress per-command log lines
        #[arg(short, long)]
        quiet: bool,

        /// Override the report destination from the configuration
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the merge template from the configuration
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Discover forks and clone-or-fetch them into the working root
    Sync {
        /// Path to the configuration document
        #[arg(short, long, default_value = "fleetgrade.json")]
        config: PathBuf,

        /// Root directory to hold one clone per repository
        #[arg(short, long, default_value = ".")]
        workdir: PathBuf,

        /// API token for fork discovery
        #[arg(long, env = "FLEETGRADE_TOKEN")]
        token: Option<String>,

        /// Suppress per-command log lines
        #[arg(short, long)]
        quiet: bool,
    },

    /// Merge an existing computed report with a template, without grading
    Report {
        /// Computed report CSV
        #[arg(long)]
        computed: PathBuf,

        /// Template CSV supplying extra columns and rows
        #[arg(long)]
        template: PathBuf,

        /// Destination for the merged report
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Grade {
            config,
            workdir,
            sync,
            token,
            reset,
            skip_tasks,
            skip_checks,
            quiet,
            output,
            template,
        } => {
            let options = GradingOptions {
                reset,
                skip_tasks,
                skip_checks,
                quiet,
            };
            cmd_grade(&config, &workdir, sync, token, options, output, template).await
        }
        Commands::Sync {
            config,
            workdir,
            token,
            quiet,
        } => {
            let config = load_config(&config)?;
            let set = sync_fleet(&config, &workdir, token, quiet).await?;
            println!("synchronized {} repositories under {}", set.len(), workdir.display());
            Ok(())
        }
        Commands::Report {
            computed,
            template,
            output,
        } => cmd_report(&computed, &template, &output),
    }
}

fn load_config(path: &Path) -> Result<EvalConfig> {
    EvalConfig::load(path).with_context(|| format!("loading configuration {}", path.display()))
}

#[allow(clippy::too_many_arguments)]
async fn cmd_grade(
    config_path: &Path,
    workdir: &Path,
    sync: bool,
    token: Option<String>,
    options: GradingOptions,
    output: Option<PathBuf>,
    template: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(output) = output {
        config.output.output = output;
    }
    if let Some(template) = template {
        config.output.template = Some(template);
    }

    let repos = if sync {
        sync_fleet(&config, workdir, token, options.quiet).await?
    } else {
        RepoSet::discover_local(workdir)
            .with_context(|| format!("scanning {}", workdir.display()))?
    };
    anyhow::ensure!(
        !repos.is_empty(),
        "no repositories found under {}",
        workdir.display()
    );

    let report = GradingPipeline::run(&config, &repos, &options).await?;

    println!(
        "graded {} repositories -> {}",
        report.repos,
        config.output.output.display()
    );
    println!(
        "run {} (rules {})",
        report.run_id,
        &report.rules_fingerprint[..12]
    );
    Ok(())
}

async fn sync_fleet(
    config: &EvalConfig,
    workdir: &Path,
    token: Option<String>,
    quiet: bool,
) -> Result<RepoSet> {
    let origin = config
        .origin
        .as_ref()
        .context("configuration has no origin; cannot discover forks")?;
    info!(owner = %origin.owner, repo = %origin.repo, "discovering fleet");

    let source = GithubForkSource::new(origin, token);
    let runner = ProcessRunner::new(quiet);
    let set = discover_and_sync(&source, &runner, workdir).await?;
    Ok(set)
}

fn cmd_report(computed: &Path, template: &Path, output: &Path) -> Result<()> {
    let computed_table = ReportTable::load(computed)?;
    let template_table = ReportTable::load(template)?;
    let merged = report::merge(computed_table, Some(template_table));
    merged.write(output)?;
    println!("merged report -> {}", output.display());
    Ok(())
}
