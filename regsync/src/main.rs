//! `regsync` command-line entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

use regsync::cancellation::CancellationToken;
use regsync::config::MigrationConfig;
use regsync::copy::CraneCopier;
use regsync::errors::RegsyncError;
use regsync::events::LoggingCopyObserver;
use regsync::executor::{write_remaining, write_report, MigrationExecutor};
use regsync::inventory::{build_http_client, ArtifactoryInventory, NexusInventory};
use regsync::observability::{init_subscriber, ErrorLogHealth, ErrorLogLayer, LogFormat, Verbosity};
use regsync::reconcile::{MigrationWorkList, Reconciler};

#[derive(Parser)]
#[command(
    name = "regsync",
    version,
    about = "Reconcile a source registry against a destination and copy what is missing"
)]
struct Cli {
    #[arg(short, long, global = true)]
    /// Debug-level output
    verbose: bool,
    #[arg(short, long, global = true)]
    /// Only report errors
    quiet: bool,
    #[arg(long = "log-json", global = true, default_value_t = false)]
    /// Emit console logs as JSON
    log_json: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "List both registries and write the work list")]
    Reconcile {
        #[arg(long = "work-list")]
        /// Where to write the work list (defaults to WORK_LIST)
        work_list: Option<PathBuf>,
    },
    #[command(about = "Copy every artifact named in an existing work list")]
    Migrate {
        #[arg(long = "work-list")]
        /// Work list to read (defaults to WORK_LIST)
        work_list: Option<PathBuf>,
        #[command(flatten)]
        tuning: Tuning,
        #[command(flatten)]
        outputs: Outputs,
    },
    #[command(about = "Reconcile, then migrate (the default)")]
    Run {
        #[arg(long = "work-list")]
        /// Where to write the work list (defaults to WORK_LIST)
        work_list: Option<PathBuf>,
        #[command(flatten)]
        tuning: Tuning,
        #[command(flatten)]
        outputs: Outputs,
    },
}

#[derive(Args, Default)]
struct Tuning {
    #[arg(long)]
    /// Parallel copies (overrides MAX_WORKER)
    concurrency: Option<usize>,
    #[arg(long = "max-retries")]
    /// Attempts per artifact (overrides MAX_RETRY)
    max_retries: Option<u32>,
    #[arg(long = "retry-delay")]
    /// Seconds between attempts (overrides RETRY_DELAY)
    retry_delay: Option<f64>,
}

#[derive(Args, Default)]
struct Outputs {
    #[arg(long = "remaining-list")]
    /// Where to write unfinished artifacts (overrides REMAINING_LIST)
    remaining_list: Option<PathBuf>,
    #[arg(long)]
    /// Write a JSON run report here (overrides REPORT_PATH)
    report: Option<PathBuf>,
}

impl Outputs {
    fn apply(self, mut config: MigrationConfig) -> MigrationConfig {
        if let Some(path) = self.remaining_list {
            config = config.with_remaining_list_path(path);
        }
        if let Some(path) = self.report {
            config = config.with_report_path(path);
        }
        config
    }
}

impl Tuning {
    fn apply(&self, mut config: MigrationConfig) -> Result<MigrationConfig> {
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(attempts) = self.max_retries {
            config = config.with_max_attempts(attempts);
        }
        if let Some(seconds) = self.retry_delay {
            let delay = Duration::try_from_secs_f64(seconds)
                .with_context(|| format!("invalid --retry-delay {seconds}"))?;
            config = config.with_retry_delay(delay);
        }
        Ok(config)
    }
}

/// How a run ended when no fatal error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Clean,
    ArtifactsFailed,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    let format = if cli.log_json { LogFormat::Json } else { LogFormat::Pretty };

    let config = MigrationConfig::from_env();
    let error_log = config
        .as_ref()
        .ok()
        .map(|config| ErrorLogLayer::open(&config.error_log_path));
    let (layer, open_error) = match error_log {
        Some(Ok(layer)) => (Some(layer), None),
        Some(Err(err)) => (None, Some(err)),
        None => (None, None),
    };
    let health = layer.as_ref().map(ErrorLogLayer::health);
    if let Err(err) = init_subscriber(verbosity, format, layer) {
        eprintln!("regsync: failed to initialize logging: {err}");
    }

    let result = match (config, open_error) {
        (Err(err), _) => Err(err.into()),
        (Ok(_), Some(err)) => Err(anyhow::Error::new(err).context("failed to open error log")),
        (Ok(config), None) => {
            let error_log_path = config.error_log_path.clone();
            execute(cli.command, config).await.and_then(|status| {
                check_error_log(health.as_ref(), &error_log_path)?;
                Ok(status)
            })
        }
    };

    match result {
        Ok(RunStatus::Clean) => ExitCode::SUCCESS,
        Ok(RunStatus::ArtifactsFailed) => ExitCode::from(1),
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn check_error_log(health: Option<&ErrorLogHealth>, path: &Path) -> Result<()> {
    if let Some(health) = health {
        health
            .check()
            .map_err(|err| RegsyncError::persistence(path, err))
            .context("error log lost a write")?;
    }
    Ok(())
}

async fn execute(command: Option<Command>, config: MigrationConfig) -> Result<RunStatus> {
    match command.unwrap_or(Command::Run {
        work_list: None,
        tuning: Tuning::default(),
        outputs: Outputs::default(),
    }) {
        Command::Reconcile { work_list } => {
            let config = override_work_list(config, work_list);
            reconcile(&config).await?;
            Ok(RunStatus::Clean)
        }
        Command::Migrate {
            work_list,
            tuning,
            outputs,
        } => {
            let config = outputs.apply(tuning.apply(override_work_list(config, work_list))?);
            let work_list = MigrationWorkList::load(&config.work_list_path)
                .context("failed to load work list")?;
            migrate(&config, &work_list).await
        }
        Command::Run {
            work_list,
            tuning,
            outputs,
        } => {
            let config = outputs.apply(tuning.apply(override_work_list(config, work_list))?);
            let work_list = reconcile(&config).await?;
            if work_list.is_empty() {
                info!("Nothing to migrate");
            }
            migrate(&config, &work_list).await
        }
    }
}

fn override_work_list(config: MigrationConfig, path: Option<PathBuf>) -> MigrationConfig {
    match path {
        Some(path) => config.with_work_list_path(path),
        None => config,
    }
}

async fn reconcile(config: &MigrationConfig) -> Result<MigrationWorkList> {
    let client = build_http_client(&config.http)?;
    let source = NexusInventory::from_config(client.clone(), config);
    let destination = ArtifactoryInventory::from_config(client, config);

    let work_list = Reconciler::new(&config.work_list_path)
        .reconcile_inventories(&source, &destination)
        .await
        .context("reconciliation failed")?;
    Ok(work_list)
}

async fn migrate(config: &MigrationConfig, work_list: &MigrationWorkList) -> Result<RunStatus> {
    let token = Arc::new(CancellationToken::new());
    let interrupt = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, letting in-flight copies finish");
                token.cancel("interrupted");
            }
        })
    };

    let primitive = Arc::new(
        CraneCopier::new()
            .with_binary(&config.crane_bin)
            .with_insecure(config.http.insecure_tls),
    );
    let executor = MigrationExecutor::from_config(config, primitive)
        .with_cancel_token(token)
        .with_observer(Arc::new(LoggingCopyObserver));

    let report = executor.run(work_list).await;
    interrupt.abort();

    write_remaining(&report, &config.remaining_list_path).context("failed to write remaining list")?;
    if let Some(path) = &config.report_path {
        write_report(&report, path).context("failed to write report")?;
    }

    let summary = report.summary();
    println!("{summary}");
    Ok(if summary.is_clean() {
        RunStatus::Clean
    } else {
        RunStatus::ArtifactsFailed
    })
}
