use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use refdb_sync::config::{ConfigLoader, ResolvedConfig};
use refdb_sync::error::SyncError;
use refdb_sync::output::{JsonOutput, OutputMode};
use refdb_sync::remote::HttpRemoteStore;
use refdb_sync::store::Store;
use refdb_sync::sync::{LogSink, SyncOptions, Syncer};

#[derive(Parser)]
#[command(name = "refdb-sync")]
#[command(about = "Synchronize a versioned reference database and switch the current version atomically")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    /// Local store root (overrides the configured root).
    #[arg(long, global = true)]
    root: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch the latest published version and make it current")]
    Update(UpdateArgs),
    #[command(about = "Show the locally published version and its completeness")]
    Status,
}

#[derive(Args)]
struct UpdateArgs {
    /// Re-sync even if the local dataset is already complete.
    #[arg(long)]
    force: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(sync) = report.downcast_ref::<SyncError>() {
            return ExitCode::from(map_exit_code(sync));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::TransportUnavailable(_)
        | SyncError::RemoteStatus { .. }
        | SyncError::FetchIncomplete { .. } => 3,
        SyncError::LockContention(_) => 4,
        SyncError::ConfigRead(_) | SyncError::ConfigParse(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;
    let store = build_store(cli.root.as_deref(), &config).into_diagnostic()?;

    match cli.command {
        Commands::Update(args) => run_update(args, store, config, output_mode),
        Commands::Status => run_status(store, config, output_mode),
    }
}

fn build_store(root_flag: Option<&str>, config: &ResolvedConfig) -> Result<Store, SyncError> {
    let root = root_flag
        .map(Utf8PathBuf::from)
        .or_else(|| config.root.clone());
    match root {
        Some(root) => Ok(Store::new_with_root(root)),
        None => Store::new(),
    }
}

fn run_update(
    args: UpdateArgs,
    store: Store,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let remote = HttpRemoteStore::new(&config.remote_url, config.timeout).into_diagnostic()?;
    let syncer = Syncer::new(remote, store, config);
    let options = SyncOptions { force: args.force };

    match output_mode {
        OutputMode::NonInteractive => {
            let outcome = syncer.sync(options, &JsonOutput).into_diagnostic()?;
            JsonOutput::print_sync(&outcome).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let outcome = syncer.sync(options, &LogSink).into_diagnostic()?;
            match outcome.action {
                refdb_sync::sync::SyncAction::Fresh => {
                    println!("dataset is current: {} ({})", outcome.version, outcome.path);
                }
                refdb_sync::sync::SyncAction::Updated => {
                    println!("published version {} at {}", outcome.version, outcome.path);
                }
            }
        }
    }
    Ok(())
}

fn run_status(store: Store, config: ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let remote = HttpRemoteStore::new(&config.remote_url, config.timeout).into_diagnostic()?;
    let syncer = Syncer::new(remote, store, config);
    let report = syncer.status().into_diagnostic()?;

    match output_mode {
        OutputMode::NonInteractive => {
            JsonOutput::print_status(&report).into_diagnostic()?;
        }
        OutputMode::Interactive => match &report.version {
            Some(version) if report.complete => {
                println!("current version: {version} (complete)");
            }
            Some(version) => {
                println!(
                    "current version: {version} (incomplete, missing: {})",
                    report.missing.join(", ")
                );
            }
            None => {
                println!("no version published yet under {}", report.root);
            }
        },
    }
    Ok(())
}
