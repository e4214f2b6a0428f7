//! gatekeeper - git pre-commit hook quality gates.
//!
//! Reads `.gatekeeper/gates.yaml`, executes validation gates inside Docker
//! containers in parallel, and blocks commits that fail any blocking gate.
//! Structured JSON output gives AI agents precise file/line locations and
//! fix hints for fast automated remediation.

use clap::{Parser, Subcommand};
use gatekeeper_cli::commands;
use gatekeeper_core::PipelineError;
use tracing_subscriber::EnvFilter;

/// Git pre-commit hook gatekeeper.
#[derive(Parser, Debug)]
#[command(name = "gatekeeper")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Output results as JSON to stdout
    #[arg(long, global = true)]
    json: bool,

    /// Include raw tool stdout/stderr in output
    #[arg(long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Cancel remaining gates on first blocking failure
    #[arg(long, global = true)]
    fail_fast: bool,

    /// Skip specific gates by name
    #[arg(long, global = true)]
    skip: Vec<String>,

    /// Skip all LLM gates
    #[arg(long, global = true)]
    skip_llm: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize gatekeeper in the current project
    Init,

    /// Remove the git pre-commit hook
    Teardown,

    /// Run all gates and block commit on failure
    Run,

    /// Run all gates but always exit 0 (informational only)
    #[command(name = "dry-run")]
    DryRun,

    /// Stop and remove all gatekeeper containers
    Cleanup,

    /// Print the version and build information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let flags = commands::Flags {
        json: cli.json,
        verbose: cli.verbose,
        no_color: cli.no_color,
        fail_fast: cli.fail_fast,
        skip: cli.skip.clone(),
        skip_llm: cli.skip_llm,
    };

    let result = match cli.command {
        Commands::Init => commands::init::run().await,
        Commands::Teardown => commands::teardown::run().await,
        Commands::Run => commands::pipeline::run(&flags, false).await,
        Commands::DryRun => commands::pipeline::run(&flags, true).await,
        Commands::Cleanup => commands::cleanup::run().await,
        Commands::Version => commands::version::run(),
    };

    if let Err(err) = result {
        // A failed gate verdict is not a crash: the formatter output is the
        // user feedback, so exit non-zero without an extra error line.
        if let Some(PipelineError::GatesFailed) = err.downcast_ref::<PipelineError>() {
            std::process::exit(1);
        }

        tracing::error!(error = %err, "command failed");
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so JSON on stdout stays machine-readable. `--verbose`
/// lowers the default level to debug; `RUST_LOG` overrides everything.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
