use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber;

use ptx_common::{MatrixCell, SearchType, LIMITS};
use ptx_matrix::invoker::LoadRunInvoker;
use ptx_matrix::{run_pipeline, OrchestratorConfig};

/// PTX Orchestrator - drives the benchmark matrix
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML); defaults apply when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Corpus type passed to the generator
    #[arg(long, default_value = "multi")]
    corpus_type: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Print the planned matrix without running anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.debug)?;

    info!("Starting PTX benchmark-matrix orchestrator");

    let config = match &args.config {
        Some(path) => {
            info!("Config file: {}", path);
            OrchestratorConfig::load_from_file(path)?
        }
        None => OrchestratorConfig::default(),
    };

    if args.dry_run {
        print_plan(&config)?;
        return Ok(());
    }

    let code = run(&args, &config).await;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Drive one full run and map its outcome to a process exit code.
///
/// The pipeline future is dropped before this function returns on every
/// path, including interrupt: dropping it kills the in-flight child
/// (`kill_on_drop`) and releases the run lock, while completed cells'
/// artifacts stay on disk untouched.
async fn run(args: &Args, config: &OrchestratorConfig) -> i32 {
    let invoker = LoadRunInvoker::new(
        config.tools.load_tool.clone(),
        config.paths.configs_dir.clone(),
        config.pacing.cell_settle,
    );

    let pipeline = run_pipeline(config, &args.corpus_type, &invoker);
    tokio::pin!(pipeline);

    tokio::select! {
        result = &mut pipeline => match result {
            Ok(outcome) => {
                let code = outcome.exit_code();
                if code != 0 {
                    warn!("Run complete but aggregation failed (exit code {})", code);
                } else {
                    info!("Run complete");
                }
                code
            }
            Err(e) => {
                error!("Run aborted before matrix start: {}", e);
                2
            }
        },
        _ = shutdown_signal() => {
            warn!("Interrupted - stopping current load run, keeping completed artifacts");
            130
        }
    }
}

/// Narrate the matrix a run would execute, without touching anything.
fn print_plan(config: &OrchestratorConfig) -> Result<()> {
    let profile = config.run_profile()?;
    println!(
        "Plan: {} users, spawn rate {}, {}s per cell, rf={}",
        profile.user_count,
        profile.spawn_rate,
        profile.run_duration.as_secs(),
        profile.rf_value
    );
    for limit in LIMITS {
        for search_type in SearchType::ALL {
            let cell = MatrixCell::new(limit, search_type);
            println!(
                "  {} -> {}/{}_report.html (target: {})",
                cell,
                config.reports_dir(limit).display(),
                search_type.artifact_prefix(),
                config.target_config_path(search_type).display()
            );
        }
    }
    println!("Combined report via: {}", config.tools.aggregator);
    Ok(())
}

fn initialize_logging(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to create SIGTERM handler");
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .expect("Failed to create SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT signal");
            }
        }
    }

    #[cfg(windows)]
    {
        let _ = signal::ctrl_c().await;
        info!("Received Ctrl+C signal");
    }
}
