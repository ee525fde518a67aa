//! Game replay worker
//!
//! Replays every game in the given logs against one engine process and
//! appends the per-move rows to a CSV file.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};

use replay_worker::batch::{expand_inputs, run_batch};
use replay_worker::config::ReplayConfig;
use replay_worker::EngineSession;

#[derive(Parser, Debug)]
#[command(name = "replay-worker", version, about = "Replay recorded games against a UCI engine")]
struct Cli {
    /// Game-log files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Engine executable (overrides ENGINE_PATH)
    #[arg(long)]
    engine: Option<String>,

    /// CSV output file (overrides OUTPUT_PATH)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Search depth (overrides SEARCH_DEPTH)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    depth: Option<u32>,
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local runs
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = ReplayConfig::load()?;
    if let Some(engine) = cli.engine {
        config.engine_path = engine;
    }
    if let Some(output) = cli.output {
        config.output_path = output;
    }
    if let Some(depth) = cli.depth {
        config.engine.search_depth = depth;
    }
    info!(
        engine = %config.engine_path,
        depth = config.engine.search_depth,
        output = %config.output_path.display(),
        mate_policy = %config.replay.mate_policy,
        "Replay config loaded"
    );

    let files = expand_inputs(&cli.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No input files matched");
    }

    let mut engine = EngineSession::new(config.engine.clone());
    if let Err(e) = engine.start(&config.engine_path).await {
        error!(error = %e, "Engine unavailable");
        return Err(e.into());
    }

    let outcome = tokio::select! {
        result = run_batch(&mut engine, &files, &config.output_path, &config.replay) => Some(result),
        _ = shutdown_signal() => None,
    };

    engine.stop().await;

    let totals = match outcome {
        Some(result) => result?,
        None => {
            warn!("Interrupted, engine stopped");
            anyhow::bail!("Interrupted");
        }
    };

    info!(
        files = totals.files,
        games = totals.games,
        rows = totals.rows,
        rejected_moves = totals.rejected_moves,
        "Batch complete"
    );

    if totals.games == 0 {
        anyhow::bail!("No games found in {} input file(s)", files.len());
    }

    println!("{}", serde_json::to_string_pretty(&totals)?);
    Ok(())
}
