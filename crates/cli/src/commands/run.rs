//! `run` command implementation.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use config_loader::{ConfigLoader, JsonFileStore};
use contracts::{CommandSender, DetectionResult};
use dispatcher::{Dispatcher, HttpSender};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::stats::RelayStats;

/// Line counts from one input stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputCounts {
    pub batches: u64,
    pub invalid_lines: u64,
}

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let settings_dir = args
        .settings_dir
        .clone()
        .or_else(|| blueprint.settings_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    info!(
        endpoint = %blueprint.endpoint,
        fields = blueprint.field_mapping.len(),
        formatters = blueprint.field_formatters.len(),
        settings_dir = %settings_dir.display(),
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let store = Arc::new(
        JsonFileStore::open(&settings_dir)
            .with_context(|| format!("Failed to open settings in {}", settings_dir.display()))?,
    );

    let timeout = blueprint.timeout_secs.map(Duration::from_secs);
    let sender = HttpSender::with_timeout("http", timeout)
        .map_err(|e| CliError::setup(e.to_string()))?;

    let dispatcher = Dispatcher::from_blueprint(sender, &blueprint);
    dispatcher.bind(store.as_ref());
    if let Some(ref endpoint) = args.endpoint {
        info!(endpoint = %endpoint, "Overriding endpoint from CLI");
        dispatcher.set_endpoint(endpoint.clone());
    }
    dispatcher.start();

    let reload = spawn_reload_task(Arc::clone(&store), args.reload_interval);
    let started = Instant::now();
    let mut counts = InputCounts::default();

    tokio::select! {
        result = relay_input(&dispatcher, &args.input) => {
            counts = result?;
            info!(batches = counts.batches, "Input exhausted");
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping relay...");
        }
    }

    dispatcher.stop();
    if let Some(handle) = reload {
        handle.abort();
    }

    let stats = RelayStats {
        batches: counts.batches,
        invalid_lines: counts.invalid_lines,
        duration: started.elapsed(),
        dispatch: dispatcher.metrics(),
        deliveries: dispatcher.delivery_summary(),
    };
    stats.print_summary();

    info!("Field Relay finished");
    Ok(())
}

/// Open the input source and relay every batch in it
async fn relay_input<S: CommandSender + Sync>(
    dispatcher: &Dispatcher<S>,
    input: &str,
) -> Result<InputCounts> {
    if input == "-" {
        let reader = BufReader::new(tokio::io::stdin());
        relay_lines(dispatcher, reader, "stdin").await
    } else {
        let file = tokio::fs::File::open(input)
            .await
            .map_err(|e| CliError::input(input, e))?;
        relay_lines(dispatcher, BufReader::new(file), input).await
    }
}

/// Relay one batch per JSON line
///
/// Blank lines are ignored. Invalid lines are logged and skipped.
#[instrument(name = "relay_lines", skip(dispatcher, reader))]
pub async fn relay_lines<S, R>(
    dispatcher: &Dispatcher<S>,
    reader: R,
    source_name: &str,
) -> Result<InputCounts>
where
    S: CommandSender + Sync,
    R: AsyncBufRead + Unpin,
{
    let mut counts = InputCounts::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| CliError::input(source_name, e))?
    {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Vec<DetectionResult>>(&line) {
            Ok(batch) => {
                debug!(line = line_no, results = batch.len(), "Batch received");
                dispatcher.update(&batch).await;
                counts.batches += 1;
            }
            Err(e) => {
                let e = CliError::Batch {
                    line: line_no,
                    source: e,
                };
                error!(error = %e, "Skipping input line");
                counts.invalid_lines += 1;
            }
        }
    }

    Ok(counts)
}

/// Poll the settings directory so edits reach subscribers
fn spawn_reload_task(store: Arc<JsonFileStore>, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match store.reload() {
                Ok(0) => {}
                Ok(changed) => info!(changed, "Settings reloaded"),
                Err(e) => warn!(error = %e, "Failed to reload settings"),
            }
        }
    }))
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
