use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::Targets, fmt, prelude::*, EnvFilter};

use hostpulse::collectors;
use hostpulse::config::{AgentArgs, Cli, Command};
use hostpulse::controller::Sampler;
use hostpulse::hub::LogHub;
use hostpulse::logging::HubLayer;
use hostpulse::server::{self, AppState};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// stdout + live-tail hub (+ optional rolling file). The returned guard must
/// live until exit so the file writer flushes.
fn init_tracing(
    hub: Arc<LogHub>,
    log_file: Option<&Path>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path.file_name().context("--log-file needs a file name")?;
            let appender = tracing_appender::rolling::daily(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(env_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let hub_filter = Targets::new().with_target("hostpulse", Level::INFO);
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(env_filter()))
        .with(HubLayer::new(hub).with_filter(hub_filter))
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(guard)
}

async fn run_agent(args: AgentArgs) -> anyhow::Result<()> {
    let hub = Arc::new(LogHub::new(args.log_capacity));
    let _guard = init_tracing(Arc::clone(&hub), args.log_file.as_deref())?;

    let source = collectors::detect(args.source, args.cpu_window());
    let sampler = Arc::new(Sampler::new(source, args.sampler_settings()));
    let state = AppState::new(sampler, hub, args.server_settings());

    tokio::select! {
        result = server::run(&args.host, args.port, state) => {
            result.with_context(|| format!("server on {}:{} stopped", args.host, args.port))?;
        }
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Poll(args)) => {
            tracing_subscriber::fmt().with_env_filter(env_filter()).init();
            hostpulse::poll::run(&args).await?;
        }
        None => run_agent(cli.agent).await?,
    }
    Ok(())
}
