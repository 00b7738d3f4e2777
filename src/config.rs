//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::collectors::SourceKind;
use crate::controller::SamplerSettings;
use crate::server::ServerSettings;

#[derive(Parser, Debug)]
#[command(
    name = "hostpulse",
    version,
    about = "Host telemetry agent: /monitor snapshots and a live /logs tail",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Agent options (used when no subcommand is given).
    #[command(flatten)]
    pub agent: AgentArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll a remote agent's /monitor endpoint and print the readings.
    Poll(PollArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AgentArgs {
    /// Address to bind.
    #[arg(long, env = "HOSTPULSE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind.
    #[arg(long, env = "HOSTPULSE_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Counter source.
    #[arg(long, env = "HOSTPULSE_SOURCE", value_enum, default_value_t = SourceKind::Auto)]
    pub source: SourceKind,

    /// Path whose volume is reported as disk usage.
    #[arg(long, env = "HOSTPULSE_DISK_PATH", default_value = "/")]
    pub disk_path: PathBuf,

    /// Throughput (MiB/s) reported as 100% I/O activity.
    #[arg(long, env = "HOSTPULSE_IO_CEILING_MIB", default_value_t = 100.0)]
    pub io_ceiling_mib: f64,

    /// CPU measurement window in milliseconds.
    #[arg(long, env = "HOSTPULSE_CPU_WINDOW_MS", default_value_t = 100)]
    pub cpu_window_ms: u64,

    /// Log lines kept for replay.
    #[arg(long, env = "HOSTPULSE_LOG_CAPACITY", default_value_t = crate::hub::DEFAULT_CAPACITY)]
    pub log_capacity: usize,

    /// Lines replayed to a new /logs viewer.
    #[arg(long, env = "HOSTPULSE_REPLAY_LINES", default_value_t = 60)]
    pub replay_lines: usize,

    /// Seconds a /logs viewer waits for new lines before re-checking.
    #[arg(long, env = "HOSTPULSE_STREAM_WAIT_SECS", default_value_t = 10)]
    pub stream_wait_secs: u64,

    /// Also write logs to a daily-rotated file at this path.
    #[arg(long, env = "HOSTPULSE_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl AgentArgs {
    pub fn cpu_window(&self) -> Duration {
        Duration::from_millis(self.cpu_window_ms)
    }

    pub fn sampler_settings(&self) -> SamplerSettings {
        SamplerSettings {
            disk_path: self.disk_path.clone(),
            io_ceiling_bytes: self.io_ceiling_mib * 1024.0 * 1024.0,
        }
    }

    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            replay_lines: self.replay_lines,
            stream_wait: Duration::from_secs(self.stream_wait_secs.max(1)),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PollArgs {
    /// Agent address.
    #[arg(long, env = "HOSTPULSE_POLL_IP", default_value = "127.0.0.1")]
    pub ip: String,

    /// Agent port.
    #[arg(long, default_value_t = 5000)]
    pub port: u16,

    /// Seconds between requests.
    #[arg(long, default_value_t = 2)]
    pub poll_seconds: u64,
}

impl PollArgs {
    pub fn url(&self) -> String {
        format!("http://{}:{}/monitor", self.ip, self.port)
    }
}
