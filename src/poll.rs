//! Poll a remote agent's `/monitor` endpoint and print the readings.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::config::PollArgs;
use crate::controller::{IoRate, RateTracker};
use crate::error::Result;
use crate::model::MetricSnapshot;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const MIB: f64 = 1024.0 * 1024.0;

/// Fetch one snapshot.
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<MetricSnapshot> {
    let snapshot = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<MetricSnapshot>()
        .await?;
    Ok(snapshot)
}

/// Poll until Ctrl-C.
pub async fn run(args: &PollArgs) -> Result<()> {
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let url = args.url();
    let rates = RateTracker::new();
    let mut ticker = tokio::time::interval(Duration::from_secs(args.poll_seconds.max(1)));

    println!("[poll] monitoring {url}");
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        let started = Instant::now();
        match fetch(&client, &url).await {
            Ok(snapshot) => {
                let now = Instant::now();
                // a restarted agent reports smaller totals; the tracker turns that into 0
                let rate = rates
                    .observe("remote", snapshot.io_read_bytes, snapshot.io_write_bytes, now)
                    .unwrap_or_default();
                println!("{}", render(&snapshot, now - started, rate));
            }
            Err(e) => {
                warn!(error = %e, url = %url, "poll failed");
                println!(
                    "request failed after {:.3}s: {e}",
                    started.elapsed().as_secs_f64()
                );
            }
        }
    }
    Ok(())
}

/// Human-readable block for one reading.
pub fn render(snapshot: &MetricSnapshot, latency: Duration, rate: IoRate) -> String {
    let ram = match snapshot.memory_free_gb {
        Some(free) => format!("{:?}% (free: {free:?}GB)", snapshot.memory_percent),
        None => format!("{:?}%", snapshot.memory_percent),
    };
    [
        "--------------------------------".to_string(),
        format!("latency: {:.3}s", latency.as_secs_f64()),
        format!("CPU    : {:?}%", snapshot.cpu_percent),
        format!("RAM    : {ram}"),
        format!("DISK   : {:?}%", snapshot.disk_percent),
        format!("IO     : {:?}%", snapshot.io_percent),
        format!("I/O R  : {:.2} MB/s", rate.read_per_sec / MIB),
        format!("I/O W  : {:.2} MB/s", rate.write_per_sec / MIB),
    ]
    .join("\n")
}
