#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use axum::body::{Body, BodyDataStream};
use axum::http::{Method, Request};
use axum::Router;
use futures_util::StreamExt;

use hostpulse::collectors::CounterSource;
use hostpulse::controller::{Sampler, SamplerSettings};
use hostpulse::hub::LogHub;
use hostpulse::model::{CapacityTotals, DiskIo, IoTotals, MemoryTotals};
use hostpulse::server::{self, AppState, ServerSettings};
use hostpulse::{Error, Result};

/// Every read fails.
pub struct Unavailable;

impl CounterSource for Unavailable {
    fn name(&self) -> &'static str {
        "unavailable"
    }
    fn cpu_percent(&self) -> Result<f64> {
        Err(Error::Unavailable("cpu"))
    }
    fn memory(&self) -> Result<MemoryTotals> {
        Err(Error::Unavailable("memory"))
    }
    fn disk_io(&self) -> Result<DiskIo> {
        Err(Error::Unavailable("disk i/o"))
    }
    fn capacity(&self, _path: &Path) -> Result<CapacityTotals> {
        Err(Error::Unavailable("disk capacity"))
    }
}

/// Healthy source with a short measurement window.
pub struct Steady {
    pub window: Duration,
    written: AtomicU64,
}

impl Steady {
    pub fn new(window: Duration) -> Box<Self> {
        Box::new(Self {
            window,
            written: AtomicU64::new(0),
        })
    }
}

impl CounterSource for Steady {
    fn name(&self) -> &'static str {
        "steady"
    }
    fn cpu_percent(&self) -> Result<f64> {
        thread::sleep(self.window);
        Ok(25.0)
    }
    fn memory(&self) -> Result<MemoryTotals> {
        Ok(MemoryTotals {
            total_bytes: 8 << 30,
            available_bytes: 2 << 30,
        })
    }
    fn disk_io(&self) -> Result<DiskIo> {
        let written = self.written.fetch_add(1 << 20, Ordering::SeqCst) + (1 << 20);
        Ok(DiskIo::Aggregate(IoTotals {
            read_bytes: 0,
            write_bytes: written,
        }))
    }
    fn capacity(&self, _path: &Path) -> Result<CapacityTotals> {
        Ok(CapacityTotals {
            total_bytes: 100,
            available_bytes: 60,
        })
    }
}

pub fn app(source: Box<dyn CounterSource>, hub: Arc<LogHub>) -> Router {
    let sampler = Arc::new(Sampler::new(source, SamplerSettings::default()));
    let settings = ServerSettings {
        replay_lines: 60,
        stream_wait: Duration::from_millis(200),
    };
    server::router(AppState::new(sampler, hub, settings))
}

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(body: Body) -> serde_json::Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read SSE chunks into `seen` until it contains `needle`.
pub async fn read_until(body: &mut BodyDataStream, seen: &mut String, needle: &str) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !seen.contains(needle) {
            let chunk = body
                .next()
                .await
                .expect("stream ended early")
                .expect("body error");
            seen.push_str(&String::from_utf8_lossy(&chunk));
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}; got {seen:?}"));
}
