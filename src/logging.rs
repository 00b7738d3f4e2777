//! Bridge from `tracing` events to the log hub.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use chrono::Local;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::hub::LogHub;

/// Layer that appends every event it sees to a `LogHub` as
/// `YYYY-MM-DD HH:MM:SS message key=value ...`.
pub struct HubLayer {
    hub: Arc<LogHub>,
}

impl HubLayer {
    pub fn new(hub: Arc<LogHub>) -> Self {
        Self { hub }
    }
}

impl<S: Subscriber> Layer<S> for HubLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut line = LineVisitor::default();
        event.record(&mut line);
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.hub.append(format!("{stamp} {}", line.finish()));
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn finish(self) -> String {
        self.message + &self.fields
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing::{info, warn};
    use tracing_subscriber::prelude::*;

    use super::*;

    #[test]
    fn events_become_stamped_lines() {
        let hub = Arc::new(LogHub::new(16));
        let subscriber = tracing_subscriber::registry().with(HubLayer::new(Arc::clone(&hub)));
        tracing::subscriber::with_default(subscriber, || {
            info!("agent start");
            warn!(device = "sda", sectors = 42, "counter reset");
        });

        let (lines, watermark) = hub.snapshot_and_watermark(10);
        assert_eq!(watermark, 2);
        // "2026-01-01 12:00:00 " prefix
        assert_eq!(lines[0].text.as_bytes()[4], b'-');
        assert_eq!(lines[0].text.as_bytes()[19], b' ');
        assert!(lines[0].text.ends_with(" agent start"));
        assert!(lines[1].text.ends_with(" counter reset device=sda sectors=42"));
    }
}
