//! Sequence-numbered ring buffer of log lines with live followers.
//!
//! Appenders never wait for readers: they take the ring lock, push, evict and
//! publish the newest sequence on a watch channel. Readers wait on that
//! channel with a timeout and then copy out whatever is newer than their
//! watermark.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;

use crate::model::LogLine;

/// Lines kept for replay.
pub const DEFAULT_CAPACITY: usize = 800;

struct Ring {
    lines: VecDeque<LogLine>,
    last_sequence: u64,
}

pub struct LogHub {
    ring: Mutex<Ring>,
    latest: watch::Sender<u64>,
    capacity: usize,
}

impl LogHub {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (latest, _) = watch::channel(0);
        Self {
            ring: Mutex::new(Ring {
                lines: VecDeque::with_capacity(capacity),
                last_sequence: 0,
            }),
            latest,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn ring(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a line, evicting the oldest one when full, and wake every
    /// waiting reader. Returns the line's sequence number.
    pub fn append(&self, text: impl Into<String>) -> u64 {
        let mut ring = self.ring();
        ring.last_sequence += 1;
        let sequence = ring.last_sequence;
        ring.lines.push_back(LogLine {
            sequence,
            text: text.into(),
        });
        while ring.lines.len() > self.capacity {
            ring.lines.pop_front();
        }
        // published under the lock so the watch value never runs ahead of
        // the ring
        self.latest.send_replace(sequence);
        sequence
    }

    /// The newest `max_lines` lines and the newest sequence in the buffer
    /// (0 when nothing was logged yet).
    pub fn snapshot_and_watermark(&self, max_lines: usize) -> (Vec<LogLine>, u64) {
        let ring = self.ring();
        let skip = ring.lines.len().saturating_sub(max_lines);
        let lines = ring.lines.iter().skip(skip).cloned().collect();
        let watermark = ring.lines.back().map_or(0, |l| l.sequence);
        (lines, watermark)
    }

    /// Lines with a sequence greater than `since`, oldest first.
    pub fn lines_since(&self, since: u64) -> Vec<LogLine> {
        let ring = self.ring();
        let Some(first) = ring.lines.front().map(|l| l.sequence) else {
            return Vec::new();
        };
        // retained sequences are contiguous, so the offset is arithmetic
        let start = since.saturating_add(1).saturating_sub(first) as usize;
        ring.lines.iter().skip(start).cloned().collect()
    }

    /// Wait until a line newer than `since` exists or `timeout` elapses,
    /// then return the new lines (empty on timeout).
    pub async fn wait_for_more(&self, since: u64, timeout: Duration) -> Vec<LogLine> {
        let mut latest = self.latest.subscribe();
        // wait_for checks the current value first, so an append that raced
        // ahead of the subscription is not missed
        let _ = tokio::time::timeout(timeout, latest.wait_for(|&seq| seq > since)).await;
        self.lines_since(since)
    }

    /// Start following the hub: returns up to `replay` recent lines and a
    /// subscriber positioned right after them.
    pub fn subscribe(self: &Arc<Self>, replay: usize) -> (Vec<LogLine>, Subscriber) {
        let (lines, watermark) = self.snapshot_and_watermark(replay);
        let subscriber = Subscriber {
            hub: Arc::clone(self),
            last_seen: watermark,
        };
        (lines, subscriber)
    }
}

impl Default for LogHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// One reader's position in the hub.
pub struct Subscriber {
    hub: Arc<LogHub>,
    last_seen: u64,
}

impl Subscriber {
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    /// Next batch of lines after the watermark; empty if nothing arrived
    /// within `timeout`.
    pub async fn next_batch(&mut self, timeout: Duration) -> Vec<LogLine> {
        let lines = self.hub.wait_for_more(self.last_seen, timeout).await;
        if let Some(last) = lines.last() {
            self.last_seen = last.sequence;
        }
        lines
    }
}
