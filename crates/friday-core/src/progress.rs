//! Progress side channel.
//!
//! Progress is fire-and-forget: sinks never report failure back to the
//! caller, and a sink that cannot write simply drops the event. The host
//! reads `PROGRESS:<stage>:<percent>:<message>` lines from stderr.

use std::io::Write;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Line prefix the host filters on.
pub const PROGRESS_PREFIX: &str = "PROGRESS";

/// Pipeline stage a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProgressStage {
    Text,
    Images,
    Markdown,
    Complete,
}

/// A single progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    /// Always within 0..=100.
    pub percent: u8,
    pub message: String,
}

impl ProgressEvent {
    /// Create an event, clamping `percent` to 100.
    pub fn new(stage: ProgressStage, percent: u32, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent: percent.min(100) as u8,
            message: message.into(),
        }
    }

    /// Render as a single side-channel line (without trailing newline).
    pub fn to_line(&self) -> String {
        // One event per line, whatever the message contains.
        let message = self.message.replace(['\r', '\n'], " ");
        format!(
            "{}:{}:{}:{}",
            PROGRESS_PREFIX, self.stage, self.percent, message
        )
    }
}

/// Position inside a progress band.
///
/// Returns `start + floor(done * width / total)`. A zero `total` yields the
/// end of the band.
pub fn band_percent(start: u32, width: u32, done: usize, total: usize) -> u32 {
    if total == 0 {
        return start + width;
    }
    let done = done.min(total) as u64;
    start + (done * width as u64 / total as u64) as u32
}

/// Destination for progress events.
pub trait ProgressSink: Send + Sync {
    /// Emit an event. Must never panic or block on a consumer.
    fn emit(&self, event: &ProgressEvent);

    /// Convenience wrapper building the event in place.
    fn report(&self, stage: ProgressStage, percent: u32, message: &str) {
        self.emit(&ProgressEvent::new(stage, percent, message));
    }
}

/// Writes progress lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn emit(&self, event: &ProgressEvent) {
        let mut stderr = std::io::stderr().lock();
        // Best effort: a closed stderr must not abort the pipeline.
        let _ = writeln!(stderr, "{}", event.to_line());
        let _ = stderr.flush();
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl MemoryProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events emitted so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Just the percentages, in emission order.
    pub fn percentages(&self) -> Vec<u8> {
        self.events().iter().map(|e| e.percent).collect()
    }
}

impl ProgressSink for MemoryProgress {
    fn emit(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
