use std::sync::Arc;

use geometry::MergedBuffer;
use parking_lot::Mutex;

use crate::pipeline::GenerationResult;

/// Receives the outcome of each pipeline run.
///
/// Called after the pipeline state has been updated and without any pipeline
/// lock held, so observers may query the pipeline.
pub trait GenerationObserver: Send + Sync {
    fn on_result(&self, _result: &GenerationResult) {}

    fn on_error(&self, _message: &str) {}
}

/// Minimal event type for traceability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationEvent {
    /// 0-based, in emission order.
    pub sequence: u64,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
struct EventLog {
    next_sequence: u64,
    events: Vec<GenerationEvent>,
}

/// Observer that records every notification in order.
#[derive(Debug, Default)]
pub struct EventBus {
    log: Mutex<EventLog>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, kind: &'static str, message: impl Into<String>) {
        let mut log = self.log.lock();
        let sequence = log.next_sequence;
        log.next_sequence += 1;
        log.events.push(GenerationEvent {
            sequence,
            kind,
            message: message.into(),
        });
    }

    pub fn events(&self) -> Vec<GenerationEvent> {
        self.log.lock().events.clone()
    }

    pub fn drain(&self) -> Vec<GenerationEvent> {
        std::mem::take(&mut self.log.lock().events)
    }
}

impl GenerationObserver for EventBus {
    fn on_result(&self, result: &GenerationResult) {
        let vertices = |b: Option<&Arc<MergedBuffer>>| {
            b.map_or_else(|| "none".to_string(), |b| b.vertex_count().to_string())
        };
        self.emit(
            "result",
            format!(
                "shape={} outline={} rings={}",
                vertices(result.shape.as_ref()),
                vertices(result.outline.as_ref()),
                result.stats.rings
            ),
        );
    }

    fn on_error(&self, message: &str) {
        self.emit("error", message);
    }
}
