//! The typed event surface emitted to the host UI layer. Delivered over an
//! unbounded channel so a slow or absent consumer never blocks scheduling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventBody {
    SectionUpdate { section_id: String, status: String },
    WorkerStarted { worker_id: String, section_id: String },
    WorkerCompleted { worker_id: String, section_id: String },
    WorkerFailed { worker_id: String, section_id: String, error: String },
    WorkerOutput { worker_id: String, section_id: String, line: String },
    ComplexityAnalyzed { section_id: String, score: u32, model: String },
    LevelStarted { level: usize, section_ids: Vec<String> },
    MergePointCompleted { level: usize, succeeded: bool },
    SessionPaused { reason: String },
    SessionFailed { reason: String },
    SessionComplete,
    GoalReviewStarted { section_id: String },
    GoalReviewResult { section_id: String, verdict: String },
    FixLoopStarted { section_id: String },
    FixLoopCycle { section_id: String, cycle: u32 },
    FixLoopDiagnosing { section_id: String },
    FixLoopFixing { section_id: String },
    FixLoopCompleted { section_id: String, outcome: String },
    LearningCaptured { learning_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub body: EventBody,
}

/// A fan-out point for one session's events. Timestamps are supplied by the
/// caller (via `now`) rather than taken internally so event ordering stays
/// under the scheduler's control and tests can assert monotonicity without
/// a wall-clock race.
#[derive(Clone)]
pub struct EventSink {
    session_id: String,
    sender: mpsc::UnboundedSender<Event>,
}

impl EventSink {
    pub fn new(session_id: impl Into<String>, sender: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            session_id: session_id.into(),
            sender,
        }
    }

    pub fn emit(&self, now: DateTime<Utc>, body: EventBody) {
        let _ = self.sender.send(Event {
            session_id: self.session_id.clone(),
            timestamp: now,
            body,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_delivers_event_with_session_id() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new("sess-1", tx);
        sink.emit(
            Utc::now(),
            EventBody::SessionComplete,
        );
        let event = rx.try_recv().unwrap();
        assert_eq!(event.session_id, "sess-1");
        assert!(matches!(event.body, EventBody::SessionComplete));
    }
}
