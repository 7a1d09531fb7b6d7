//! Progress events.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Pipeline stages, in execution order.
pub const STAGE_PARSE: u8 = 1;
pub const STAGE_INTENTS: u8 = 2;
pub const STAGE_PAYLOADS: u8 = 3;
pub const STAGE_ENHANCE: u8 = 4;
pub const STAGE_FIXTURES: u8 = 5;
pub const STAGE_RENDER: u8 = 6;

pub const STAGE_COUNT: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One progress event, emitted at stage start and end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: String,
    pub stage_id: u8,
    pub status: StageStatus,
    pub progress_percent: u8,
}

/// Where progress events go. The transport behind it is out of scope.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Collects events in order, for tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Percent complete after finishing the given stage.
pub fn percent_after(stage_id: u8) -> u8 {
    ((stage_id as u16 * 100) / STAGE_COUNT as u16) as u8
}
