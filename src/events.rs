//! Execution event payload, emitted by the sequence executor as a
//! sequence starts, progresses step by step, finishes, is cancelled, or
//! fails validation. The wire `type` field is exactly `started`, `step`,
//! `completed`, `error`, `cancelled` — step start/completion is carried
//! as a `step_phase` sub-field rather than a separate `type`, so external
//! consumers built against the five-kind schema see a stable contract.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionEventKind {
    Started,
    Step,
    Completed,
    Cancelled,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    Started,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    #[serde(rename = "type")]
    pub kind: ExecutionEventKind,
    pub binding_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_phase: Option<StepPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp_ms: u64,
}

impl ExecutionEvent {
    pub fn started(binding_name: &str, timestamp_ms: u64) -> Self {
        Self {
            kind: ExecutionEventKind::Started,
            binding_name: binding_name.to_string(),
            step_phase: None,
            step: None,
            step_index: None,
            delay_ms: None,
            error: None,
            timestamp_ms,
        }
    }

    pub fn step_started(binding_name: &str, step_index: usize, step: Option<&str>, timestamp_ms: u64) -> Self {
        Self {
            kind: ExecutionEventKind::Step,
            binding_name: binding_name.to_string(),
            step_phase: Some(StepPhase::Started),
            step: step.map(str::to_string),
            step_index: Some(step_index),
            delay_ms: None,
            error: None,
            timestamp_ms,
        }
    }

    pub fn step_completed(
        binding_name: &str,
        step_index: usize,
        step: Option<&str>,
        delay_ms: u32,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            kind: ExecutionEventKind::Step,
            binding_name: binding_name.to_string(),
            step_phase: Some(StepPhase::Completed),
            step: step.map(str::to_string),
            step_index: Some(step_index),
            delay_ms: Some(delay_ms),
            error: None,
            timestamp_ms,
        }
    }

    pub fn cancelled(binding_name: &str, step_index: usize, timestamp_ms: u64) -> Self {
        Self {
            kind: ExecutionEventKind::Cancelled,
            binding_name: binding_name.to_string(),
            step_phase: None,
            step: None,
            step_index: Some(step_index),
            delay_ms: None,
            error: None,
            timestamp_ms,
        }
    }

    pub fn completed(binding_name: &str, timestamp_ms: u64) -> Self {
        Self {
            kind: ExecutionEventKind::Completed,
            binding_name: binding_name.to_string(),
            step_phase: None,
            step: None,
            step_index: None,
            delay_ms: None,
            error: None,
            timestamp_ms,
        }
    }

    pub fn error(binding_name: &str, message: String, timestamp_ms: u64) -> Self {
        Self {
            kind: ExecutionEventKind::Error,
            binding_name: binding_name.to_string(),
            step_phase: None,
            step: None,
            step_index: None,
            delay_ms: None,
            error: Some(message),
            timestamp_ms,
        }
    }
}
