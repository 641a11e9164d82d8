//! Trace and span records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Running,
    Completed,
    Failed,
}

/// One workflow run, as seen by observability. A trace shares its id
/// with the run it records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    pub trace_id: Uuid,
    pub name: String,
    pub user_id: String,
    pub status: TraceStatus,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Input of the first span that finished under this trace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_input: Option<String>,
    /// Output of the last span that finished under this trace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_output: Option<String>,
}

impl Trace {
    pub fn started(trace_id: Uuid, name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            trace_id,
            name: name.into(),
            user_id: user_id.into(),
            status: TraceStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            first_input: None,
            last_output: None,
        }
    }
}

/// One agent invocation within a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub span_id: Uuid,
    pub trace_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    /// Agent name.
    pub name: String,
    pub status: TraceStatus,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Span {
    pub fn started(trace_id: Uuid, name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            span_id: Uuid::new_v4(),
            trace_id,
            parent_id: None,
            name: name.into(),
            status: TraceStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            input: input.into(),
            output: None,
            error: None,
        }
    }

    pub fn complete(&mut self, output: &str) {
        self.status = TraceStatus::Completed;
        self.end_time = Some(Utc::now());
        self.output = Some(output.to_string());
    }

    pub fn fail(&mut self, error: &str) {
        self.status = TraceStatus::Failed;
        self.end_time = Some(Utc::now());
        self.error = Some(error.to_string());
    }
}
