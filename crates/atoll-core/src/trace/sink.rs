//! Trace sinks — durable destinations for trace and span records.
//!
//! [`JsonlTraceSink`] appends one JSON object per line to a daily file
//! under a base directory. Updated records are appended again rather
//! than rewritten in place; readers take the last record per id.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::trace::types::{Span, Trace};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store error: {0}")]
    Store(String),
}

/// Destination for trace records. Implementations must tolerate the
/// same record being written more than once (start, then final state).
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn append_trace(&self, trace: &Trace) -> Result<(), SinkError>;
    async fn update_trace(&self, trace: &Trace) -> Result<(), SinkError>;
    async fn append_span(&self, span: &Span) -> Result<(), SinkError>;
    async fn update_span(&self, span: &Span) -> Result<(), SinkError>;
}

#[derive(Serialize)]
#[serde(tag = "recordType", rename_all = "camelCase")]
enum SinkRecord<'a> {
    Trace(&'a Trace),
    Span(&'a Span),
}

struct CurrentFile {
    date: NaiveDate,
    file: tokio::fs::File,
}

/// Appends records as JSON lines to `<base_dir>/traces-YYYY-MM-DD.jsonl`,
/// rotating daily.
pub struct JsonlTraceSink {
    base_dir: PathBuf,
    current: Mutex<Option<CurrentFile>>,
}

impl JsonlTraceSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            current: Mutex::new(None),
        }
    }

    async fn write_record(&self, record: SinkRecord<'_>) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(&record)
            .map_err(|e| SinkError::Serialization(e.to_string()))?;
        line.push('\n');

        let today = Utc::now().date_naive();
        let mut guard = self.current.lock().await;

        let rotate = match guard.as_ref() {
            Some(current) => current.date != today,
            None => true,
        };
        if rotate {
            tokio::fs::create_dir_all(&self.base_dir)
                .await
                .map_err(|e| SinkError::Io(e.to_string()))?;
            let path = self
                .base_dir
                .join(format!("traces-{}.jsonl", today.format("%Y-%m-%d")));
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .map_err(|e| SinkError::Io(e.to_string()))?;
            *guard = Some(CurrentFile { date: today, file });
        }

        if let Some(current) = guard.as_mut() {
            current
                .file
                .write_all(line.as_bytes())
                .await
                .map_err(|e| SinkError::Io(e.to_string()))?;
            current
                .file
                .flush()
                .await
                .map_err(|e| SinkError::Io(e.to_string()))?;
        }

        Ok(())
    }
}

#[async_trait]
impl TraceSink for JsonlTraceSink {
    async fn append_trace(&self, trace: &Trace) -> Result<(), SinkError> {
        self.write_record(SinkRecord::Trace(trace)).await
    }

    async fn update_trace(&self, trace: &Trace) -> Result<(), SinkError> {
        self.write_record(SinkRecord::Trace(trace)).await
    }

    async fn append_span(&self, span: &Span) -> Result<(), SinkError> {
        self.write_record(SinkRecord::Span(span)).await
    }

    async fn update_span(&self, span: &Span) -> Result<(), SinkError> {
        self.write_record(SinkRecord::Span(span)).await
    }
}

/// In-memory sink for tests. Updates replace the stored record with the
/// same id; `fail_writes` makes every operation error to exercise the
/// emitter's never-propagate contract.
#[derive(Default)]
pub struct MemoryTraceSink {
    traces: Mutex<Vec<Trace>>,
    spans: Mutex<Vec<Span>>,
    pub fail_writes: bool,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub async fn traces(&self) -> Vec<Trace> {
        self.traces.lock().await.clone()
    }

    pub async fn spans(&self) -> Vec<Span> {
        self.spans.lock().await.clone()
    }

    fn check(&self) -> Result<(), SinkError> {
        if self.fail_writes {
            Err(SinkError::Store("sink unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TraceSink for MemoryTraceSink {
    async fn append_trace(&self, trace: &Trace) -> Result<(), SinkError> {
        self.check()?;
        self.traces.lock().await.push(trace.clone());
        Ok(())
    }

    async fn update_trace(&self, trace: &Trace) -> Result<(), SinkError> {
        self.check()?;
        let mut traces = self.traces.lock().await;
        match traces.iter_mut().find(|t| t.trace_id == trace.trace_id) {
            Some(existing) => *existing = trace.clone(),
            None => traces.push(trace.clone()),
        }
        Ok(())
    }

    async fn append_span(&self, span: &Span) -> Result<(), SinkError> {
        self.check()?;
        self.spans.lock().await.push(span.clone());
        Ok(())
    }

    async fn update_span(&self, span: &Span) -> Result<(), SinkError> {
        self.check()?;
        let mut spans = self.spans.lock().await;
        match spans.iter_mut().find(|s| s.span_id == span.span_id) {
            Some(existing) => *existing = span.clone(),
            None => spans.push(span.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_jsonl_sink_appends_records() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlTraceSink::new(dir.path());

        let trace = Trace::started(Uuid::new_v4(), "run", "user-1");
        sink.append_trace(&trace).await.unwrap();
        let mut span = Span::started(trace.trace_id, "worker", "task");
        span.complete("done");
        sink.update_span(&span).await.unwrap();

        let path = dir.path().join(format!(
            "traces-{}.jsonl",
            Utc::now().date_naive().format("%Y-%m-%d")
        ));
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["recordType"], "trace");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["recordType"], "span");
        assert_eq!(second["output"], "done");
    }

    #[tokio::test]
    async fn test_memory_sink_update_replaces() {
        let sink = MemoryTraceSink::new();
        let mut trace = Trace::started(Uuid::new_v4(), "run", "user-1");
        sink.append_trace(&trace).await.unwrap();

        trace.status = crate::trace::types::TraceStatus::Completed;
        sink.update_trace(&trace).await.unwrap();

        let traces = sink.traces().await;
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].status, crate::trace::types::TraceStatus::Completed);
    }
}
