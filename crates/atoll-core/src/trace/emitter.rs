//! Trace emitter — the run-facing side of observability.
//!
//! The emitter tracks active traces and spans, derives each trace's
//! first input and last output from the spans that finish under it, and
//! forwards records to the sink. Sink failures are logged and never
//! propagated; observability must not fail a run.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::trace::sink::TraceSink;
use crate::trace::types::{Span, Trace, TraceStatus};

#[derive(Default)]
struct EmitterInner {
    /// Traces started but not yet ended.
    active_traces: HashMap<Uuid, Trace>,
    /// Open spans, mapped to their trace.
    active_spans: HashMap<Uuid, Uuid>,
    /// Input of the first span that ended per trace. Set once.
    first_inputs: HashMap<Uuid, String>,
    /// Output of the last span that ended per trace. Overwritten.
    last_outputs: HashMap<Uuid, String>,
}

pub struct TraceEmitter {
    sink: Arc<dyn TraceSink>,
    inner: Mutex<EmitterInner>,
}

impl TraceEmitter {
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        Self {
            sink,
            inner: Mutex::new(EmitterInner::default()),
        }
    }

    pub async fn on_trace_start(&self, trace: Trace) {
        {
            let mut inner = self.inner.lock().await;
            inner.active_traces.insert(trace.trace_id, trace.clone());
        }
        if let Err(e) = self.sink.append_trace(&trace).await {
            tracing::warn!("[TraceEmitter] Failed to record trace start: {}", e);
        }
    }

    /// Finish a trace: stamp its end time and status, fold in the first
    /// input and last output collected from its spans, and write the
    /// final record. An unknown trace id is dropped with a warning.
    pub async fn on_trace_end(&self, trace_id: Uuid, status: TraceStatus) {
        let finished = {
            let mut inner = self.inner.lock().await;
            let Some(mut trace) = inner.active_traces.remove(&trace_id) else {
                tracing::warn!("[TraceEmitter] Dropping end of unknown trace {}", trace_id);
                return;
            };
            trace.status = status;
            trace.end_time = Some(Utc::now());
            trace.first_input = inner.first_inputs.remove(&trace_id);
            trace.last_output = inner.last_outputs.remove(&trace_id);
            trace
        };

        if let Err(e) = self.sink.update_trace(&finished).await {
            tracing::warn!("[TraceEmitter] Failed to record trace end: {}", e);
        }
    }

    /// Register an opened span. Spans of unknown traces are dropped with
    /// a warning and never reach the sink.
    pub async fn on_span_start(&self, span: &Span) {
        {
            let mut inner = self.inner.lock().await;
            if !inner.active_traces.contains_key(&span.trace_id) {
                tracing::warn!(
                    "[TraceEmitter] Dropping span '{}' of unknown trace {}",
                    span.name,
                    span.trace_id
                );
                return;
            }
            inner.active_spans.insert(span.span_id, span.trace_id);
        }
        if let Err(e) = self.sink.append_span(span).await {
            tracing::warn!("[TraceEmitter] Failed to record span start: {}", e);
        }
    }

    /// Finish a span and fold its input/output into the owning trace.
    /// Spans that were never registered are dropped with a warning.
    pub async fn on_span_end(&self, span: Span) {
        {
            let mut inner = self.inner.lock().await;
            if inner.active_spans.remove(&span.span_id).is_none() {
                tracing::warn!(
                    "[TraceEmitter] Dropping end of unknown span '{}'",
                    span.name
                );
                return;
            }
            inner
                .first_inputs
                .entry(span.trace_id)
                .or_insert_with(|| span.input.clone());
            if let Some(output) = &span.output {
                inner.last_outputs.insert(span.trace_id, output.clone());
            }
        }
        if let Err(e) = self.sink.update_span(&span).await {
            tracing::warn!("[TraceEmitter] Failed to record span end: {}", e);
        }
    }
}
