//! Run observability: traces, spans, emitter, and sinks.

pub mod emitter;
pub mod sink;
pub mod types;

pub use emitter::TraceEmitter;
pub use sink::{JsonlTraceSink, MemoryTraceSink, SinkError, TraceSink};
pub use types::{Span, Trace, TraceStatus};
