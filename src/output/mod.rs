//! Output of extracted documents
//!
//! [`RecordEmitter`] turns a retained document into one JSON line;
//! [`OutputWriter`] owns the output files and serializes all writes.

mod emitter;
mod writer;

pub use emitter::{EmitError, JsonlFile, LineSink, RecordEmitter};
pub use writer::{ChannelSink, OutputHandle, OutputWriter, StreamReport, WriterReport};
