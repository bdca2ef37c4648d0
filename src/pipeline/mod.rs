//! Pipeline driver and run reporting

mod driver;
mod report;

pub use driver::{Pipeline, PipelineError, SegmentProcessor};
pub use report::{RunSummary, SegmentReport, SegmentState, SegmentStats};
