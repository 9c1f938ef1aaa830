use crate::stream::Termination;

/// Why a data line produced no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The payload was not valid JSON.
    MalformedJson,
    /// Valid JSON, but no known shape carried text and no completion signal
    /// was present.
    UnrecognizedShape,
}

/// Optional diagnostics hook for paths that are otherwise silent.
///
/// Drops never reach the segment stream; they are logged and, if an
/// observer is installed, reported here. All methods default to no-ops.
pub trait StreamObserver: Send + Sync {
    fn line_dropped(&self, _reason: DropReason, _payload: &str) {}

    fn completed(&self, _termination: Termination) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StreamObserver for NoopObserver {}
