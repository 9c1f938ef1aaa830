use crate::completion::CompletionSignal;

/// A typed piece of model output. The payload is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Final-answer text.
    Answer(String),
    /// Intermediate reasoning, delimited inline by `<think>`/`</think>`.
    /// Callers decide how to surface or discard it.
    Reasoning(String),
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Answer(text) | Segment::Reasoning(text) => text,
        }
    }

    pub fn is_reasoning(&self) -> bool {
        matches!(self, Segment::Reasoning(_))
    }
}

/// How a stream ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A `data: [DONE]` line.
    Sentinel,
    /// A payload carried a completion signal.
    CompletionSignal(CompletionSignal),
    /// The transport closed the body.
    Exhausted,
}

/// Events emitted while consuming one chat response stream.
///
/// Segments arrive in the order their bytes were received. `Done` is always
/// the last item of a successful stream; a failed or cancelled stream ends
/// with an `Err` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Segment(Segment),
    Done(Termination),
}
