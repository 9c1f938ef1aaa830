use serde_json::Value;

/// Backend-side markers meaning "this response is finished".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSignal {
    /// `result.metadata.finishReason`
    ResultFinishReason,
    /// `results[0].metadata.finishReason`
    ResultsFinishReason,
    /// `choices[0].finish_reason`
    ChoiceFinishReason,
    /// `done: true` (Ollama native).
    Done,
    /// `type: "message_stop"` or `type: "content_block_stop"`.
    StopEvent,
}

const FINISH_REASON_PATHS: [(&str, CompletionSignal); 3] = [
    ("/result/metadata/finishReason", CompletionSignal::ResultFinishReason),
    ("/results/0/metadata/finishReason", CompletionSignal::ResultsFinishReason),
    ("/choices/0/finish_reason", CompletionSignal::ChoiceFinishReason),
];

const STOP_EVENT_TYPES: [&str; 2] = ["message_stop", "content_block_stop"];

/// Which completion signal `payload` carries, if any.
///
/// A finish reason only counts when it has a value: intermediate chunks
/// routinely send `"finishReason": null` or `""`.
pub fn detect(payload: &Value) -> Option<CompletionSignal> {
    for (path, signal) in FINISH_REASON_PATHS {
        if payload.pointer(path).is_some_and(is_set) {
            return Some(signal);
        }
    }
    if payload.get("done").and_then(Value::as_bool) == Some(true) {
        return Some(CompletionSignal::Done);
    }
    if payload
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| STOP_EVENT_TYPES.contains(&t))
    {
        return Some(CompletionSignal::StopEvent);
    }
    None
}

pub fn is_finished(payload: &Value) -> bool {
    detect(payload).is_some()
}

fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
