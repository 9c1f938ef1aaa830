//! Text extraction from vendor-specific stream payloads.
//!
//! Backends are swapped without notice, so every decoded data line is probed
//! against the known response layouts in a fixed order, most specific first.
//! This is the only place that knows vendor field paths.

use serde_json::Value;

/// One known layout carrying an output increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `result.output.content` (Spring AI `ChatResponse`).
    ResultOutput,
    /// `results[0].output.content`
    ResultsOutput,
    /// `choices[0].delta.content` (OpenAI streaming chunk).
    ChoiceDelta,
    /// `choices[0].message.content`
    ChoiceMessage,
    /// `delta.text` (Anthropic `content_block_delta`).
    AnthropicDelta,
    /// `content_block.text`
    ContentBlock,
    Content,
    Text,
    Message,
    /// `data.content`
    DataContent,
    /// `data.text`
    DataText,
}

impl PayloadShape {
    /// Probe order. A payload matching two shapes resolves to the earlier one.
    pub const PRIORITY: [PayloadShape; 11] = [
        PayloadShape::ResultOutput,
        PayloadShape::ResultsOutput,
        PayloadShape::ChoiceDelta,
        PayloadShape::ChoiceMessage,
        PayloadShape::AnthropicDelta,
        PayloadShape::ContentBlock,
        PayloadShape::Content,
        PayloadShape::Text,
        PayloadShape::Message,
        PayloadShape::DataContent,
        PayloadShape::DataText,
    ];

    /// JSON pointer to the text field of this shape.
    pub fn pointer(self) -> &'static str {
        match self {
            PayloadShape::ResultOutput => "/result/output/content",
            PayloadShape::ResultsOutput => "/results/0/output/content",
            PayloadShape::ChoiceDelta => "/choices/0/delta/content",
            PayloadShape::ChoiceMessage => "/choices/0/message/content",
            PayloadShape::AnthropicDelta => "/delta/text",
            PayloadShape::ContentBlock => "/content_block/text",
            PayloadShape::Content => "/content",
            PayloadShape::Text => "/text",
            PayloadShape::Message => "/message",
            PayloadShape::DataContent => "/data/content",
            PayloadShape::DataText => "/data/text",
        }
    }

    /// Non-empty string at this shape's path, if any.
    pub fn probe(self, payload: &Value) -> Option<&str> {
        payload
            .pointer(self.pointer())
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// First matching shape and its text.
pub fn match_shape(payload: &Value) -> Option<(PayloadShape, &str)> {
    PayloadShape::PRIORITY
        .iter()
        .find_map(|&shape| shape.probe(payload).map(|text| (shape, text)))
}

/// Text increment carried by `payload`; empty when no known shape matches.
pub fn extract_text(payload: &Value) -> &str {
    match_shape(payload).map(|(_, text)| text).unwrap_or("")
}
