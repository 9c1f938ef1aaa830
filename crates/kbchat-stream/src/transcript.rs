use chrono::{DateTime, Duration, Utc};

use crate::stream::Segment;

/// Caller-side accumulator for one assistant message.
///
/// Appends segments as they arrive and records when reasoning started and
/// ended, so a UI can show how long the model thought.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    answer: String,
    reasoning: String,
    reasoning_started_at: Option<DateTime<Utc>>,
    reasoning_ended_at: Option<DateTime<Utc>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: &Segment) {
        self.push_at(segment, Utc::now());
    }

    pub fn push_at(&mut self, segment: &Segment, at: DateTime<Utc>) {
        if segment.is_reasoning() {
            self.reasoning_started_at.get_or_insert(at);
            self.reasoning.push_str(segment.text());
        } else {
            self.close_reasoning(at);
            self.answer.push_str(segment.text());
        }
    }

    /// Mark the end of the stream. Reasoning that never saw an answer is
    /// closed here.
    pub fn finish(&mut self) {
        self.finish_at(Utc::now());
    }

    pub fn finish_at(&mut self, at: DateTime<Utc>) {
        self.close_reasoning(at);
    }

    fn close_reasoning(&mut self, at: DateTime<Utc>) {
        if self.reasoning_started_at.is_some() && self.reasoning_ended_at.is_none() {
            self.reasoning_ended_at = Some(at);
        }
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn is_empty(&self) -> bool {
        self.answer.is_empty() && self.reasoning.is_empty()
    }

    /// `None` until reasoning has both started and ended.
    pub fn reasoning_duration(&self) -> Option<Duration> {
        Some(self.reasoning_ended_at? - self.reasoning_started_at?)
    }
}
