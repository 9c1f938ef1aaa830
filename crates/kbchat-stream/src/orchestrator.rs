//! Drives one response body from raw bytes to typed segments.
//!
//! The loop suspends only while waiting for the next transport chunk. Each
//! chunk goes through the line framer; each data line is decoded, its text
//! extracted and split, and the completion signal checked, in that order.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use kbchat_core::error::ChatError;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, warn, Span};
use uuid::Uuid;

use crate::classify::{classify, RawFailure};
use crate::completion;
use crate::extract::extract_text;
use crate::observer::{DropReason, NoopObserver, StreamObserver};
use crate::sse::{LineFramer, SseLine};
use crate::stream::{Segment, StreamEvent, Termination};
use crate::thinking::TagSplitter;

/// Per-stream settings. Build one per response; [`Orchestrator::run`]
/// consumes it.
pub struct Orchestrator {
    observer: Arc<dyn StreamObserver>,
    span: Option<Span>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            observer: Arc::new(NoopObserver),
            span: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Span that log events of this stream are recorded under. Without one,
    /// `run` opens a `chat_stream` span with a fresh `stream_id`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Turn a body byte stream into a lazy, finite stream of events.
    ///
    /// Ends after exactly one of: `Ok(Done(..))` for the sentinel, a
    /// completion signal or exhaustion; `Err(..)` with kind `Cancelled` once
    /// `cancel` fires; `Err(..)` for a failed read. Nothing follows the
    /// final item.
    pub fn run<S, E>(
        self,
        body: S,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<StreamEvent, ChatError>> + Send + 'static
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let Orchestrator { observer, span } = self;
        let span =
            span.unwrap_or_else(|| debug_span!("chat_stream", stream_id = %Uuid::new_v4()));

        async_stream::stream! {
            let mut body = Box::pin(body);
            let mut framer = LineFramer::new();
            let mut decoder = LineDecoder::new(observer.clone());

            loop {
                let read = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Read::Cancelled,
                    chunk = body.next() => Read::Chunk(chunk),
                };

                let lines = match read {
                    Read::Cancelled => {
                        debug!(parent: &span, "stream cancelled by caller");
                        yield Err(ChatError::cancelled());
                        return;
                    }
                    Read::Chunk(Some(Ok(chunk))) => framer.push(&chunk),
                    Read::Chunk(Some(Err(e))) => {
                        warn!(parent: &span, error = %e, "stream read failed");
                        yield Err(classify(RawFailure::Read(Box::new(e)), Some(&cancel)));
                        return;
                    }
                    Read::Chunk(None) => {
                        let lines: Vec<SseLine> = framer.finish().into_iter().collect();
                        for line in lines {
                            let decoded = span.in_scope(|| decoder.decode(line));
                            for segment in decoded.segments {
                                yield Ok(StreamEvent::Segment(segment));
                            }
                            if let Some(end) = decoded.end {
                                observer.completed(end);
                                yield Ok(StreamEvent::Done(end));
                                return;
                            }
                        }
                        debug!(parent: &span, "stream exhausted");
                        observer.completed(Termination::Exhausted);
                        yield Ok(StreamEvent::Done(Termination::Exhausted));
                        return;
                    }
                };

                for line in lines {
                    if cancel.is_cancelled() {
                        debug!(parent: &span, "stream cancelled by caller");
                        yield Err(ChatError::cancelled());
                        return;
                    }
                    let decoded = span.in_scope(|| decoder.decode(line));
                    for segment in decoded.segments {
                        yield Ok(StreamEvent::Segment(segment));
                    }
                    if let Some(end) = decoded.end {
                        debug!(parent: &span, termination = ?end, "stream finished");
                        observer.completed(end);
                        yield Ok(StreamEvent::Done(end));
                        return;
                    }
                }
            }
        }
    }
}

enum Read<T> {
    Cancelled,
    Chunk(Option<T>),
}

/// Output of one classified line.
#[derive(Debug, Default, PartialEq)]
struct Decoded {
    segments: Vec<Segment>,
    end: Option<Termination>,
}

/// Owns the per-stream splitter state. Never shared between streams.
struct LineDecoder {
    splitter: TagSplitter,
    observer: Arc<dyn StreamObserver>,
}

impl LineDecoder {
    fn new(observer: Arc<dyn StreamObserver>) -> Self {
        Self {
            splitter: TagSplitter::new(),
            observer,
        }
    }

    fn decode(&mut self, line: SseLine) -> Decoded {
        let payload = match line {
            SseLine::Ignored => return Decoded::default(),
            SseLine::Done => {
                return Decoded {
                    segments: Vec::new(),
                    end: Some(Termination::Sentinel),
                }
            }
            SseLine::Data(payload) => payload,
        };
        if payload.trim().is_empty() {
            return Decoded::default();
        }

        let value: Value = match serde_json::from_str(&payload) {
            Ok(v) => v,
            Err(e) => {
                // one bad line must not abort the whole stream
                warn!(error = %e, payload = %payload, "skipping malformed stream line");
                self.observer.line_dropped(DropReason::MalformedJson, &payload);
                return Decoded::default();
            }
        };

        let text = extract_text(&value);
        let signal = completion::detect(&value);
        if text.is_empty() && signal.is_none() {
            debug!(payload = %payload, "no text in stream payload");
            self.observer.line_dropped(DropReason::UnrecognizedShape, &payload);
        }

        let segments = if text.is_empty() {
            Vec::new()
        } else {
            debug!(len = text.len(), "stream text delta");
            self.splitter.split(text)
        };

        Decoded {
            segments,
            end: signal.map(Termination::CompletionSignal),
        }
    }
}
