use std::io::Write;

use futures_util::{Stream, StreamExt};
use kbchat_core::config::ChatDefaults;
use kbchat_core::error::ChatError;
use kbchat_core::types::ChatRequest;
use kbchat_stream::{Segment, StreamEvent, Termination, Transcript};
use tracing::debug;

/// How a rendered chat ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed(Termination),
    Stopped,
}

/// Flags given on the command line; unset ones fall back to config.
#[derive(Debug, Default, Clone)]
pub struct ChatArgs {
    pub model: Option<String>,
    pub rag_tag: Option<String>,
    pub plain: bool,
    pub message: String,
}

/// Build the request, preferring command-line values over config defaults.
/// `plain` ignores any configured knowledge-base tag.
pub fn build_request(args: ChatArgs, defaults: &ChatDefaults) -> ChatRequest {
    let model = args
        .model
        .or_else(|| defaults.model.clone())
        .unwrap_or_default();
    let tag = if args.plain {
        None
    } else {
        args.rag_tag.or_else(|| defaults.rag_tag.clone())
    };
    let req = ChatRequest::new(model, args.message);
    match tag {
        Some(tag) => req.with_rag_tag(tag),
        None => req,
    }
}

/// Print answer text to `out` as it arrives. Reasoning goes to `thoughts`
/// when given and is otherwise only accumulated.
///
/// Cancellation is not an error here; it ends the render with
/// [`Outcome::Stopped`] and keeps whatever was already received.
pub async fn render<S, W, T>(
    events: S,
    out: &mut W,
    mut thoughts: Option<&mut T>,
    transcript: &mut Transcript,
) -> Result<Outcome, ChatError>
where
    S: Stream<Item = Result<StreamEvent, ChatError>>,
    W: Write,
    T: Write,
{
    futures_util::pin_mut!(events);
    let mut outcome = Outcome::Completed(Termination::Exhausted);

    while let Some(item) = events.next().await {
        match item {
            Ok(StreamEvent::Segment(segment)) => {
                transcript.push(&segment);
                let written = match (&segment, thoughts.as_deref_mut()) {
                    (Segment::Answer(text), _) => {
                        out.write_all(text.as_bytes()).and_then(|_| out.flush())
                    }
                    (Segment::Reasoning(text), Some(t)) => {
                        t.write_all(text.as_bytes()).and_then(|_| t.flush())
                    }
                    (Segment::Reasoning(_), None) => Ok(()),
                };
                if let Err(e) = written {
                    // stdout closed (e.g. piped into head); nothing left to show
                    debug!(error = %e, "output closed");
                    break;
                }
            }
            Ok(StreamEvent::Done(termination)) => outcome = Outcome::Completed(termination),
            Err(e) if e.is_cancelled() => outcome = Outcome::Stopped,
            Err(e) => {
                transcript.finish();
                return Err(e);
            }
        }
    }

    transcript.finish();
    Ok(outcome)
}

/// Terminate the answer line. A closed output is not an error.
pub fn end_line<W: Write>(out: &mut W) {
    if let Err(e) = writeln!(out).and_then(|_| out.flush()) {
        debug!(error = %e, "output closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use kbchat_core::error::ErrorKind;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    fn defaults() -> ChatDefaults {
        ChatDefaults {
            model: Some("qwen2.5:7b".to_string()),
            rag_tag: Some("handbook".to_string()),
        }
    }

    #[test]
    fn flags_override_config() {
        let req = build_request(
            ChatArgs {
                model: Some("deepseek-r1".into()),
                rag_tag: Some("wiki".into()),
                message: "hi".into(),
                ..ChatArgs::default()
            },
            &defaults(),
        );
        assert_eq!(req.model, "deepseek-r1");
        assert_eq!(req.rag_tag.as_deref(), Some("wiki"));
    }

    #[test]
    fn config_fills_missing_flags() {
        let req = build_request(
            ChatArgs {
                message: "hi".into(),
                ..ChatArgs::default()
            },
            &defaults(),
        );
        assert_eq!(req.model, "qwen2.5:7b");
        assert_eq!(req.rag_tag.as_deref(), Some("handbook"));
    }

    #[test]
    fn plain_drops_configured_tag() {
        let req = build_request(
            ChatArgs {
                plain: true,
                message: "hi".into(),
                ..ChatArgs::default()
            },
            &defaults(),
        );
        assert!(!req.is_grounded());
    }

    #[test]
    fn missing_model_fails_validation() {
        let req = build_request(
            ChatArgs {
                message: "hi".into(),
                ..ChatArgs::default()
            },
            &ChatDefaults::default(),
        );
        assert_eq!(req.validate().unwrap_err().kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn answer_to_out_reasoning_to_thoughts() {
        let events = stream::iter(vec![
            Ok(StreamEvent::Segment(Segment::Reasoning("hmm".into()))),
            Ok(StreamEvent::Segment(Segment::Answer("Hello".into()))),
            Ok(StreamEvent::Done(Termination::Sentinel)),
        ]);
        let mut out = Vec::new();
        let mut thoughts = Vec::new();
        let mut transcript = Transcript::new();

        let outcome = render(events, &mut out, Some(&mut thoughts), &mut transcript)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Completed(Termination::Sentinel));
        assert_eq!(out, b"Hello");
        assert_eq!(thoughts, b"hmm");
        assert_eq!(transcript.reasoning(), "hmm");
        assert!(transcript.reasoning_duration().is_some());
    }

    #[tokio::test]
    async fn hidden_reasoning_is_still_recorded() {
        let events = stream::iter(vec![
            Ok(StreamEvent::Segment(Segment::Reasoning("hmm".into()))),
            Ok(StreamEvent::Segment(Segment::Answer("ok".into()))),
        ]);
        let mut out = Vec::new();
        let mut transcript = Transcript::new();

        let outcome = render(events, &mut out, None::<&mut Vec<u8>>, &mut transcript)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Completed(Termination::Exhausted));
        assert_eq!(out, b"ok");
        assert_eq!(transcript.reasoning(), "hmm");
    }

    #[tokio::test]
    async fn cancellation_keeps_partial_answer() {
        let events = stream::iter(vec![
            Ok(StreamEvent::Segment(Segment::Answer("part".into()))),
            Err(ChatError::cancelled()),
        ]);
        let mut out = Vec::new();
        let mut transcript = Transcript::new();

        let outcome = render(events, &mut out, None::<&mut Vec<u8>>, &mut transcript)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Stopped);
        assert_eq!(transcript.answer(), "part");
    }

    #[tokio::test]
    async fn other_errors_propagate() {
        let events = stream::iter(vec![Err(ChatError::network("Network error"))]);
        let mut out = Vec::new();
        let mut transcript = Transcript::new();

        let err = render(events, &mut out, None::<&mut Vec<u8>>, &mut transcript)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(transcript.is_empty());
    }

    #[tokio::test]
    async fn closed_output_ends_quietly() {
        let events = stream::iter(vec![
            Ok(StreamEvent::Segment(Segment::Answer("lost".into()))),
            Ok(StreamEvent::Segment(Segment::Answer("also lost".into()))),
            Ok(StreamEvent::Done(Termination::Sentinel)),
        ]);
        let mut out = ClosedPipe;
        let mut transcript = Transcript::new();

        let outcome = render(events, &mut out, None::<&mut Vec<u8>>, &mut transcript)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Completed(Termination::Exhausted));
        assert_eq!(transcript.answer(), "lost");

        end_line(&mut out);
    }

    #[test]
    fn end_line_writes_newline() {
        let mut out = b"answer".to_vec();
        end_line(&mut out);
        assert_eq!(out, b"answer\n");
    }
}
