//! Line framing for `text/event-stream` bodies.
//!
//! Transport reads carry no alignment guarantee: one read may hold several
//! lines, none, or stop in the middle of a multi-byte character. The framer
//! buffers raw bytes and only decodes once a full line is available.

const DATA_PREFIX: &str = "data:";

/// Payloads that end the stream. `[DONE]` is the OpenAI-style marker; some
/// backends send it without brackets.
const DONE_SENTINELS: [&str; 2] = ["[DONE]", "DONE"];

/// Classification of one event-stream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// `data:` line carrying a payload (normally a JSON object).
    Data(String),
    /// `data:` line carrying the end-of-stream sentinel.
    Done,
    /// Blank line, `event:`/`id:`/`retry:`/comment, or anything else.
    Ignored,
}

/// Classify a single line. Never fails: noise is [`SseLine::Ignored`].
pub fn parse_sse_line(line: &str) -> SseLine {
    let Some(rest) = line.trim().strip_prefix(DATA_PREFIX) else {
        return SseLine::Ignored;
    };
    let payload = rest.strip_prefix(' ').unwrap_or(rest);
    if DONE_SENTINELS.contains(&payload) {
        SseLine::Done
    } else {
        SseLine::Data(payload.to_string())
    }
}

/// Incremental splitter from byte fragments to classified lines.
///
/// Owned by exactly one stream; the trailing partial line is carried over to
/// the next [`LineFramer::push`].
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseLine> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            lines.push(classify_bytes(&self.buf[start..end]));
            start = end + 1;
        }
        self.buf.drain(..start);
        lines
    }

    /// Classify whatever is left once the transport is exhausted. A final
    /// line without a trailing newline still counts.
    pub fn finish(&mut self) -> Option<SseLine> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(classify_bytes(&rest))
    }

}

fn classify_bytes(line: &[u8]) -> SseLine {
    // `trim` in parse_sse_line also drops the `\r` of CRLF framing.
    parse_sse_line(&String::from_utf8_lossy(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_all(chunks: &[&[u8]]) -> Vec<SseLine> {
        let mut framer = LineFramer::new();
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(framer.push(chunk));
        }
        out.extend(framer.finish());
        out
    }

    #[test]
    fn parse_data_line() {
        assert_eq!(
            parse_sse_line("data: {\"x\":1}"),
            SseLine::Data("{\"x\":1}".to_string())
        );
        // no space after the marker
        assert_eq!(parse_sse_line("data:{\"x\":1}"), SseLine::Data("{\"x\":1}".to_string()));
        // only one space is part of the marker
        assert_eq!(parse_sse_line("data:  x"), SseLine::Data(" x".to_string()));
    }

    #[test]
    fn parse_done_sentinels() {
        assert_eq!(parse_sse_line("data: [DONE]"), SseLine::Done);
        assert_eq!(parse_sse_line("data:DONE"), SseLine::Done);
        // case as received
        assert_eq!(parse_sse_line("data: [done]"), SseLine::Data("[done]".to_string()));
    }

    #[test]
    fn parse_non_data_lines() {
        for line in ["", "   ", "event: message", "id: 123", "retry: 1000", ": keep-alive"] {
            assert_eq!(parse_sse_line(line), SseLine::Ignored, "line: {line:?}");
        }
    }

    #[test]
    fn framer_keeps_partial_line() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"data: {\"a\"").is_empty());
        let lines = framer.push(b":1}\ndata: [DO");
        assert_eq!(lines, vec![SseLine::Data("{\"a\":1}".to_string())]);
        let lines = framer.push(b"NE]\n");
        assert_eq!(lines, vec![SseLine::Done]);
        assert!(framer.finish().is_none());
    }

    #[test]
    fn framer_handles_many_lines_per_chunk_and_crlf() {
        let lines = frame_all(&[b"event: message\r\ndata: one\r\n\r\ndata: two\r\n"]);
        assert_eq!(
            lines,
            vec![
                SseLine::Ignored,
                SseLine::Data("one".to_string()),
                SseLine::Ignored,
                SseLine::Data("two".to_string()),
            ]
        );
    }

    #[test]
    fn framer_is_chunk_boundary_independent() {
        let body = "data: {\"result\":{\"output\":{\"content\":\"caf\u{e9} \u{1f600}\"}}}\n\
                    event: ping\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"\u{4f60}\u{597d}\"}}]}\r\n\
                    data: [DONE]"
            .as_bytes();

        let whole = frame_all(&[body]);
        let bytewise: Vec<&[u8]> = body.chunks(1).collect();
        assert_eq!(frame_all(&bytewise), whole);

        for size in [2, 3, 5, 7, 13] {
            let chunks: Vec<&[u8]> = body.chunks(size).collect();
            assert_eq!(frame_all(&chunks), whole, "chunk size {size}");
        }
        assert_eq!(whole.last(), Some(&SseLine::Done));
        assert_eq!(whole.len(), 5);
    }

    #[test]
    fn framer_never_splits_multibyte_characters() {
        let text = "data: \u{601d}\u{8003}\n".as_bytes();
        let mut framer = LineFramer::new();
        // split inside the first 3-byte character
        assert!(framer.push(&text[..7]).is_empty());
        let lines = framer.push(&text[7..]);
        assert_eq!(lines, vec![SseLine::Data("\u{601d}\u{8003}".to_string())]);
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"data: tail").is_empty());
        assert_eq!(framer.finish(), Some(SseLine::Data("tail".to_string())));
        assert!(framer.finish().is_none());
    }
}
