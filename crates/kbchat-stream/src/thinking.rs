use crate::stream::Segment;

pub const THINK_START: &str = "<think>";
pub const THINK_END: &str = "</think>";

/// Whether the splitter is currently inside a `<think>` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitterState {
    #[default]
    Answering,
    Reasoning,
}

/// Splits text increments into reasoning and answer segments.
///
/// State carries over between calls so a block opened in one increment and
/// closed several increments later is attributed correctly. Each stream
/// owns a fresh splitter.
///
/// Delimiters are expected to arrive whole within one increment; a tag split
/// across two increments is not reassembled.
#[derive(Debug, Default)]
pub struct TagSplitter {
    state: SplitterState,
}

impl TagSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SplitterState {
        self.state
    }

    pub fn in_reasoning(&self) -> bool {
        self.state == SplitterState::Reasoning
    }

    /// Split one increment, advancing the state.
    ///
    /// - While answering, `<think>` switches to reasoning. A stray `</think>`
    ///   is kept as ordinary answer text.
    /// - While reasoning, `</think>` switches back. A repeated `<think>` is
    ///   dropped without changing state.
    pub fn split(&mut self, increment: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut rest = increment;

        loop {
            match self.state {
                SplitterState::Answering => match rest.split_once(THINK_START) {
                    Some((before, after)) => {
                        push_answer(&mut segments, before);
                        self.state = SplitterState::Reasoning;
                        rest = after;
                    }
                    None => {
                        push_answer(&mut segments, rest);
                        break;
                    }
                },
                SplitterState::Reasoning => match rest.split_once(THINK_END) {
                    Some((before, after)) => {
                        push_reasoning(&mut segments, before);
                        self.state = SplitterState::Answering;
                        rest = after;
                    }
                    None => {
                        push_reasoning(&mut segments, rest);
                        break;
                    }
                },
            }
        }

        segments
    }

    /// Back to [`SplitterState::Answering`] for a new stream.
    pub fn reset(&mut self) {
        self.state = SplitterState::Answering;
    }
}

fn push_answer(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Answer(text.to_string()));
    }
}

fn push_reasoning(segments: &mut Vec<Segment>, text: &str) {
    let text = if text.contains(THINK_START) {
        text.replace(THINK_START, "")
    } else {
        text.to_string()
    };
    if !text.is_empty() {
        segments.push(Segment::Reasoning(text));
    }
}
