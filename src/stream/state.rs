use crate::protocol::UiChunk;

/// Span bookkeeping for one chat stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamState {
    pub started: bool,
    pub text_open: bool,
    pub reasoning_open: bool,
    pub finished: bool,
}

/// Emits [`UiChunk`]s for one stream while keeping text and reasoning spans
/// balanced.
///
/// Every operation appends to a caller-provided buffer and is a no-op once
/// the stream is finished. The first emitting call also emits `Start`.
#[derive(Debug)]
pub struct ChunkEmitter {
    message_id: String,
    text_id: String,
    reasoning_id: String,
    reasoning_seq: u32,
    state: StreamState,
}

impl ChunkEmitter {
    #[must_use]
    pub fn new(message_id: String) -> Self {
        let text_id = format!("{message_id}-text");
        Self {
            message_id,
            text_id,
            reasoning_id: String::new(),
            reasoning_seq: 0,
            state: StreamState::default(),
        }
    }

    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Emit `Start` if it has not been emitted yet.
    pub fn start(&mut self, out: &mut Vec<UiChunk>) {
        if self.state.started || self.state.finished {
            return;
        }
        self.state.started = true;
        out.push(UiChunk::Start {
            message_id: self.message_id.clone(),
        });
    }

    /// Append text, opening the text span first when needed.
    pub fn text_delta(&mut self, delta: String, out: &mut Vec<UiChunk>) {
        if self.state.finished || delta.is_empty() {
            return;
        }
        self.start(out);
        if !self.state.text_open {
            self.state.text_open = true;
            out.push(UiChunk::TextStart {
                id: self.text_id.clone(),
            });
        }
        out.push(UiChunk::TextDelta {
            id: self.text_id.clone(),
            delta,
        });
    }

    /// Append reasoning, opening a reasoning span first when needed.
    pub fn reasoning_delta(&mut self, delta: String, out: &mut Vec<UiChunk>) {
        if self.state.finished {
            return;
        }
        self.start(out);
        if !self.state.reasoning_open {
            self.reasoning_seq += 1;
            self.reasoning_id = format!("{}-reasoning-{}", self.message_id, self.reasoning_seq);
            self.state.reasoning_open = true;
            out.push(UiChunk::ReasoningStart {
                id: self.reasoning_id.clone(),
            });
        }
        out.push(UiChunk::ReasoningDelta {
            id: self.reasoning_id.clone(),
            delta,
        });
    }

    /// Close the reasoning span if one is open.
    pub fn close_reasoning(&mut self, out: &mut Vec<UiChunk>) {
        if !self.state.reasoning_open {
            return;
        }
        self.state.reasoning_open = false;
        out.push(UiChunk::ReasoningEnd {
            id: self.reasoning_id.clone(),
        });
    }

    fn close_text(&mut self, out: &mut Vec<UiChunk>) {
        if !self.state.text_open {
            return;
        }
        self.state.text_open = false;
        out.push(UiChunk::TextEnd {
            id: self.text_id.clone(),
        });
    }

    /// Emit a standalone chunk (tool result, chart, error).
    pub fn push(&mut self, chunk: UiChunk, out: &mut Vec<UiChunk>) {
        if self.state.finished {
            return;
        }
        self.start(out);
        out.push(chunk);
    }

    /// Close open spans (reasoning first), emit `Finish`, and seal the stream.
    ///
    /// Idempotent.
    pub fn finish(&mut self, out: &mut Vec<UiChunk>) {
        if self.state.finished {
            return;
        }
        self.start(out);
        self.close_reasoning(out);
        self.close_text(out);
        out.push(UiChunk::Finish);
        self.state.finished = true;
    }

    /// Close open spans without `Finish` and seal the stream.
    ///
    /// Used when the input fails; the caller surfaces the error itself.
    pub fn abort(&mut self, out: &mut Vec<UiChunk>) {
        if self.state.finished {
            return;
        }
        self.start(out);
        self.close_reasoning(out);
        self.close_text(out);
        self.state.finished = true;
    }
}
