/// SSE framing for the backend chat stream.
///
/// Handles incremental UTF-8 decoding of raw byte fragments, splitting the
/// decoded text into blank-line delimited event blocks, extracting the
/// `data:` payload of a block, and encoding outbound frames.
use memchr::memmem;
use std::sync::LazyLock;

/// Literal payload the backend sends when it has nothing more to say.
pub const DONE_SENTINEL: &str = "[DONE]";

const DONE_FRAME: &str = "data: [DONE]\n\n";

// ---------------------------------------------------------------------------
// FrameDecoder: incremental byte -> event block splitter
// ---------------------------------------------------------------------------

/// Incremental event-block decoder.
///
/// Feed it raw byte fragments (split at arbitrary boundaries, including in
/// the middle of a multi-byte character) and it yields every complete event
/// block. The trailing incomplete block stays buffered until more bytes
/// arrive or [`FrameDecoder::finish`] is called.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
    utf8_tail: Vec<u8>,
    scan_from: usize,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte fragment and return the complete blocks it closed.
    pub fn feed(&mut self, fragment: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        self.feed_into(fragment, &mut out);
        out
    }

    /// Feed one byte fragment and append complete blocks to `out`.
    pub fn feed_into(&mut self, fragment: &[u8], out: &mut Vec<String>) {
        if self.utf8_tail.is_empty() {
            decode_utf8_into(fragment, &mut self.buffer, &mut self.utf8_tail);
        } else {
            let mut joined = std::mem::take(&mut self.utf8_tail);
            joined.extend_from_slice(fragment);
            decode_utf8_into(&joined, &mut self.buffer, &mut self.utf8_tail);
        }
        self.split_blocks_into(out);
    }

    /// Signal end of input.
    ///
    /// Flushes any undecodable tail bytes (lossily) and returns the residual
    /// buffer as one final block when it is non-empty.
    pub fn finish(&mut self) -> Option<String> {
        if !self.utf8_tail.is_empty() {
            let tail = std::mem::take(&mut self.utf8_tail);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        self.scan_from = 0;
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    /// Bytes currently retained for the next fragment.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len() + self.utf8_tail.len()
    }

    fn split_blocks_into(&mut self, out: &mut Vec<String>) {
        let mut consumed = 0usize;
        let mut scan_from = self.scan_from;
        while let Some((start, len)) =
            find_block_terminator_from(&self.buffer.as_bytes()[consumed..], scan_from)
        {
            out.push(self.buffer[consumed..consumed + start].to_owned());
            consumed += start + len;
            scan_from = 0;
        }

        if consumed > 0 {
            self.buffer.drain(..consumed);
        }
        // A terminator may straddle the next fragment, keep a small overlap.
        self.scan_from = self.buffer.len().saturating_sub(3);
    }
}

/// Decode `input` into `out`, stashing an incomplete trailing sequence in
/// `tail`. Invalid sequences in the middle become U+FFFD.
fn decode_utf8_into(mut input: &[u8], out: &mut String, tail: &mut Vec<u8>) {
    loop {
        match std::str::from_utf8(input) {
            Ok(text) => {
                out.push_str(text);
                return;
            }
            Err(err) => {
                let (valid, rest) = input.split_at(err.valid_up_to());
                out.push_str(&String::from_utf8_lossy(valid));
                if let Some(invalid_len) = err.error_len() {
                    out.push(char::REPLACEMENT_CHARACTER);
                    input = &rest[invalid_len..];
                } else {
                    tail.extend_from_slice(rest);
                    return;
                }
            }
        }
    }
}

#[inline]
fn find_block_terminator_from(buffer: &[u8], scan_from: usize) -> Option<(usize, usize)> {
    static LF_LF_FINDER: LazyLock<memmem::Finder<'static>> =
        LazyLock::new(|| memmem::Finder::new(b"\n\n"));
    static CRLF_CRLF_FINDER: LazyLock<memmem::Finder<'static>> =
        LazyLock::new(|| memmem::Finder::new(b"\r\n\r\n"));

    let scan_from = scan_from.min(buffer.len());
    let haystack = &buffer[scan_from..];
    let lf_lf_pos = LF_LF_FINDER.find(haystack).map(|rel| scan_from + rel);
    let crlf_crlf_pos = CRLF_CRLF_FINDER.find(haystack).map(|rel| scan_from + rel);

    match (lf_lf_pos, crlf_crlf_pos) {
        (Some(lf_pos), Some(crlf_pos)) => {
            if lf_pos <= crlf_pos {
                Some((lf_pos, 2))
            } else {
                Some((crlf_pos, 4))
            }
        }
        (Some(lf_pos), None) => Some((lf_pos, 2)),
        (None, Some(crlf_pos)) => Some((crlf_pos, 4)),
        (None, None) => None,
    }
}

// ---------------------------------------------------------------------------
// Event block parsing
// ---------------------------------------------------------------------------

/// Logical payload carried by one event block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    /// The terminal sentinel.
    Done,
    /// Joined `data:` lines, not yet interpreted.
    Data(String),
}

/// Extract the payload of one raw event block.
///
/// Every line starting with `data:` contributes, with exactly one leading
/// space stripped after the prefix; lines are joined with `\n`. Blocks with
/// no `data:` line (keep-alives, comments) yield `None`.
#[must_use]
pub fn parse_event_block(block: &str) -> Option<EventPayload> {
    let mut data: Option<String> = None;
    for line in block.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(joined) => {
                joined.push('\n');
                joined.push_str(value);
            }
            None => data = Some(value.to_owned()),
        }
    }

    let data = data?;
    if is_done_payload(&data) {
        Some(EventPayload::Done)
    } else {
        Some(EventPayload::Data(data))
    }
}

/// Check whether a joined payload is the terminal sentinel.
#[must_use]
pub fn is_done_payload(data: &str) -> bool {
    data.trim() == DONE_SENTINEL
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

/// Format a data-only SSE frame.
#[must_use]
pub fn data_frame(json: &str) -> String {
    let mut out = String::with_capacity(8 + json.len());
    out.push_str("data: ");
    out.push_str(json);
    out.push_str("\n\n");
    out
}

/// The `[DONE]` frame as SSE text.
#[must_use]
pub fn done_frame() -> &'static str {
    DONE_FRAME
}
