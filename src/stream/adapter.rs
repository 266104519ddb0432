//! Backend byte stream -> [`UiChunk`] stream.
//!
//! The adapter is pull-driven: the input is only read when the consumer polls
//! and every chunk produced by the previous read has been handed out. The
//! input stream is owned by the adapter and dropped as soon as the stream
//! reaches a terminal state (sentinel, error payload, read failure, end of
//! input) or when the consumer drops the output stream.

use std::pin::Pin;
use std::time::Instant;

use futures_util::{Stream, StreamExt};
use smallvec::SmallVec;

use crate::error::BridgeError;
use crate::observability::{log_stream_complete, StreamOutcome};
use crate::protocol::UiChunk;
use crate::stream::dispatch::{Flow, PayloadDispatcher};
use crate::stream::sse::{parse_event_block, FrameDecoder};
use crate::util::next_message_id;

struct PendingChunks {
    chunks: SmallVec<[Option<UiChunk>; 8]>,
    head: usize,
}

impl PendingChunks {
    #[inline]
    fn new() -> Self {
        Self {
            chunks: SmallVec::new(),
            head: 0,
        }
    }

    #[inline]
    fn pop_front(&mut self) -> Option<UiChunk> {
        if self.head >= self.chunks.len() {
            return None;
        }
        let chunk = self.chunks[self.head].take();
        self.head += 1;
        if self.head == self.chunks.len() {
            self.chunks.clear();
            self.head = 0;
        }
        chunk
    }

    #[inline]
    fn extend_from_vec(&mut self, produced: &mut Vec<UiChunk>) {
        if produced.is_empty() {
            return;
        }
        self.chunks.reserve(produced.len());
        self.chunks.extend(produced.drain(..).map(Some));
    }
}

type BoxedInput<S> = Pin<Box<S>>;

struct AdapterState<S> {
    input: Option<BoxedInput<S>>,
    decoder: FrameDecoder,
    dispatcher: PayloadDispatcher,
    blocks: Vec<String>,
    produced: Vec<UiChunk>,
    pending: PendingChunks,
    failure: Option<BridgeError>,
    started_at: Instant,
    emitted: usize,
}

impl<S> AdapterState<S> {
    fn new(input: S, message_id: String) -> Self {
        let mut state = Self {
            input: Some(Box::pin(input)),
            decoder: FrameDecoder::new(),
            dispatcher: PayloadDispatcher::new(message_id),
            blocks: Vec::with_capacity(4),
            produced: Vec::with_capacity(8),
            pending: PendingChunks::new(),
            failure: None,
            started_at: Instant::now(),
            emitted: 0,
        };
        state.dispatcher.begin(&mut state.produced);
        state.pending.extend_from_vec(&mut state.produced);
        state
    }

    /// Run every decoded block through the dispatcher, stopping at the first
    /// terminal payload.
    fn process_blocks(&mut self) {
        for block in self.blocks.drain(..) {
            let Some(event) = parse_event_block(&block) else {
                continue;
            };
            if self.dispatcher.dispatch_event(event, &mut self.produced) == Flow::Finished {
                break;
            }
        }
        self.blocks.clear();
        self.pending.extend_from_vec(&mut self.produced);
        if self.dispatcher.is_finished() {
            self.release(StreamOutcome::Finished);
        }
    }

    fn on_fragment(&mut self, fragment: &[u8]) {
        self.decoder.feed_into(fragment, &mut self.blocks);
        self.process_blocks();
    }

    fn on_end_of_input(&mut self) {
        if let Some(block) = self.decoder.finish() {
            self.blocks.push(block);
        }
        self.process_blocks();
        if !self.dispatcher.is_finished() {
            tracing::debug!(
                message_id = %self.dispatcher.message_id(),
                "backend stream ended without sentinel"
            );
            self.dispatcher.finish(&mut self.produced);
            self.pending.extend_from_vec(&mut self.produced);
        }
        self.release(StreamOutcome::Finished);
    }

    fn on_read_error(&mut self, message: String) {
        self.dispatcher.abort(&mut self.produced);
        self.pending.extend_from_vec(&mut self.produced);
        self.failure = Some(BridgeError::Stream(message));
        self.release(StreamOutcome::Failed);
    }

    /// Drop the input. Only the first call logs.
    fn release(&mut self, outcome: StreamOutcome) {
        if self.input.take().is_some() {
            log_stream_complete(
                self.dispatcher.message_id(),
                self.emitted + self.pending_len(),
                outcome,
                self.started_at.elapsed(),
            );
        }
    }

    fn pending_len(&self) -> usize {
        self.pending.chunks.len() - self.pending.head
    }
}

impl<S> Drop for AdapterState<S> {
    fn drop(&mut self) {
        self.release(StreamOutcome::Cancelled);
    }
}

/// Adapt a backend byte stream into a stream of UI chunks.
///
/// Yields `Ok` chunks in protocol order. When the input stream fails the
/// open spans are closed and the final item is `Err(BridgeError::Stream)`
/// instead of a `Finish` chunk.
pub fn chunk_stream<S, B, E>(input: S) -> impl Stream<Item = Result<UiChunk, BridgeError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    chunk_stream_with_id(input, next_message_id())
}

/// Same as [`chunk_stream`] with a caller-chosen message identifier.
pub fn chunk_stream_with_id<S, B, E>(
    input: S,
    message_id: String,
) -> impl Stream<Item = Result<UiChunk, BridgeError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    futures_util::stream::unfold(
        AdapterState::new(input, message_id),
        |mut state| async move {
            loop {
                if let Some(chunk) = state.pending.pop_front() {
                    state.emitted += 1;
                    return Some((Ok(chunk), state));
                }
                if let Some(err) = state.failure.take() {
                    return Some((Err(err), state));
                }

                let next = match state.input.as_mut() {
                    Some(input) => input.next().await,
                    None => return None,
                };
                match next {
                    Some(Ok(fragment)) => state.on_fragment(fragment.as_ref()),
                    Some(Err(err)) => {
                        tracing::warn!(
                            message_id = %state.dispatcher.message_id(),
                            "backend stream read failed: {err}"
                        );
                        state.on_read_error(err.to_string());
                    }
                    None => state.on_end_of_input(),
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    type Fragment = Result<Bytes, std::io::Error>;

    async fn collect(fragments: Vec<Fragment>) -> Vec<Result<UiChunk, BridgeError>> {
        chunk_stream_with_id(futures_util::stream::iter(fragments), "m".to_string())
            .collect()
            .await
    }

    fn ok(text: &'static str) -> Fragment {
        Ok(Bytes::from_static(text.as_bytes()))
    }

    #[tokio::test]
    async fn test_empty_input_still_starts_and_finishes() {
        let items = collect(Vec::new()).await;
        let kinds: Vec<&str> = items.iter().map(|i| i.as_ref().unwrap().kind()).collect();
        assert_eq!(kinds, vec!["start", "finish"]);
    }

    #[tokio::test]
    async fn test_trailing_block_without_terminator_is_processed() {
        let items = collect(vec![ok("data: {\"content\":\"tail\"}")]).await;
        let kinds: Vec<&str> = items.iter().map(|i| i.as_ref().unwrap().kind()).collect();
        assert_eq!(
            kinds,
            vec!["start", "text-start", "text-delta", "text-end", "finish"]
        );
    }

    #[tokio::test]
    async fn test_read_error_closes_spans_and_fails() {
        let items = collect(vec![
            ok("data: {\"type\":\"thinking\",\"content\":\"x\"}\n\n"),
            ok("data: {\"content\":\"partial\"}\n\n"),
            Err(std::io::Error::other("connection reset")),
            ok("data: {\"content\":\"never\"}\n\n"),
        ])
        .await;
        let (last, chunks) = items.split_last().unwrap();
        let kinds: Vec<&str> = chunks.iter().map(|i| i.as_ref().unwrap().kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "start",
                "reasoning-start",
                "reasoning-delta",
                "text-start",
                "text-delta",
                "reasoning-end",
                "text-end"
            ]
        );
        match last {
            Err(BridgeError::Stream(message)) => assert!(message.contains("connection reset")),
            other => panic!("expected stream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_input_not_read_past_sentinel() {
        let reads = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = std::sync::Arc::clone(&reads);
        let input = futures_util::stream::iter(vec![
            ok("data: [DONE]\n\n"),
            ok("data: {\"content\":\"late\"}\n\n"),
        ])
        .inspect(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        let items: Vec<_> = chunk_stream_with_id(input, "m".to_string()).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(reads.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    /// Input wrapper that records when the adapter drops it.
    struct DropFlag<S> {
        inner: S,
        dropped: Arc<AtomicBool>,
    }

    impl<S: Stream + Unpin> Stream for DropFlag<S> {
        type Item = S::Item;

        fn poll_next(
            mut self: Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Option<Self::Item>> {
            self.inner.poll_next_unpin(cx)
        }
    }

    impl<S> Drop for DropFlag<S> {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    /// The fragments, then an input that never yields again.
    fn stalled(
        fragments: Vec<Fragment>,
    ) -> (impl Stream<Item = Fragment> + Send + Unpin, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        let inner = futures_util::stream::iter(fragments).chain(futures_util::stream::pending());
        (
            DropFlag {
                inner,
                dropped: Arc::clone(&dropped),
            },
            dropped,
        )
    }

    fn kind_of(item: Option<Result<UiChunk, BridgeError>>) -> &'static str {
        item.expect("stream ended early")
            .expect("unexpected stream error")
            .kind()
    }

    #[tokio::test]
    async fn test_input_released_when_consumer_cancels_mid_read() {
        let (input, dropped) = stalled(vec![ok("data: {\"content\":\"a\"}\n\n")]);
        let mut out = Box::pin(chunk_stream_with_id(input, "m".to_string()));
        assert_eq!(kind_of(out.next().await), "start");
        assert_eq!(kind_of(out.next().await), "text-start");
        assert_eq!(kind_of(out.next().await), "text-delta");

        let blocked = tokio::time::timeout(Duration::from_millis(20), out.next()).await;
        assert!(blocked.is_err());
        assert!(!dropped.load(Ordering::SeqCst));

        drop(out);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_input_released_at_terminal_payload_before_drain() {
        for terminal in ["data: [DONE]\n\n", "data: {\"error\":\"boom\"}\n\n"] {
            let body = format!(
                "data: {{\"content\":\"a\"}}\n\n{terminal}data: {{\"content\":\"late\"}}\n\n"
            );
            let (input, dropped) = stalled(vec![Ok(Bytes::from(body))]);
            let mut out = Box::pin(chunk_stream_with_id(input, "m".to_string()));
            assert_eq!(kind_of(out.next().await), "start");
            assert!(!dropped.load(Ordering::SeqCst), "{terminal}");

            assert_eq!(kind_of(out.next().await), "text-start");
            assert!(dropped.load(Ordering::SeqCst), "{terminal}");

            let mut rest = Vec::new();
            while let Some(item) = out.next().await {
                rest.push(item.unwrap().kind());
            }
            assert!(rest.len() >= 3, "{terminal}: {rest:?}");
            assert_eq!(rest.last(), Some(&"finish"), "{terminal}");
            assert_eq!(
                rest.iter().filter(|kind| **kind == "text-delta").count(),
                1,
                "{terminal}"
            );
        }
    }

    #[tokio::test]
    async fn test_input_released_on_read_error() {
        let (input, dropped) = stalled(vec![
            ok("data: {\"content\":\"a\"}\n\n"),
            Err(std::io::Error::other("reset")),
        ]);
        let mut out = Box::pin(chunk_stream_with_id(input, "m".to_string()));
        let mut last = None;
        while let Some(item) = out.next().await {
            last = Some(item);
        }
        assert!(matches!(last, Some(Err(BridgeError::Stream(_)))));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_input_released_at_end_of_input() {
        let dropped = Arc::new(AtomicBool::new(false));
        let input = DropFlag {
            inner: futures_util::stream::iter(vec![ok("data: {\"content\":\"a\"}")]),
            dropped: Arc::clone(&dropped),
        };
        let mut out = Box::pin(chunk_stream_with_id(input, "m".to_string()));
        let mut kinds = Vec::new();
        while let Some(item) = out.next().await {
            kinds.push(item.unwrap().kind());
        }
        assert_eq!(kinds.last(), Some(&"finish"));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_pending_chunks_fifo() {
        let mut pending = PendingChunks::new();
        let mut produced = vec![UiChunk::Finish, UiChunk::TextEnd { id: "t".to_string() }];
        pending.extend_from_vec(&mut produced);
        assert!(produced.is_empty());
        assert_eq!(pending.pop_front(), Some(UiChunk::Finish));
        assert_eq!(pending.pop_front().map(|c| c.kind()), Some("text-end"));
        assert_eq!(pending.pop_front(), None);
    }
}
