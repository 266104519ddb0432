//! Streaming pipeline: SSE framing, payload dispatch and span bookkeeping.

pub mod adapter;
pub mod dispatch;
pub mod sse;
pub mod state;

pub use adapter::{chunk_stream, chunk_stream_with_id};
pub use dispatch::{Flow, PayloadDispatcher, THINKING_INDICATOR};
pub use sse::{data_frame, done_frame, parse_event_block, EventPayload, FrameDecoder};
pub use state::{ChunkEmitter, StreamState};
