use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::BridgeError;
use crate::protocol::{convert_messages, BackendChatRequest, UiChunk, UiMessage};
use crate::state::AppState;
use crate::stream::{chunk_stream, data_frame, done_frame};

/// Header the AI SDK client checks before reading a UI message stream.
pub const UI_MESSAGE_STREAM_HEADER: &str = "x-vercel-ai-ui-message-stream";

/// Body of `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub messages: Vec<UiMessage>,
}

/// Chat handler: forwards the conversation to the backend and streams the
/// adapted chunks back as SSE.
pub async fn handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request_seq = state.next_request_seq();
    match handle(&state, &body).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(request_seq, "chat request failed: {err}");
            err.into_response()
        }
    }
}

async fn handle(state: &AppState, body: &[u8]) -> Result<Response, BridgeError> {
    let request = parse_chat_request(body)?;
    let messages = convert_messages(&request.messages);
    if messages.is_empty() {
        return Err(BridgeError::InvalidRequest(
            "conversation has no user or assistant text".to_string(),
        ));
    }
    tracing::debug!(
        received = request.messages.len(),
        forwarded = messages.len(),
        "converted chat history"
    );

    let backend_stream = state
        .backend
        .open_chat_stream(&BackendChatRequest { messages })
        .await?;
    let chunks = chunk_stream(backend_stream);
    let body = Body::from_stream(sse_body(chunks, state.config.features.emit_done_sentinel));
    Ok(sse_ok_response(body))
}

/// Parse the request body.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidRequest`] for malformed JSON or a missing
/// `messages` array.
pub fn parse_chat_request(body: &[u8]) -> Result<ChatRequestBody, BridgeError> {
    serde_json::from_slice(body)
        .map_err(|err| BridgeError::InvalidRequest(format!("Invalid JSON body: {err}")))
}

/// Encode a chunk stream as SSE frames.
///
/// The `[DONE]` frame is appended to the `Finish` frame when enabled. A
/// failed item is passed through as an error so the body terminates
/// abnormally.
pub fn sse_body<S>(chunks: S, emit_done_sentinel: bool) -> impl Stream<Item = Result<Bytes, BridgeError>> + Send
where
    S: Stream<Item = Result<UiChunk, BridgeError>> + Send,
{
    chunks.map(move |item| {
        let chunk = item?;
        let json = chunk
            .to_json()
            .map_err(|err| BridgeError::Internal(format!("failed to encode chunk: {err}")))?;
        let mut frame = data_frame(&json);
        if emit_done_sentinel && chunk.is_finish() {
            frame.push_str(done_frame());
        }
        Ok(Bytes::from(frame))
    })
}

fn sse_ok_response(body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = http::StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-cache"),
    );
    headers.insert(
        http::header::CONNECTION,
        http::HeaderValue::from_static("keep-alive"),
    );
    headers.insert(
        UI_MESSAGE_STREAM_HEADER,
        http::HeaderValue::from_static("v1"),
    );
    response
}
