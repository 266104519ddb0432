use serde_json::Value;

use crate::protocol::{
    extract_chart, tool_label, BackendPayload, ToolContext, ToolContextStore, UiChunk,
};
use crate::stream::sse::EventPayload;
use crate::stream::state::ChunkEmitter;
use crate::util::next_chart_id;

/// Reasoning delta shown while the backend is thinking.
pub const THINKING_INDICATOR: &str = "Thinking...";

/// Whether the block loop should keep feeding payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Finished,
}

/// Applies decoded backend payloads to the chunk emitter.
#[derive(Debug)]
pub struct PayloadDispatcher {
    emitter: ChunkEmitter,
    tools: ToolContextStore,
}

impl PayloadDispatcher {
    #[must_use]
    pub fn new(message_id: String) -> Self {
        Self {
            emitter: ChunkEmitter::new(message_id),
            tools: ToolContextStore::new(),
        }
    }

    #[must_use]
    pub fn message_id(&self) -> &str {
        self.emitter.message_id()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.emitter.is_finished()
    }

    pub fn begin(&mut self, out: &mut Vec<UiChunk>) {
        self.emitter.start(out);
    }

    pub fn finish(&mut self, out: &mut Vec<UiChunk>) {
        self.emitter.finish(out);
    }

    pub fn abort(&mut self, out: &mut Vec<UiChunk>) {
        self.emitter.abort(out);
    }

    /// Handle one parsed event block payload.
    ///
    /// Malformed JSON is logged and skipped.
    pub fn dispatch_event(&mut self, event: EventPayload, out: &mut Vec<UiChunk>) -> Flow {
        if self.is_finished() {
            return Flow::Finished;
        }
        match event {
            EventPayload::Done => {
                self.emitter.finish(out);
                Flow::Finished
            }
            EventPayload::Data(raw) => match BackendPayload::from_json_str(&raw) {
                Ok(payload) => self.dispatch(payload, out),
                Err(err) => {
                    tracing::warn!(
                        message_id = %self.emitter.message_id(),
                        "skipping malformed stream payload: {err}"
                    );
                    Flow::Continue
                }
            },
        }
    }

    /// Apply one decoded payload.
    pub fn dispatch(&mut self, payload: BackendPayload, out: &mut Vec<UiChunk>) -> Flow {
        if self.is_finished() {
            return Flow::Finished;
        }
        let terminal = payload.is_terminal();
        match payload {
            BackendPayload::Text(text) => {
                self.emitter.text_delta(text, out);
            }
            BackendPayload::Error(text) => {
                tracing::warn!(
                    message_id = %self.emitter.message_id(),
                    "backend reported an error: {text}"
                );
                self.emitter.push(UiChunk::Error { text }, out);
            }
            BackendPayload::Thinking => {
                self.emitter
                    .reasoning_delta(THINKING_INDICATOR.to_owned(), out);
            }
            BackendPayload::ToolUse {
                tool,
                tool_call_id,
                args,
            } => {
                let label = tool_label(&tool);
                tracing::debug!(tool = %tool, "tool invocation");
                self.tools.set(ToolContext {
                    tool_name: tool,
                    tool_call_id,
                    args,
                });
                self.emitter.reasoning_delta(label, out);
            }
            BackendPayload::ToolResult {
                tool,
                tool_call_id,
                result,
            } => {
                let context = self.tools.consume();
                let (context_name, context_call_id, args) = match context {
                    Some(ctx) => (Some(ctx.tool_name), ctx.tool_call_id, ctx.args),
                    None => (None, None, None),
                };
                self.emitter.push(
                    UiChunk::ToolResult {
                        tool_call_id: tool_call_id.or(context_call_id).unwrap_or_default(),
                        tool_name: tool.or(context_name).unwrap_or_default(),
                        args: args.unwrap_or(Value::Null),
                        result,
                    },
                    out,
                );
                self.emitter.close_reasoning(out);
            }
            BackendPayload::Chart { content } => match extract_chart(&content) {
                Ok(spec) => {
                    self.emitter.push(
                        UiChunk::Chart {
                            id: next_chart_id(),
                            spec,
                        },
                        out,
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        message_id = %self.emitter.message_id(),
                        "skipping chart payload: {err}"
                    );
                }
            },
            BackendPayload::Unrecognized => {}
        }
        if terminal {
            self.emitter.finish(out);
            return Flow::Finished;
        }
        Flow::Continue
    }
}
