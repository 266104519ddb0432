use serde::Serialize;
use serde_json::Value;

use crate::protocol::chart::ChartSpec;

/// One unit of the adapter's typed output stream.
///
/// Serialized as a JSON object tagged by `type` (kebab-case) with camelCase
/// fields, which is the shape the chat UI consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiChunk {
    #[serde(rename_all = "camelCase")]
    Start { message_id: String },
    TextStart { id: String },
    TextDelta { id: String, delta: String },
    TextEnd { id: String },
    ReasoningStart { id: String },
    ReasoningDelta { id: String, delta: String },
    ReasoningEnd { id: String },
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        args: Value,
        result: Value,
    },
    Chart { id: String, spec: ChartSpec },
    Error {
        #[serde(rename = "errorText")]
        text: String,
    },
    Finish,
}

impl UiChunk {
    /// Stable kind name, matching the serialized `type` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            UiChunk::Start { .. } => "start",
            UiChunk::TextStart { .. } => "text-start",
            UiChunk::TextDelta { .. } => "text-delta",
            UiChunk::TextEnd { .. } => "text-end",
            UiChunk::ReasoningStart { .. } => "reasoning-start",
            UiChunk::ReasoningDelta { .. } => "reasoning-delta",
            UiChunk::ReasoningEnd { .. } => "reasoning-end",
            UiChunk::ToolResult { .. } => "tool-result",
            UiChunk::Chart { .. } => "chart",
            UiChunk::Error { .. } => "error",
            UiChunk::Finish => "finish",
        }
    }

    #[must_use]
    pub fn is_finish(&self) -> bool {
        matches!(self, UiChunk::Finish)
    }

    /// Serialize to a compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns the underlying serializer error; only non-string map keys in
    /// pass-through JSON values could trigger one.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
