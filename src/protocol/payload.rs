use serde_json::{Map, Value};

/// A decoded backend stream payload.
///
/// Every JSON value the backend can send maps to exactly one variant, in the
/// precedence order the dispatcher relies on.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendPayload {
    /// Plain assistant text (bare JSON string or a `content` field).
    Text(String),
    /// `{ "error": "..." }`, terminal.
    Error(String),
    /// `{ "type": "thinking", "content": "..." }`; the content is not surfaced.
    Thinking,
    /// `{ "type": "tool_use", "tool", "tool_call_id", "args" }`.
    ToolUse {
        tool: String,
        tool_call_id: Option<String>,
        args: Option<Value>,
    },
    /// `{ "type": "tool_result", "tool"?, "tool_call_id"?, "result" }`.
    ToolResult {
        tool: Option<String>,
        tool_call_id: Option<String>,
        result: Value,
    },
    /// `{ "type": "chart", "content": "..." }` with a fenced chart block.
    Chart { content: String },
    /// Valid JSON of no known shape.
    Unrecognized,
}

impl BackendPayload {
    /// Parse a raw `data:` payload.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the payload is not valid JSON.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::from_value(value))
    }

    /// Classify a parsed JSON value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let mut map = match value {
            Value::String(text) => return BackendPayload::Text(text),
            Value::Object(map) => map,
            _ => return BackendPayload::Unrecognized,
        };

        if let Some(Value::String(error)) = map.remove("error") {
            return BackendPayload::Error(error);
        }

        let content = match map.remove("content") {
            Some(Value::String(content)) => Some(content),
            _ => None,
        };
        let kind = take_string(&mut map, "type");

        match (kind.as_deref(), content) {
            (Some("thinking"), Some(_)) => BackendPayload::Thinking,
            (Some("tool_use"), _) => BackendPayload::ToolUse {
                tool: take_string(&mut map, "tool").unwrap_or_default(),
                tool_call_id: take_non_empty_string(&mut map, "tool_call_id"),
                args: map.remove("args").and_then(decode_tool_args),
            },
            (Some("tool_result"), _) => BackendPayload::ToolResult {
                tool: take_non_empty_string(&mut map, "tool"),
                tool_call_id: take_non_empty_string(&mut map, "tool_call_id"),
                result: map.remove("result").unwrap_or(Value::Null),
            },
            (Some("chart"), Some(content)) => BackendPayload::Chart { content },
            (_, Some(content)) if !content.is_empty() => BackendPayload::Text(content),
            _ => BackendPayload::Unrecognized,
        }
    }

    /// Payloads after which nothing else in the stream is processed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, BackendPayload::Error(_))
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn take_non_empty_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    take_string(map, key).filter(|s| !s.is_empty())
}

/// Tool arguments arrive as a JSON-encoded string. Unparseable strings are
/// kept verbatim; already-structured values pass through.
fn decode_tool_args(args: Value) -> Option<Value> {
    match args {
        Value::Null => None,
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(parsed) => Some(parsed),
            Err(_) => Some(Value::String(raw)),
        },
        other => Some(other),
    }
}
