use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a conversation turn as the UI stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiRole {
    System,
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// One content part of a UI turn.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiPart {
    /// Finalized text.
    Text { text: String },
    /// Text still being streamed in.
    TextDelta { delta: String },
    #[serde(other)]
    Other,
}

impl UiPart {
    fn text(&self) -> Option<&str> {
        match self {
            UiPart::Text { text } => Some(text),
            UiPart::TextDelta { delta } => Some(delta),
            UiPart::Other => None,
        }
    }
}

/// Auxiliary block attached to a turn, forwarded to the backend untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Value,
}

/// One conversation turn as held by the UI.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UiMessage {
    pub role: UiRole,
    #[serde(default)]
    pub parts: Vec<UiPart>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub blocks: Option<Vec<MessageBlock>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendRole {
    User,
    Assistant,
}

/// Outbound message in the backend's request shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendMessage {
    pub role: BackendRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<MessageBlock>>,
}

/// Request body posted to the chat backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendChatRequest {
    pub messages: Vec<BackendMessage>,
}

/// Convert UI conversation history into backend messages.
///
/// Only user and assistant turns survive. Text parts are concatenated in
/// order, with the raw `content` string as fallback when no part carries
/// text; the result is trimmed and empty turns are dropped.
#[must_use]
pub fn convert_messages(history: &[UiMessage]) -> Vec<BackendMessage> {
    history.iter().filter_map(convert_message).collect()
}

fn convert_message(message: &UiMessage) -> Option<BackendMessage> {
    let role = match message.role {
        UiRole::User => BackendRole::User,
        UiRole::Assistant => BackendRole::Assistant,
        UiRole::System | UiRole::Other => return None,
    };

    let mut text = String::new();
    let mut has_text_part = false;
    for part in &message.parts {
        if let Some(fragment) = part.text() {
            has_text_part = true;
            text.push_str(fragment);
        }
    }
    if !has_text_part {
        if let Some(content) = message.content.as_deref() {
            text.push_str(content);
        }
    }

    let content = text.trim();
    if content.is_empty() {
        return None;
    }

    Some(BackendMessage {
        role,
        content: content.to_owned(),
        blocks: message.blocks.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn history(value: Value) -> Vec<UiMessage> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_concatenates_text_parts_in_order() {
        let messages = history(json!([{
            "role": "assistant",
            "parts": [
                {"type": "text", "text": "Hello "},
                {"type": "reasoning", "text": "ignored"},
                {"type": "text-delta", "delta": "world"}
            ]
        }]));
        let converted = convert_messages(&messages);
        assert_eq!(
            converted,
            vec![BackendMessage {
                role: BackendRole::Assistant,
                content: "Hello world".to_string(),
                blocks: None,
            }]
        );
    }

    #[test]
    fn test_filters_system_and_unknown_roles() {
        let messages = history(json!([
            {"role": "system", "parts": [{"type": "text", "text": "be nice"}]},
            {"role": "tool", "content": "x"},
            {"role": "user", "parts": [{"type": "text", "text": "hi"}]}
        ]));
        let converted = convert_messages(&messages);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].role, BackendRole::User);
    }

    #[test]
    fn test_drops_whitespace_only_turns() {
        let messages = history(json!([
            {"role": "user", "parts": [{"type": "text", "text": "   \n"}]},
            {"role": "assistant", "parts": []}
        ]));
        assert!(convert_messages(&messages).is_empty());
    }

    #[test]
    fn test_content_fallback_when_no_text_parts() {
        let messages = history(json!([
            {"role": "user", "content": "  from content  ", "parts": [{"type": "file"}]}
        ]));
        assert_eq!(convert_messages(&messages)[0].content, "from content");
    }

    #[test]
    fn test_parts_win_over_content() {
        let messages = history(json!([
            {"role": "user", "content": "stale", "parts": [{"type": "text", "text": "fresh"}]}
        ]));
        assert_eq!(convert_messages(&messages)[0].content, "fresh");
    }

    #[test]
    fn test_blocks_pass_through_and_serialize() {
        let messages = history(json!([{
            "role": "assistant",
            "parts": [{"type": "text", "text": "see chart"}],
            "blocks": [{"type": "chart", "content": {"kind": "bar"}}]
        }]));
        let converted = convert_messages(&messages);
        assert_eq!(
            serde_json::to_value(BackendChatRequest {
                messages: converted
            })
            .unwrap(),
            json!({"messages": [{
                "role": "assistant",
                "content": "see chart",
                "blocks": [{"type": "chart", "content": {"kind": "bar"}}]
            }]})
        );
    }
}
