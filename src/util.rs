#[inline]
pub(crate) fn random_uuid() -> uuid::Uuid {
    uuid::Uuid::from_u128(fastrand::u128(..))
}

/// Fresh message identifier, generated once per chat stream.
pub(crate) fn next_message_id() -> String {
    let mut out = String::with_capacity(36);
    out.push_str("msg_");
    out.push_str(random_uuid().simple().encode_lower(&mut uuid::Uuid::encode_buffer()));
    out
}

pub(crate) fn next_chart_id() -> String {
    let mut out = String::with_capacity(38);
    out.push_str("chart_");
    out.push_str(random_uuid().simple().encode_lower(&mut uuid::Uuid::encode_buffer()));
    out
}

#[inline]
pub(crate) fn sanitize_backend_error(body: &[u8]) -> String {
    const MAX_LEN: usize = 512;
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "backend returned an empty error body".to_string();
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        let error = value.get("error");
        let message = [
            error.and_then(|e| e.get("message")),
            error,
            value.get("detail"),
            value.get("message"),
        ]
        .into_iter()
        .flatten()
        .find_map(serde_json::Value::as_str);
        if let Some(message) = message {
            return truncate_chars(message, MAX_LEN);
        }
    }
    truncate_chars(text, MAX_LEN)
}

fn truncate_chars(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}
