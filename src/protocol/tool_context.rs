use serde_json::Value;

/// A pending tool invocation, waiting for its result.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolContext {
    pub tool_name: String,
    pub tool_call_id: Option<String>,
    pub args: Option<Value>,
}

/// Single-slot store correlating a tool invocation with its later result.
///
/// Only one invocation is tracked at a time; `set` overwrites whatever is
/// still unconsumed.
#[derive(Debug, Default)]
pub struct ToolContextStore {
    slot: Option<ToolContext>,
}

impl ToolContextStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, context: ToolContext) {
        let incoming = context.tool_name.clone();
        if let Some(previous) = self.slot.replace(context) {
            tracing::debug!(
                previous = %previous.tool_name,
                incoming = %incoming,
                "tool context overwritten before its result arrived"
            );
        }
    }

    /// Take the stored context, leaving the slot empty.
    pub fn consume(&mut self) -> Option<ToolContext> {
        self.slot.take()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
