pub mod chart;
pub mod chunk;
pub mod labels;
pub mod outbound;
pub mod payload;
pub mod tool_context;

pub use chart::{extract_chart, ChartError, ChartSpec};
pub use chunk::UiChunk;
pub use labels::tool_label;
pub use outbound::{convert_messages, BackendChatRequest, BackendMessage, UiMessage};
pub use payload::BackendPayload;
pub use tool_context::{ToolContext, ToolContextStore};
