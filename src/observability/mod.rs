use std::fmt;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (DEBUG, INFO, ERROR)
pub fn init_tracing(log_level: &str) {
    let Some(filter) = env_filter_for(log_level) else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn tracing_level_for(log_level: &str) -> Option<String> {
    let level = log_level.to_uppercase();
    match level.as_str() {
        "DISABLED" => None,
        "WARNING" => Some("WARN".to_string()),
        "CRITICAL" => Some("ERROR".to_string()),
        _ => Some(level),
    }
}

fn env_filter_for(log_level: &str) -> Option<EnvFilter> {
    let level = tracing_level_for(log_level)?;
    Some(EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("INFO")))
}

/// How a chat stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Sentinel, error payload, or end of input.
    Finished,
    /// The backend byte stream failed mid-read.
    Failed,
    /// The consumer dropped the chunk stream early.
    Cancelled,
}

impl fmt::Display for StreamOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamOutcome::Finished => write!(f, "finished"),
            StreamOutcome::Failed => write!(f, "failed"),
            StreamOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Log the end of one chat stream.
pub fn log_stream_complete(
    message_id: &str,
    chunks: usize,
    outcome: StreamOutcome,
    elapsed: Duration,
) {
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    match outcome {
        StreamOutcome::Failed => tracing::warn!(
            message_id,
            chunks,
            elapsed_ms,
            "chat stream {outcome}"
        ),
        StreamOutcome::Finished | StreamOutcome::Cancelled => tracing::info!(
            message_id,
            chunks,
            elapsed_ms,
            "chat stream {outcome}"
        ),
    }
}
