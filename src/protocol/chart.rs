use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

static CHART_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```chart\b(.*?)```").ok());

/// Chart spec emitted to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub chart_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_key: Option<String>,
    pub show_legend: bool,
    pub show_grid: bool,
}

/// Body of a fenced `chart` block as the backend writes it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartBlockWire {
    kind: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    data: Value,
    #[serde(default)]
    series: Option<Value>,
    #[serde(default)]
    x_key: Option<String>,
    #[serde(default)]
    show_legend: Option<bool>,
    #[serde(default)]
    show_grid: Option<bool>,
}

impl From<ChartBlockWire> for ChartSpec {
    fn from(wire: ChartBlockWire) -> Self {
        Self {
            chart_type: wire.kind,
            title: wire.title,
            description: wire.description,
            data: wire.data,
            series: wire.series,
            x_key: wire.x_key,
            show_legend: wire.show_legend.unwrap_or(true),
            show_grid: wire.show_grid.unwrap_or(true),
        }
    }
}

/// Why a chart payload produced no chart.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("no ```chart fenced block in content")]
    MissingBlock,
    #[error("invalid chart JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Locate the first fenced `chart` block in `content` and decode its body.
///
/// # Errors
///
/// Returns [`ChartError::MissingBlock`] when no fenced block is present and
/// [`ChartError::InvalidJson`] when the body is not a valid chart object.
pub fn extract_chart(content: &str) -> Result<ChartSpec, ChartError> {
    let body = CHART_FENCE
        .as_ref()
        .and_then(|fence| fence.captures(content))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .ok_or(ChartError::MissingBlock)?;
    let wire: ChartBlockWire = serde_json::from_str(body)?;
    Ok(wire.into())
}
