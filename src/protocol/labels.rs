use rustc_hash::FxHashMap;
use std::sync::LazyLock;

static TOOL_LABELS: LazyLock<FxHashMap<&'static str, &'static str>> = LazyLock::new(|| {
    FxHashMap::from_iter([
        ("get-registration-chart", "Generating registration chart..."),
        ("get-activity-chart", "Generating activity chart..."),
        ("get-dashboard-stats", "Loading dashboard statistics..."),
        ("get-user-stats", "Calculating user statistics..."),
        ("search-users", "Searching users..."),
        ("get-user-details", "Fetching user details..."),
        ("list-recent-users", "Listing recent users..."),
        ("get-recent-activity", "Checking recent activity..."),
    ])
});

/// Human-readable progress label for a tool invocation.
#[must_use]
pub fn tool_label(tool_name: &str) -> String {
    match TOOL_LABELS.get(tool_name) {
        Some(label) => (*label).to_owned(),
        None => format!("Using tool: {tool_name}..."),
    }
}
