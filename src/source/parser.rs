//! Parser for fetcher progress output

use crate::types::ProgressSnapshot;
use serde::Deserialize;

/// One JSON progress line; missing fields keep their previous value
#[derive(Debug, Deserialize)]
struct ProgressLine {
    current: Option<u64>,
    total: Option<u64>,
    status: Option<String>,
}

/// Apply one line of fetcher stdout to the previous snapshot
///
/// - A JSON object such as `{"current": 3, "total": 10, "status": "..."}` updates
///   the fields it contains.
/// - Any other non-empty line replaces the status text and keeps the counters.
/// - Blank lines yield `None`.
pub fn parse_progress_line(line: &str, previous: &ProgressSnapshot) -> Option<ProgressSnapshot> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.starts_with('{')
        && let Ok(parsed) = serde_json::from_str::<ProgressLine>(line)
    {
        return Some(ProgressSnapshot {
            current: parsed.current.unwrap_or(previous.current),
            total: parsed.total.unwrap_or(previous.total),
            status: parsed.status.unwrap_or_else(|| previous.status.clone()),
        });
    }

    Some(ProgressSnapshot {
        current: previous.current,
        total: previous.total,
        status: line.to_string(),
    })
}
