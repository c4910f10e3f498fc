//! Input classification: decides which fetch path a submitted input takes.
//!
//! Classification is total and deterministic. Every input maps to exactly one
//! [`FetchTarget`]; nothing is rejected here.

use crate::config::ClassifyConfig;
use crate::types::FetchTarget;
use url::Url;

/// Classify a submitted input.
///
/// - A `http(s)` URL whose first path segment is a configured single-item marker
///   and which has a non-empty second segment is [`FetchTarget::Single`] with that
///   second segment: `https://example.com/p/ABC123/` becomes `Single("ABC123")`.
/// - Any other `http(s)` URL with a non-empty first segment is a collection link and
///   yields [`FetchTarget::Collection`] with that segment.
/// - Everything else is a bare collection name and yields the trimmed input.
pub fn classify(input: &str, config: &ClassifyConfig) -> FetchTarget {
    let trimmed = input.trim();

    let Some(url) = parse_web_url(trimmed) else {
        return FetchTarget::Collection(trimmed.to_string());
    };

    let mut segments = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter();

    match (segments.next(), segments.next()) {
        (Some(first), Some(second))
            if config.single_item_markers.iter().any(|m| m == first) =>
        {
            FetchTarget::Single(second.to_string())
        }
        (Some(first), _) if !config.single_item_markers.iter().any(|m| m == first) => {
            FetchTarget::Collection(first.to_string())
        }
        _ => FetchTarget::Collection(trimmed.to_string()),
    }
}

fn parse_web_url(input: &str) -> Option<Url> {
    let url = Url::parse(input).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}
