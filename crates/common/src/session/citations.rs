use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::search::site_name;

/// A markdown link cited in a synthesized answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub label: String,
    pub url: String,
    pub site_name: String,
}

const LINK_PATTERN: &str = r"(!?)\[([^\]\n]+)\]\((https?://[^\s)]+)\)";

/// `[Label](http…)` links in order of first appearance, one per URL.
/// Images (`![alt](url)`) are not citations.
pub fn extract_citations(answer: &str) -> Vec<Citation> {
    let Ok(pattern) = Regex::new(LINK_PATTERN) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    pattern
        .captures_iter(answer)
        .filter(|caps| caps.get(1).map_or(true, |bang| bang.as_str().is_empty()))
        .filter_map(|caps| {
            let label = caps.get(2)?.as_str().trim();
            let url = caps.get(3)?.as_str();
            seen.insert(url.to_string()).then(|| Citation {
                label: label.to_string(),
                url: url.to_string(),
                site_name: site_name(url),
            })
        })
        .collect()
}
