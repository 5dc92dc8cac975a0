//! Result Normalizer
//!
//! Forwards a query to the external search provider and reshapes the
//! loosely-typed payload it returns into mode-specific result collections:
//! - `mode`: the closed set of search modes and their provider routing
//! - `types`: the normalized result shapes
//! - `normalize`: the per-mode decode and transform step
//! - `provider`: the provider seam and the Serper client
//! - `og_image`: preview image lookup for result links

mod hostname;
mod lenient;
mod mode;
mod normalize;
mod og_image;
mod provider;
mod types;

pub use hostname::{source_label, site_name};
pub use mode::{SearchMode, SearchQuery};
pub use normalize::{normalize, ProviderShape};
pub use og_image::{extract_og_image, OgImageClient};
pub use provider::{SearchProvider, SerperClient};
pub use types::{
    AcademicResult, ImageResult, KnowledgeGraph, KnowledgeGraphImage, NewsResult,
    NormalizedResult, PatentFigure, PatentResult, PeopleAlsoAsk, PlaceResult, RelatedSearch,
    ScholarResult, SearchParameters, SearchResponse, ShoppingResult, VideoResult, WebResult,
};

use sha2::{Digest, Sha256};

/// Geography sent with every provider request.
pub const SEARCH_GEOGRAPHY: &str = "us";

/// Language sent with every provider request.
pub const SEARCH_LANGUAGE: &str = "en";

/// Stable identifier for a (term, mode) pair, suitable for URLs.
///
/// The term is trimmed and lowercased first; a missing mode counts as `web`.
pub fn search_id(term: &str, mode: Option<&str>) -> String {
    let input = format!("{}-{}", term.trim().to_lowercase(), mode.unwrap_or("web"));
    let digest = Sha256::digest(input.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(24);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_id_is_normalized() {
        let a = search_id("  Best Electric Cars ", Some("web"));
        let b = search_id("best electric cars", None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 24);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_search_id_depends_on_mode() {
        assert_ne!(
            search_id("rust", Some("news")),
            search_id("rust", Some("web"))
        );
    }
}
