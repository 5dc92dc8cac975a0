//! Normalized search result shapes.
//!
//! Field names follow the provider's camelCase on the wire. Non-optional
//! fields carry `#[serde(default)]` so that envelopes echoed back by clients
//! decode even when a provider omitted a field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::lenient;
use super::{SearchMode, SEARCH_GEOGRAPHY, SEARCH_LANGUAGE};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameters {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub gl: String,
    #[serde(default)]
    pub hl: String,
    /// Anything else the provider echoed (type, engine, num, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchParameters {
    pub fn for_query(query: &str) -> Self {
        Self {
            q: query.to_string(),
            gl: SEARCH_GEOGRAPHY.to_string(),
            hl: SEARCH_LANGUAGE.to_string(),
            extra: Map::new(),
        }
    }
}

/// Organic web result, passed through from the provider.
///
/// Typed fields decode leniently, so a null or oddly typed value never
/// rejects the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebResult {
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub link: String,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_rank", skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_object", skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Sitelinks and other provider fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub source: String,
    /// 1-based rank within the response
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offers: Option<String>,
    #[serde(default)]
    pub position: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub cid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScholarResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub publication_info: String,
    #[serde(default)]
    pub year: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cited_by: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatentFigure {
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatentResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filing_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub figures: Option<Vec<PatentFigure>>,
}

/// Scholar and patent results share one collection, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AcademicResult {
    Scholar(ScholarResult),
    Patent(PatentResult),
}

impl AcademicResult {
    pub fn title(&self) -> &str {
        match self {
            AcademicResult::Scholar(r) => &r.title,
            AcademicResult::Patent(r) => &r.title,
        }
    }

    pub fn link(&self) -> &str {
        match self {
            AcademicResult::Scholar(r) => &r.link,
            AcademicResult::Patent(r) => &r.link,
        }
    }

    pub fn snippet(&self) -> &str {
        match self {
            AcademicResult::Scholar(r) => &r.snippet,
            AcademicResult::Patent(r) => &r.snippet,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGraphImage {
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub image_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGraph {
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::text")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_object", skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient::opt_list", skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<KnowledgeGraphImage>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedSearch {
    #[serde(default, deserialize_with = "lenient::text")]
    pub query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeopleAlsoAsk {
    #[serde(default, deserialize_with = "lenient::text")]
    pub question: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub snippet: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub link: String,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Normalized result set for one search, in the provider's envelope shape.
///
/// Exactly one collection is populated per mode; web mode additionally
/// carries the knowledge graph, related searches, people-also-ask and any
/// other provider fields in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub search_parameters: SearchParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organic: Option<Vec<WebResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<VideoResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub places: Option<Vec<PlaceResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news: Option<Vec<NewsResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shopping: Option<Vec<ShoppingResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic: Option<Vec<AcademicResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_graph: Option<KnowledgeGraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_searches: Option<Vec<RelatedSearch>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub people_also_ask: Option<Vec<PeopleAlsoAsk>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One normalized item, tagged by its result kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizedResult<'a> {
    Web(&'a WebResult),
    Image(&'a ImageResult),
    Video(&'a VideoResult),
    News(&'a NewsResult),
    Place(&'a PlaceResult),
    Shopping(&'a ShoppingResult),
    Academic(&'a AcademicResult),
}

impl<'a> NormalizedResult<'a> {
    pub fn title(&self) -> &'a str {
        match self {
            NormalizedResult::Web(r) => &r.title,
            NormalizedResult::Image(r) => &r.title,
            NormalizedResult::Video(r) => &r.title,
            NormalizedResult::News(r) => &r.title,
            NormalizedResult::Place(r) => &r.title,
            NormalizedResult::Shopping(r) => &r.title,
            NormalizedResult::Academic(r) => r.title(),
        }
    }

    pub fn link(&self) -> &'a str {
        match self {
            NormalizedResult::Web(r) => &r.link,
            NormalizedResult::Image(r) => &r.link,
            NormalizedResult::Video(r) => &r.link,
            NormalizedResult::News(r) => &r.link,
            NormalizedResult::Place(r) => &r.link,
            NormalizedResult::Shopping(r) => &r.link,
            NormalizedResult::Academic(r) => r.link(),
        }
    }
}

impl SearchResponse {
    /// Empty envelope for `query`.
    pub fn empty(query: &str) -> Self {
        Self {
            search_parameters: SearchParameters::for_query(query),
            ..Default::default()
        }
    }

    /// All items across every populated collection, in collection order.
    pub fn sources(&self) -> Vec<NormalizedResult<'_>> {
        fn tagged<'a, T>(
            items: &'a Option<Vec<T>>,
            tag: fn(&'a T) -> NormalizedResult<'a>,
        ) -> impl Iterator<Item = NormalizedResult<'a>> {
            items.iter().flatten().map(tag)
        }

        tagged(&self.organic, NormalizedResult::Web)
            .chain(tagged(&self.news, NormalizedResult::News))
            .chain(tagged(&self.images, NormalizedResult::Image))
            .chain(tagged(&self.shopping, NormalizedResult::Shopping))
            .chain(tagged(&self.videos, NormalizedResult::Video))
            .chain(tagged(&self.places, NormalizedResult::Place))
            .chain(tagged(&self.academic, NormalizedResult::Academic))
            .collect()
    }

    pub fn result_count(&self) -> usize {
        self.sources().len()
    }

    pub fn is_empty(&self) -> bool {
        self.result_count() == 0
    }

    /// Collection that carries the items for `mode`, as an item count.
    pub fn count_for(&self, mode: SearchMode) -> usize {
        match mode {
            SearchMode::Web => self.organic.as_ref().map_or(0, Vec::len),
            SearchMode::Images => self.images.as_ref().map_or(0, Vec::len),
            SearchMode::Videos => self.videos.as_ref().map_or(0, Vec::len),
            SearchMode::News => self.news.as_ref().map_or(0, Vec::len),
            SearchMode::Places => self.places.as_ref().map_or(0, Vec::len),
            SearchMode::Shopping => self.shopping.as_ref().map_or(0, Vec::len),
            SearchMode::Scholar | SearchMode::Patents => {
                self.academic.as_ref().map_or(0, Vec::len)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_academic_kind_tag() {
        let scholar = AcademicResult::Scholar(ScholarResult {
            title: "Attention Is All You Need".into(),
            cited_by: Some(100_000),
            ..Default::default()
        });
        let json = serde_json::to_value(&scholar).unwrap();
        assert_eq!(json["kind"], "scholar");
        assert_eq!(json["citedBy"], 100_000);

        let back: AcademicResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, scholar);
    }

    #[test]
    fn test_envelope_decodes_with_unknown_fields() {
        let envelope: SearchResponse = serde_json::from_value(serde_json::json!({
            "searchParameters": { "q": "rust", "gl": "us", "hl": "en", "type": "search" },
            "organic": [{ "title": "Rust", "link": "https://www.rust-lang.org", "sitelinks": [] }],
            "images": [{ "title": "Logo", "imageUrl": "https://x.test/logo.png" }],
            "topStories": [{ "title": "Rust 2.0" }]
        }))
        .unwrap();

        assert_eq!(envelope.search_parameters.extra["type"], "search");
        assert!(envelope.extra.contains_key("topStories"));
        let organic = envelope.organic.as_ref().unwrap();
        assert!(organic[0].extra.contains_key("sitelinks"));
        assert_eq!(envelope.result_count(), 2);
        assert_eq!(envelope.count_for(SearchMode::Web), 1);
    }

    #[test]
    fn test_sources_are_tagged() {
        let mut envelope = SearchResponse::empty("pizza");
        envelope.places = Some(vec![PlaceResult {
            title: "Joe's".into(),
            ..Default::default()
        }]);

        let sources = envelope.sources();
        assert_eq!(sources.len(), 1);
        assert!(matches!(sources[0], NormalizedResult::Place(_)));
        assert_eq!(sources[0].title(), "Joe's");
    }
}
