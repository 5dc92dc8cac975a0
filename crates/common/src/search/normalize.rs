use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use super::hostname::source_label;
use super::lenient::scalar_text;
use super::types::*;
use super::SearchMode;
use crate::errors::{AppError, Result};

type Item = Map<String, Value>;

/// Recognized shapes of a raw provider payload.
///
/// Shapes are tried in a fixed order: a bare array of items, then an object
/// carrying the items under the mode's collection field. `null` and an
/// object without that field both count as an empty collection; anything
/// else is rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderShape {
    Bare(Vec<Value>),
    Keyed {
        items: Vec<Value>,
        rest: Map<String, Value>,
    },
}

impl ProviderShape {
    pub fn decode(payload: Value, mode: SearchMode) -> Result<Self> {
        let field = mode.collection_field();
        match payload {
            Value::Array(items) => Ok(ProviderShape::Bare(items)),
            Value::Null => Ok(ProviderShape::Keyed {
                items: Vec::new(),
                rest: Map::new(),
            }),
            Value::Object(mut rest) => match rest.remove(field) {
                Some(Value::Array(items)) => Ok(ProviderShape::Keyed { items, rest }),
                None | Some(Value::Null) => Ok(ProviderShape::Keyed {
                    items: Vec::new(),
                    rest,
                }),
                Some(other) => Err(AppError::InvalidProviderData {
                    mode: mode.to_string(),
                    message: format!("field `{}` is {}, expected an array", field, kind(&other)),
                }),
            },
            other => Err(AppError::InvalidProviderData {
                mode: mode.to_string(),
                message: format!("payload is {}, expected an array or object", kind(&other)),
            }),
        }
    }

    /// Item objects and the sibling fields. Non-object items are dropped.
    fn into_parts(self, mode: SearchMode) -> (Vec<Item>, Map<String, Value>) {
        let (items, rest) = match self {
            ProviderShape::Bare(items) => (items, Map::new()),
            ProviderShape::Keyed { items, rest } => (items, rest),
        };

        let objects = items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match item {
                Value::Object(map) => Some(map),
                other => {
                    warn!(
                        mode = %mode,
                        index,
                        kind = kind(&other),
                        "Dropping non-object result item"
                    );
                    None
                }
            })
            .collect();

        (objects, rest)
    }
}

/// Reshape a raw provider payload into the normalized envelope for `mode`.
///
/// An empty or missing collection yields an empty envelope, never an error.
pub fn normalize(mode: SearchMode, query: &str, payload: Value) -> Result<SearchResponse> {
    let (items, rest) = ProviderShape::decode(payload, mode)?.into_parts(mode);
    let mut response = SearchResponse::empty(query);

    match mode {
        SearchMode::Web => normalize_web(&mut response, items, rest),
        SearchMode::News => {
            response.news = Some(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| news(index, item))
                    .collect::<Result<_>>()?,
            )
        }
        SearchMode::Shopping => {
            response.shopping = Some(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| shopping(index, item))
                    .collect::<Result<_>>()?,
            )
        }
        SearchMode::Places => {
            response.places = Some(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| place(index, item))
                    .collect(),
            )
        }
        SearchMode::Videos => {
            response.videos = Some(items.into_iter().map(video).collect::<Result<_>>()?)
        }
        SearchMode::Images => {
            response.images = Some(items.into_iter().map(image).collect::<Result<_>>()?)
        }
        SearchMode::Scholar => {
            response.academic = Some(
                items
                    .into_iter()
                    .map(|item| AcademicResult::Scholar(scholar(item)))
                    .collect(),
            )
        }
        SearchMode::Patents => {
            response.academic = Some(
                items
                    .into_iter()
                    .map(|item| AcademicResult::Patent(patent(item)))
                    .collect(),
            )
        }
    }

    Ok(response)
}

/// Web results pass through: typed views for the fields the context reads,
/// every other provider field kept verbatim. Never fails on field types.
fn normalize_web(response: &mut SearchResponse, items: Vec<Item>, mut rest: Map<String, Value>) {
    if let Some(Value::Object(params)) = rest.remove("searchParameters") {
        let target = &mut response.search_parameters;
        for (key, value) in params {
            match (key.as_str(), value) {
                ("q", Value::String(s)) => target.q = s,
                ("gl", Value::String(s)) => target.gl = s,
                ("hl", Value::String(s)) => target.hl = s,
                (_, value) => {
                    target.extra.insert(key, value);
                }
            }
        }
    }

    response.organic = Some(
        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(Value::Object(item)) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!(error = %e, "Dropping undecodable organic result");
                    None
                }
            })
            .collect(),
    );
    response.knowledge_graph = take_typed(&mut rest, "knowledgeGraph");
    response.related_searches = take_typed(&mut rest, "relatedSearches");
    response.people_also_ask = take_typed(&mut rest, "peopleAlsoAsk");
    response.extra = rest;
}

/// Typed view of a top-level web field. A value of the wrong shape stays
/// in `rest` under its own key, so it is still passed through.
fn take_typed<T: DeserializeOwned>(rest: &mut Map<String, Value>, field: &str) -> Option<T> {
    let value = rest.remove(field)?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(typed) => Some(typed),
        Err(e) => {
            warn!(field, error = %e, "Keeping untyped web field");
            rest.insert(field.to_string(), value);
            None
        }
    }
}

fn news(index: usize, item: Item) -> Result<NewsResult> {
    let link = text(&item, "link").unwrap_or_default();
    Ok(NewsResult {
        title: text(&item, "title").unwrap_or_default(),
        source: source_label(text(&item, "source"), &link)?,
        snippet: text(&item, "snippet").unwrap_or_default(),
        image_url: text(&item, "imageUrl"),
        date: text(&item, "date"),
        position: rank(index),
        attributes: attributes(&item, "attributes").unwrap_or_default(),
        link,
    })
}

fn shopping(index: usize, item: Item) -> Result<ShoppingResult> {
    let link = text(&item, "link").unwrap_or_default();
    Ok(ShoppingResult {
        title: text(&item, "title").unwrap_or_default(),
        source: source_label(text(&item, "source"), &link)?,
        price: text(&item, "price"),
        delivery: text(&item, "delivery"),
        image_url: text(&item, "imageUrl"),
        rating: number(&item, "rating"),
        rating_count: count(&item, "ratingCount"),
        offers: text(&item, "offers"),
        position: rank(index),
        link,
    })
}

fn place(index: usize, item: Item) -> PlaceResult {
    PlaceResult {
        title: text(&item, "title").unwrap_or_default(),
        link: text(&item, "link").unwrap_or_default(),
        position: rank(index),
        address: text(&item, "address").unwrap_or_default(),
        latitude: number(&item, "latitude"),
        longitude: number(&item, "longitude"),
        rating: number(&item, "rating"),
        rating_count: count(&item, "ratingCount"),
        category: text(&item, "category"),
        phone_number: text(&item, "phoneNumber"),
        website: text(&item, "website"),
        cid: text(&item, "cid").unwrap_or_default(),
    }
}

fn video(item: Item) -> Result<VideoResult> {
    let link = text(&item, "link").unwrap_or_default();
    Ok(VideoResult {
        title: text(&item, "title").unwrap_or_default(),
        source: source_label(text(&item, "source"), &link)?,
        image_url: text(&item, "imageUrl"),
        snippet: text(&item, "snippet"),
        duration: text(&item, "duration"),
        channel: text(&item, "channel"),
        views: text(&item, "views"),
        date: text(&item, "date"),
        link,
    })
}

fn image(item: Item) -> Result<ImageResult> {
    let link = text(&item, "link").unwrap_or_default();
    Ok(ImageResult {
        title: text(&item, "title").unwrap_or_default(),
        source: source_label(text(&item, "source"), &link)?,
        image_url: text(&item, "imageUrl").unwrap_or_default(),
        link,
    })
}

fn scholar(item: Item) -> ScholarResult {
    let id = text(&item, "id")
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| {
            format!(
                "scholar-{}-{}",
                Utc::now().timestamp_millis(),
                rand::random::<u32>()
            )
        });

    ScholarResult {
        title: text(&item, "title").unwrap_or_default(),
        link: text(&item, "link").unwrap_or_default(),
        snippet: text(&item, "snippet").unwrap_or_default(),
        publication_info: text(&item, "publicationInfo").unwrap_or_default(),
        year: text(&item, "year").unwrap_or_default(),
        // Only a numeric citation count is meaningful
        cited_by: item.get("citedBy").and_then(Value::as_u64),
        pdf_url: text(&item, "pdfUrl").filter(|url| !url.is_empty()),
        id,
    }
}

fn patent(item: Item) -> PatentResult {
    let figures = item.get("figures").and_then(Value::as_array).map(|figures| {
        figures
            .iter()
            .filter_map(Value::as_object)
            .map(|figure| PatentFigure {
                image_url: text(figure, "imageUrl").unwrap_or_default(),
                thumbnail_url: text(figure, "thumbnailUrl").unwrap_or_default(),
            })
            .collect()
    });

    PatentResult {
        title: text(&item, "title").unwrap_or_default(),
        link: text(&item, "link").unwrap_or_default(),
        snippet: text(&item, "snippet").unwrap_or_default(),
        priority_date: text(&item, "priorityDate"),
        filing_date: text(&item, "filingDate"),
        grant_date: text(&item, "grantDate"),
        publication_date: text(&item, "publicationDate"),
        inventor: text(&item, "inventor"),
        assignee: text(&item, "assignee"),
        publication_number: text(&item, "publicationNumber"),
        pdf_url: text(&item, "pdfUrl").filter(|url| !url.is_empty()),
        figures,
    }
}

fn rank(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

fn text(item: &Item, key: &str) -> Option<String> {
    item.get(key).and_then(scalar_text)
}

fn number(item: &Item, key: &str) -> Option<f64> {
    item.get(key).and_then(Value::as_f64)
}

fn count(item: &Item, key: &str) -> Option<u64> {
    item.get(key).and_then(Value::as_u64)
}

fn attributes(item: &Item, key: &str) -> Option<BTreeMap<String, String>> {
    let map = item.get(key)?.as_object()?;
    Some(
        map.keys()
            .filter_map(|name| text(map, name).map(|value| (name.clone(), value)))
            .collect(),
    )
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_news_hostname_fallback_and_rank() {
        let payload = json!({
            "news": [
                { "title": "A", "link": "https://www.nytimes.com/article", "snippet": "s" },
                { "title": "B", "link": "https://apnews.com/b", "source": "AP", "attributes": { "k": "v" } }
            ]
        });
        let response = normalize(SearchMode::News, "q", payload).unwrap();
        let news = response.news.unwrap();

        assert_eq!(news[0].source, "nytimes.com");
        assert_eq!(news[0].position, 1);
        assert!(news[0].attributes.is_empty());
        assert_eq!(news[1].source, "AP");
        assert_eq!(news[1].position, 2);
        assert_eq!(news[1].attributes["k"], "v");
    }

    #[test]
    fn test_every_mode_accepts_empty_payloads() {
        for mode in SearchMode::ALL {
            for payload in [json!([]), json!({}), json!(null), json!({ (mode.collection_field()): null })] {
                let response = normalize(mode, "q", payload).unwrap();
                assert_eq!(response.result_count(), 0, "mode {}", mode);
                assert_eq!(response.search_parameters.gl, "us");
                assert_eq!(response.search_parameters.hl, "en");
            }
        }
    }

    #[test]
    fn test_bare_array_and_keyed_shapes_match() {
        let item = json!({ "title": "Cat", "link": "https://cats.test/1", "imageUrl": "https://cats.test/1.png" });
        let bare = normalize(SearchMode::Images, "cats", json!([item.clone()])).unwrap();
        let keyed = normalize(SearchMode::Images, "cats", json!({ "images": [item] })).unwrap();

        assert_eq!(bare, keyed);
        assert_eq!(bare.images.unwrap()[0].source, "cats.test");
    }

    #[test]
    fn test_unrecognized_shapes_fail_loudly() {
        let err = normalize(SearchMode::News, "q", json!({ "news": "oops" })).unwrap_err();
        assert!(matches!(err, AppError::InvalidProviderData { .. }));

        let err = normalize(SearchMode::Videos, "q", json!("oops")).unwrap_err();
        assert!(matches!(err, AppError::InvalidProviderData { .. }));
    }

    #[test]
    fn test_unparseable_link_without_source_is_a_defect() {
        let payload = json!([{ "title": "x", "link": "not a url" }]);
        let err = normalize(SearchMode::Shopping, "q", payload).unwrap_err();
        assert!(matches!(err, AppError::InvalidLink { .. }));
    }

    #[test]
    fn test_non_object_items_are_dropped() {
        let payload = json!([42, { "title": "Joe's Pizza", "latitude": 40.7, "longitude": -73.9 }]);
        let places = normalize(SearchMode::Places, "pizza", payload).unwrap().places.unwrap();

        assert_eq!(places.len(), 1);
        assert_eq!(places[0].position, 1);
        assert_eq!(places[0].latitude, Some(40.7));
        assert_eq!(places[0].longitude, Some(-73.9));
    }

    #[test]
    fn test_scholar_fields() {
        let payload = json!({
            "organic": [
                { "title": "Paper", "year": 2017, "citedBy": 12, "id": "abc" },
                { "title": "Other", "year": "2020", "citedBy": "many" }
            ]
        });
        let academic = normalize(SearchMode::Scholar, "q", payload).unwrap().academic.unwrap();

        let AcademicResult::Scholar(first) = &academic[0] else {
            panic!("expected scholar");
        };
        assert_eq!(first.year, "2017");
        assert_eq!(first.cited_by, Some(12));
        assert_eq!(first.id, "abc");

        let AcademicResult::Scholar(second) = &academic[1] else {
            panic!("expected scholar");
        };
        assert_eq!(second.year, "2020");
        assert_eq!(second.cited_by, None);
        assert!(second.id.starts_with("scholar-"));
    }

    #[test]
    fn test_patents_classified_by_mode() {
        let payload = json!({
            "organic": [{
                "title": "Widget",
                "filingDate": "2020-01-01",
                "figures": [{ "imageUrl": "https://p.test/f.png", "thumbnailUrl": "https://p.test/t.png" }]
            }]
        });
        let academic = normalize(SearchMode::Patents, "q", payload).unwrap().academic.unwrap();

        let AcademicResult::Patent(patent) = &academic[0] else {
            panic!("expected patent");
        };
        assert_eq!(patent.filing_date.as_deref(), Some("2020-01-01"));
        assert_eq!(patent.figures.as_ref().unwrap()[0].thumbnail_url, "https://p.test/t.png");
    }

    #[test]
    fn test_web_passes_provider_fields_through() {
        let payload = json!({
            "searchParameters": { "q": "rust", "type": "search", "engine": "google" },
            "knowledgeGraph": { "title": "Rust", "type": "Programming language", "attributes": { "Designed by": "Graydon Hoare" } },
            "organic": [{ "title": "Rust", "link": "https://www.rust-lang.org", "position": 1, "sitelinks": [{ "title": "Install" }] }],
            "relatedSearches": [{ "query": "rust book" }],
            "topStories": [{ "title": "Rust 1.80" }],
            "credits": 1
        });
        let response = normalize(SearchMode::Web, "rust", payload).unwrap();

        assert_eq!(response.search_parameters.q, "rust");
        assert_eq!(response.search_parameters.gl, "us");
        assert_eq!(response.search_parameters.extra["engine"], "google");
        assert_eq!(response.knowledge_graph.as_ref().unwrap().kind, "Programming language");
        assert_eq!(response.related_searches.as_ref().unwrap()[0].query, "rust book");
        assert!(response.extra.contains_key("topStories"));
        assert!(response.organic.as_ref().unwrap()[0].extra.contains_key("sitelinks"));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["credits"], 1);
        assert_eq!(json["organic"][0]["sitelinks"][0]["title"], "Install");
    }

    #[test]
    fn test_web_tolerates_null_and_numeric_fields() {
        let payload = json!({
            "knowledgeGraph": { "title": "Kia EV6", "description": null, "attributes": { "Range": "310 mi", "Rating": 4.5 } },
            "organic": [
                { "title": "A", "link": "https://a.test", "snippet": null },
                { "title": "B", "link": "https://b.test", "snippet": 42, "position": "2", "attributes": { "Rating": 4.5, "Reviews": null } }
            ],
            "relatedSearches": "not a list",
            "peopleAlsoAsk": [{ "question": "Is it fast?", "snippet": null, "link": "https://c.test" }]
        });
        let response = normalize(SearchMode::Web, "ev6", payload).unwrap();

        let organic = response.organic.as_ref().unwrap();
        assert_eq!(organic.len(), 2);
        assert_eq!(organic[0].snippet, None);
        assert_eq!(organic[1].snippet.as_deref(), Some("42"));
        assert_eq!(organic[1].position, Some(2));
        assert_eq!(organic[1].attributes.as_ref().unwrap()["Rating"], 4.5);

        let kg = response.knowledge_graph.as_ref().unwrap();
        assert_eq!(kg.description, None);
        assert_eq!(kg.attributes.as_ref().unwrap()["Rating"], 4.5);

        // A field of the wrong shape is still passed through untouched
        assert!(response.related_searches.is_none());
        assert_eq!(response.extra["relatedSearches"], "not a list");
        assert_eq!(response.people_also_ask.as_ref().unwrap()[0].snippet, "");
    }

    #[test]
    fn test_video_source_falls_back_to_hostname() {
        let payload = json!({
            "videos": [
                { "title": "EV6 review", "link": "https://www.youtube.com/watch?v=1", "duration": "12:04" },
                { "title": "EV6 test", "link": "https://vimeo.com/2", "source": "Vimeo" }
            ]
        });
        let videos = normalize(SearchMode::Videos, "ev6", payload).unwrap().videos.unwrap();

        assert_eq!(videos[0].source, "youtube.com");
        assert_eq!(videos[0].duration.as_deref(), Some("12:04"));
        assert_eq!(videos[1].source, "Vimeo");
    }

    #[test]
    fn test_shopping_source_falls_back_to_hostname() {
        let payload = json!({
            "shopping": [
                { "title": "Wall charger", "link": "https://www.bestbuy.com/charger", "price": "$499", "rating": 4.6, "ratingCount": 812 },
                { "title": "Cable", "link": "https://shop.test/cable", "source": "Shop" }
            ]
        });
        let shopping = normalize(SearchMode::Shopping, "charger", payload).unwrap().shopping.unwrap();

        assert_eq!(shopping[0].source, "bestbuy.com");
        assert_eq!(shopping[0].position, 1);
        assert_eq!(shopping[0].rating, Some(4.6));
        assert_eq!(shopping[0].rating_count, Some(812));
        assert_eq!(shopping[1].source, "Shop");
        assert_eq!(shopping[1].position, 2);
    }
}
