//! Context Stitcher - renders normalized results into the synthesis prompt
//!
//! Sections appear in a fixed order and empty sections are omitted:
//! knowledge graph, organic results, top stories, people also ask, related
//! searches, images, shopping, videos, places, academic.

use super::refiner::RefinementResult;
use serde_json::{Map, Value};

use crate::search::{AcademicResult, KnowledgeGraph, SearchResponse};

/// "Search Context" header describing the query being answered
pub fn search_context(query: &str, mode: &str, refinement: Option<&RefinementResult>) -> String {
    match refinement {
        Some(refinement) => format!(
            "### Search Context\nOriginal Query: {}\nRefined Query: {}\nRefinement Explanation: {}\nSearch Mode: {}\n\n",
            query, refinement.refined_query, refinement.explanation, mode
        ),
        None => format!("### Search Context\nQuery: {}\nSearch Mode: {}\n\n", query, mode),
    }
}

/// Header plus every populated result section.
pub fn build_context(
    query: &str,
    mode: &str,
    refinement: Option<&RefinementResult>,
    results: &SearchResponse,
) -> String {
    let mut context = search_context(query, mode, refinement);

    if let Some(kg) = &results.knowledge_graph {
        context.push_str(&knowledge_graph(kg));
    }

    section(&mut context, "Organic Results", results.organic.as_deref(), |r| {
        let snippet = r.snippet.as_deref().unwrap_or_default();
        let mut block = format!("{}\nSource: {}\n{}\n", r.title, r.link, snippet);
        if let Some(date) = &r.date {
            block.push_str(&format!("Date: {}\n", date));
        }
        if let Some(attributes) = &r.attributes {
            push_attributes(&mut block, attributes);
        }
        optional_line(&mut block, "Image", r.image_url.as_deref());
        optional_line(&mut block, "Thumbnail", r.thumbnail_url.as_deref());
        block
    });

    section(&mut context, "Top Stories", results.news.as_deref(), |story| {
        let mut block = format!("{}\nSource: {}\nLink: {}\n", story.title, story.source, story.link);
        optional_line(&mut block, "Date", story.date.as_deref());
        optional_line(&mut block, "Image", story.image_url.as_deref());
        optional_line(&mut block, "Summary", Some(story.snippet.as_str()));
        block
    });

    section(&mut context, "People Also Ask", results.people_also_ask.as_deref(), |item| {
        let mut block = format!("Q: {}\nA: {}\nSource: {}\n", item.question, item.snippet, item.link);
        optional_line(&mut block, "Title", item.title.as_deref());
        block
    });

    if let Some(related) = results.related_searches.as_deref().filter(|r| !r.is_empty()) {
        context.push_str("### Related Searches\n");
        for (index, item) in related.iter().enumerate() {
            context.push_str(&format!("[{}] {}\n", index + 1, item.query));
        }
        context.push('\n');
    }

    section(&mut context, "Images", results.images.as_deref(), |image| {
        let title = if image.title.is_empty() { "Image" } else { &image.title };
        let mut block = format!("{}\nURL: {}\n", title, image.image_url);
        optional_line(&mut block, "Source", Some(image.source.as_str()));
        block
    });

    section(&mut context, "Shopping Results", results.shopping.as_deref(), |item| {
        let price = item.price.as_deref().filter(|p| !p.is_empty()).unwrap_or("N/A");
        let mut block = format!("{}\nPrice: {}\n", item.title, price);
        if let Some(rating) = item.rating {
            block.push_str(&format!("Rating: {}\n", rating));
        }
        optional_line(&mut block, "Source", Some(item.source.as_str()));
        optional_line(&mut block, "Link", Some(item.link.as_str()));
        optional_line(&mut block, "Image", item.image_url.as_deref());
        block
    });

    section(&mut context, "Videos", results.videos.as_deref(), |video| {
        let mut block = format!("{}\nLink: {}\n", video.title, video.link);
        optional_line(&mut block, "Date", video.date.as_deref());
        optional_line(&mut block, "Duration", video.duration.as_deref());
        optional_line(&mut block, "Image", video.image_url.as_deref());
        block
    });

    section(&mut context, "Places", results.places.as_deref(), |place| {
        let mut block = format!("{}\nAddress: {}\n", place.title, place.address);
        optional_line(&mut block, "Category", place.category.as_deref());
        if let Some(rating) = place.rating {
            block.push_str(&format!("Rating: {}\n", rating));
        }
        optional_line(&mut block, "Phone", place.phone_number.as_deref());
        optional_line(&mut block, "Website", place.website.as_deref());
        block
    });

    section(&mut context, "Academic Results", results.academic.as_deref(), |item| {
        let mut block = format!("{}\nLink: {}\n", item.title(), item.link());
        match item {
            AcademicResult::Scholar(paper) => {
                optional_line(&mut block, "Publication", Some(paper.publication_info.as_str()));
                optional_line(&mut block, "Year", Some(paper.year.as_str()));
                if let Some(cited_by) = paper.cited_by {
                    block.push_str(&format!("Cited By: {}\n", cited_by));
                }
                optional_line(&mut block, "PDF", paper.pdf_url.as_deref());
            }
            AcademicResult::Patent(patent) => {
                optional_line(&mut block, "Publication Number", patent.publication_number.as_deref());
                optional_line(&mut block, "Inventor", patent.inventor.as_deref());
                optional_line(&mut block, "Assignee", patent.assignee.as_deref());
                optional_line(&mut block, "Filing Date", patent.filing_date.as_deref());
                optional_line(&mut block, "Grant Date", patent.grant_date.as_deref());
            }
        }
        optional_line(&mut block, "Summary", Some(item.snippet()));
        block
    });

    context
}

fn knowledge_graph(kg: &KnowledgeGraph) -> String {
    let mut block = format!("### Knowledge Graph\nTitle: {}\nType: {}\n", kg.title, kg.kind);
    optional_line(&mut block, "Description", kg.description.as_deref());

    if let Some(attributes) = kg.attributes.as_ref().filter(|a| !a.is_empty()) {
        push_attributes(&mut block, attributes);
    }
    if let Some(images) = kg.images.as_ref().filter(|i| !i.is_empty()) {
        block.push_str("Images:\n");
        for image in images {
            let title = image.title.as_deref().unwrap_or("Image");
            block.push_str(&format!("- {}: {}\n", title, image.image_url));
        }
    }
    block.push('\n');
    block
}

fn push_attributes(block: &mut String, attributes: &Map<String, Value>) {
    block.push_str("Attributes:\n");
    for (key, value) in attributes {
        match value {
            Value::String(text) => block.push_str(&format!("- {}: {}\n", key, text)),
            other => block.push_str(&format!("- {}: {}\n", key, other)),
        }
    }
}

/// Append a numbered section; nothing is written for an empty collection.
fn section<T>(context: &mut String, heading: &str, items: Option<&[T]>, render: impl Fn(&T) -> String) {
    let Some(items) = items.filter(|items| !items.is_empty()) else {
        return;
    };

    context.push_str(&format!("### {}\n", heading));
    for (index, item) in items.iter().enumerate() {
        context.push_str(&format!("[{}] {}\n", index + 1, render(item)));
    }
}

fn optional_line(block: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        block.push_str(&format!("{}: {}\n", label, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{NewsResult, RelatedSearch, WebResult};

    fn results() -> SearchResponse {
        let mut results = SearchResponse::empty("rust");
        results.organic = Some(vec![WebResult {
            title: "Rust".into(),
            link: "https://www.rust-lang.org".into(),
            snippet: Some("A language empowering everyone".into()),
            ..Default::default()
        }]);
        results.knowledge_graph = Some(KnowledgeGraph {
            title: "Rust".into(),
            kind: "Programming language".into(),
            ..Default::default()
        });
        results.related_searches = Some(vec![RelatedSearch { query: "rust book".into() }]);
        results.news = Some(Vec::new());
        results
    }

    #[test]
    fn test_header_with_refinement() {
        let refinement = RefinementResult {
            refined_query: "rust programming language".into(),
            explanation: "Disambiguated".into(),
        };
        let header = search_context("rust", "web", Some(&refinement));
        assert!(header.starts_with("### Search Context\nOriginal Query: rust\n"));
        assert!(header.contains("Refined Query: rust programming language"));
        assert!(header.contains("Search Mode: web"));

        let header = search_context("rust", "web", None);
        assert_eq!(header, "### Search Context\nQuery: rust\nSearch Mode: web\n\n");
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let context = build_context("rust", "web", None, &results());

        let kg = context.find("### Knowledge Graph").unwrap();
        let organic = context.find("### Organic Results").unwrap();
        let related = context.find("### Related Searches").unwrap();
        assert!(kg < organic && organic < related);
        assert!(context.contains("[1] Rust\nSource: https://www.rust-lang.org\n"));
        assert!(context.contains("[1] rust book\n"));
    }

    #[test]
    fn test_empty_sections_omitted() {
        let context = build_context("rust", "web", None, &results());
        assert!(!context.contains("### Top Stories"));
        assert!(!context.contains("### Images"));
        assert!(!context.contains("Description:"));
    }

    #[test]
    fn test_news_block() {
        let mut results = SearchResponse::empty("ev");
        results.news = Some(vec![NewsResult {
            title: "EV sales surge".into(),
            link: "https://www.nytimes.com/ev".into(),
            source: "nytimes.com".into(),
            position: 1,
            ..Default::default()
        }]);
        let context = build_context("ev", "news", None, &results);
        assert!(context.contains(
            "### Top Stories\n[1] EV sales surge\nSource: nytimes.com\nLink: https://www.nytimes.com/ev\n"
        ));
        assert!(!context.contains("Summary:"));
    }

    #[test]
    fn test_attributes_render_any_scalar() {
        let mut results = SearchResponse::empty("kia ev6");
        let attributes = serde_json::json!({ "Range": "310 mi", "Rating": 4.5 });
        results.knowledge_graph = Some(KnowledgeGraph {
            title: "Kia EV6".into(),
            attributes: attributes.as_object().cloned(),
            ..Default::default()
        });
        let context = build_context("kia ev6", "web", None, &results);
        assert!(context.contains("Attributes:\n- Range: 310 mi\n- Rating: 4.5\n"));
    }
}
