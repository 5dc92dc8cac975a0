//! Preview image lookup for result links.
//!
//! Fetches a page and reads its Open Graph image, falling back to the
//! Twitter card image.

use regex_lite::Regex;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::errors::{AppError, Result};

/// Meta tag patterns in lookup order, each in both attribute orders
const IMAGE_PATTERNS: [&str; 4] = [
    r#"(?i)<meta[^>]*property\s*=\s*["']og:image["'][^>]*content\s*=\s*["']([^"']+)["'][^>]*>"#,
    r#"(?i)<meta[^>]*content\s*=\s*["']([^"']+)["'][^>]*property\s*=\s*["']og:image["'][^>]*>"#,
    r#"(?i)<meta[^>]*name\s*=\s*["']twitter:image["'][^>]*content\s*=\s*["']([^"']+)["'][^>]*>"#,
    r#"(?i)<meta[^>]*content\s*=\s*["']([^"']+)["'][^>]*name\s*=\s*["']twitter:image["'][^>]*>"#,
];

/// First `og:image`, else `twitter:image`
pub fn extract_og_image(html: &str) -> Option<String> {
    IMAGE_PATTERNS.iter().find_map(|pattern| {
        let pattern = Regex::new(pattern).ok()?;
        let image = pattern.captures(html)?.get(1)?.as_str().trim();
        (!image.is_empty()).then(|| image.to_string())
    })
}

/// Fetches pages to read their preview image
pub struct OgImageClient {
    client: reqwest::Client,
}

impl OgImageClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// Preview image for `page`.
    ///
    /// Only `http` and `https` pages are fetched. A page that cannot be
    /// fetched or read counts as having no image.
    pub async fn lookup(&self, page: &str) -> Result<Option<String>> {
        let url = Url::parse(page.trim())
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| AppError::Validation {
                message: format!("Not an http(s) URL: {:?}", page),
                field: Some("url".to_string()),
            })?;

        let html = match self.fetch(url.clone()).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to fetch page for preview image");
                return Ok(None);
            }
        };

        let image = extract_og_image(&html);
        debug!(url = %url, found = image.is_some(), "Preview image lookup");
        Ok(image)
    }

    async fn fetch(&self, url: Url) -> reqwest::Result<String> {
        self.client.get(url).send().await?.error_for_status()?.text().await
    }
}
