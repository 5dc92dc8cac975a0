use url::Url;

use crate::errors::{AppError, Result};

/// Friendly names for well-known hosts.
const KNOWN_SITES: &[(&str, &str)] = &[
    ("youtube.com", "YouTube"),
    ("music.youtube.com", "YouTube Music"),
    ("amazon.com", "Amazon"),
    ("music.amazon.com", "Amazon Music"),
    ("spotify.com", "Spotify"),
    ("apple.com", "Apple"),
    ("music.apple.com", "Apple Music"),
    ("wikipedia.org", "Wikipedia"),
    ("github.com", "GitHub"),
    ("medium.com", "Medium"),
    ("stackoverflow.com", "Stack Overflow"),
];

/// Host of `link` without a leading `www.`.
///
/// A link that does not parse as an absolute URL with a host is a provider
/// defect and is reported as [`AppError::InvalidLink`].
pub(crate) fn hostname(link: &str) -> Result<String> {
    let url = Url::parse(link).map_err(|_| AppError::InvalidLink {
        link: link.to_string(),
    })?;
    let host = url.host_str().ok_or_else(|| AppError::InvalidLink {
        link: link.to_string(),
    })?;
    Ok(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Source label for a result: the explicit label when present and non-empty,
/// otherwise the hostname of the result link.
pub fn source_label(explicit: Option<String>, link: &str) -> Result<String> {
    match explicit {
        Some(label) if !label.trim().is_empty() => Ok(label),
        _ => hostname(link),
    }
}

/// Display name of the website behind `url`, e.g. "GitHub" or "Nytimes".
///
/// Falls back to the input when it is not a URL.
pub fn site_name(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return url.to_string();
    };

    if let Some((_, name)) = KNOWN_SITES.iter().find(|(domain, _)| *domain == host) {
        return name.to_string();
    }

    let suffix_match = KNOWN_SITES
        .iter()
        .filter(|(domain, _)| host.ends_with(&format!(".{}", domain)))
        .max_by_key(|(domain, _)| domain.len());
    if let Some((_, name)) = suffix_match {
        return name.to_string();
    }

    let main = host
        .strip_prefix("www.")
        .unwrap_or(host)
        .split('.')
        .next()
        .unwrap_or(host);
    let mut chars = main.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_fallback() {
        let label = source_label(None, "https://www.nytimes.com/article").unwrap();
        assert_eq!(label, "nytimes.com");

        let label = source_label(Some(String::new()), "https://news.ycombinator.com/item").unwrap();
        assert_eq!(label, "news.ycombinator.com");
    }

    #[test]
    fn test_explicit_source_wins() {
        let label = source_label(Some("Reuters".into()), "not a url").unwrap();
        assert_eq!(label, "Reuters");
    }

    #[test]
    fn test_invalid_link_is_surfaced() {
        let err = source_label(None, "not a url").unwrap_err();
        assert!(matches!(err, AppError::InvalidLink { .. }));

        let err = source_label(None, "").unwrap_err();
        assert!(matches!(err, AppError::InvalidLink { .. }));
    }

    #[test]
    fn test_site_name_known_and_generic() {
        assert_eq!(site_name("https://github.com/rust-lang/rust"), "GitHub");
        assert_eq!(site_name("https://music.youtube.com/watch?v=1"), "YouTube Music");
        assert_eq!(site_name("https://m.youtube.com/watch?v=1"), "YouTube");
        assert_eq!(site_name("https://en.wikipedia.org/wiki/Rust"), "Wikipedia");
        assert_eq!(site_name("https://www.nytimes.com/a"), "Nytimes");
        assert_eq!(site_name("nonsense"), "nonsense");
    }
}
