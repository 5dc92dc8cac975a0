use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{AppError, Result};

/// Search mode selected by the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Web,
    Images,
    Videos,
    News,
    Places,
    Shopping,
    Scholar,
    Patents,
}

impl SearchMode {
    pub const ALL: [SearchMode; 8] = [
        SearchMode::Web,
        SearchMode::Images,
        SearchMode::Videos,
        SearchMode::News,
        SearchMode::Places,
        SearchMode::Shopping,
        SearchMode::Scholar,
        SearchMode::Patents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Web => "web",
            SearchMode::Images => "images",
            SearchMode::Videos => "videos",
            SearchMode::News => "news",
            SearchMode::Places => "places",
            SearchMode::Shopping => "shopping",
            SearchMode::Scholar => "scholar",
            SearchMode::Patents => "patents",
        }
    }

    /// Provider endpoint path. Scholar and patents share the general endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            SearchMode::Images => "images",
            SearchMode::Videos => "videos",
            SearchMode::Places => "places",
            SearchMode::News => "news",
            SearchMode::Shopping => "shopping",
            SearchMode::Web | SearchMode::Scholar | SearchMode::Patents => "search",
        }
    }

    /// `(type, engine)` override sent alongside the query, if any.
    pub fn engine_override(&self) -> Option<(&'static str, &'static str)> {
        match self {
            SearchMode::Scholar => Some(("scholar", "google_scholar")),
            SearchMode::Patents => Some(("patents", "google")),
            _ => None,
        }
    }

    /// Name of the array field that carries this mode's items in the payload.
    pub fn collection_field(&self) -> &'static str {
        match self {
            SearchMode::Web | SearchMode::Scholar | SearchMode::Patents => "organic",
            SearchMode::Images => "images",
            SearchMode::Videos => "videos",
            SearchMode::News => "news",
            SearchMode::Places => "places",
            SearchMode::Shopping => "shopping",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let mode = match s.trim().to_ascii_lowercase().as_str() {
            "web" | "search" => SearchMode::Web,
            "images" => SearchMode::Images,
            "videos" => SearchMode::Videos,
            "news" => SearchMode::News,
            "places" => SearchMode::Places,
            "shopping" => SearchMode::Shopping,
            "scholar" => SearchMode::Scholar,
            "patents" => SearchMode::Patents,
            other => {
                return Err(AppError::validation(
                    "mode",
                    format!("unknown search mode {:?}", other),
                ))
            }
        };
        Ok(mode)
    }
}

/// One submitted search: immutable for the lifetime of its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub mode: SearchMode,
}

impl SearchQuery {
    /// Build a query, rejecting blank text.
    pub fn new(text: impl Into<String>, mode: SearchMode) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AppError::validation("query", "Search query is required"));
        }
        Ok(Self { text, mode })
    }
}
