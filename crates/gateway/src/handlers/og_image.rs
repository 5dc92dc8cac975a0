//! Preview image handler

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use rsearch_common::errors::{AppError, Result};

#[derive(Debug, Deserialize)]
pub struct OgImageParams {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OgImageResponse {
    pub url: String,
}

/// Open Graph (or Twitter card) image of the page at `?url=`
pub async fn og_image(
    State(state): State<AppState>,
    Query(params): Query<OgImageParams>,
) -> Result<Json<OgImageResponse>> {
    let page = params
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| AppError::validation("url", "URL parameter is required"))?;

    match state.og_image.lookup(&page).await? {
        Some(url) => Ok(Json(OgImageResponse { url })),
        None => Err(AppError::NotFound {
            resource_type: "preview image".to_string(),
            id: page,
        }),
    }
}
