//! API handlers module

pub mod health;
pub mod og_image;
pub mod query;
pub mod rsearch;
pub mod search;

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use rsearch_common::errors::AppError;
use validator::ValidationErrors;

/// JSON body whose rejections render as `INVALID_FORMAT` API errors
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = axum::extract::rejection::JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(Self(value))
    }
}

/// Map validator failures onto the API error, naming the first bad field
pub(crate) fn invalid(errors: ValidationErrors) -> AppError {
    let field = errors.field_errors().keys().next().map(|field| field.to_string());
    AppError::Validation {
        message: errors.to_string(),
        field,
    }
}
