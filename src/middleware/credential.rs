use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// The API key typed into the browser's masked credential field, sent as
/// `Authorization: Bearer <key>`. Absent when the header is missing or blank.
#[derive(Debug, Clone, Default)]
pub struct EnteredCredential(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for EnteredCredential {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(EnteredCredential(extract_bearer(parts)))
    }
}

fn extract_bearer(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
