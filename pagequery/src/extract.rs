//! Axum integration: parse the request query string into a [`PageRequest`].

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::errors::ApiError;
use crate::filtering::parse_query_string;
use crate::models::PageRequest;

/// Extractor for `search[N]`, `or[G][N]`, `sort[N]`, `offset`, `limit`,
/// `fields` and `fields!` parameters.
///
/// Only grammar is checked here. Field names and values are checked against
/// an [`EntitySchema`](crate::EntitySchema) when the request is translated.
/// Malformed input is rejected with `400 Bad Request`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageQuery(pub PageRequest);

impl<S: Send + Sync> FromRequestParts<S> for PageQuery {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();
        parse_query_string(query).map(PageQuery).map_err(|err| {
            tracing::debug!(error = %err, "Rejected paging parameters");
            ApiError::from(err)
        })
    }
}
