use axum::{
    Json,
    http::{HeaderValue, header::HeaderMap},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::models::PageResponse;

/// Sanitize resource name by removing control characters for HTTP headers
fn sanitize_resource_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii() && !c.is_ascii_control()).collect()
}

/// Build the `Content-Range` header for a page.
///
/// Non-empty pages produce `<resource> <first>-<last>/<total>`, empty ones
/// `<resource> */<total>`. Control characters in `resource_name` are
/// stripped so the value is always a valid header.
#[must_use]
pub fn content_range<T>(resource_name: &str, page: &PageResponse<T>) -> HeaderMap {
    let safe_name = sanitize_resource_name(resource_name);
    let total = page.total_count;

    let range = if page.is_empty() {
        format!("{safe_name} */{total}")
    } else {
        let last = page.offset + page.len() as u64 - 1;
        format!("{safe_name} {}-{last}/{total}", page.offset)
    };

    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&range).unwrap_or_else(|_| HeaderValue::from_static("items */0"));
    headers.insert("Content-Range", value);
    headers
}

/// JSON page envelope with a `Content-Range` header.
///
/// ```rust,ignore
/// async fn list(PageQuery(request): PageQuery) -> Result<PagedJson<Value>, ApiError> {
///     let page = pagequery::paginate(&store, &schema, &config, request).await?;
///     Ok(PagedJson::new("instances", page))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PagedJson<T> {
    pub resource: String,
    pub page: PageResponse<T>,
}

impl<T> PagedJson<T> {
    #[must_use]
    pub fn new(resource: impl Into<String>, page: PageResponse<T>) -> Self {
        Self {
            resource: resource.into(),
            page,
        }
    }
}

impl<T: Serialize> IntoResponse for PagedJson<T> {
    fn into_response(self) -> Response {
        let headers = content_range(&self.resource, &self.page);
        (headers, Json(self.page)).into_response()
    }
}
