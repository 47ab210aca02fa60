//! Executes a [`CompiledQuery`] and assembles the page envelope.
//!
//! Count and fetch are two independent backend calls with no shared
//! snapshot. Concurrent writes between them can make `totalCount` drift
//! from the rows actually returned; the identity tie-break in every sort
//! keeps each individual fetch free of duplicates and holes.

use crate::config::PageConfig;
use crate::errors::QueryError;
use crate::models::{PageRequest, PageResponse, Window};
use crate::persistence::Persistence;
use crate::query::{CompiledQuery, QueryTranslator};
use crate::schema::EntitySchema;

/// Runs compiled queries against one backend.
#[derive(Debug, Clone)]
pub struct PageAssembler<'s, S> {
    store: &'s S,
}

impl<'s, S: Persistence> PageAssembler<'s, S> {
    #[must_use]
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Count, then fetch, then wrap.
    ///
    /// When the offset is at or past the total the fetch is skipped and an
    /// empty page is returned; `totalCount` still reports every match.
    ///
    /// # Errors
    /// `QueryError::Persistence` carrying the backend error unchanged.
    pub async fn execute(&self, query: CompiledQuery) -> Result<PageResponse<S::Row>, QueryError> {
        let total_count = self.store.count(&query.predicate).await?;

        let past_end = matches!(query.window, Window::Bounded { offset, .. } if offset >= total_count);
        let result_list = if past_end {
            Vec::new()
        } else {
            self.store
                .fetch(&query.predicate, &query.sort, query.window, &query.projection)
                .await?
        };

        tracing::debug!(
            entity = %query.entity,
            total_count,
            returned = result_list.len(),
            offset = query.offset(),
            "Assembled page"
        );

        Ok(PageResponse::new(result_list, total_count, query.window))
    }
}

/// Translate and execute one request in a single call.
///
/// # Errors
/// Any [`QueryError`] from validation, translation or the backend.
pub async fn paginate<S: Persistence>(
    store: &S,
    schema: &EntitySchema,
    config: &PageConfig,
    request: PageRequest,
) -> Result<PageResponse<S::Row>, QueryError> {
    let query = QueryTranslator::new(config.clone()).translate(request, schema)?;
    PageAssembler::new(store).execute(query).await
}
