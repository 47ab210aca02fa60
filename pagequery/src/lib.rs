//! Offset/limit pagination with bracket-indexed filters and sorts.
//!
//! A request travels through four stages:
//!
//! 1. [`filtering`] parses `search[N].*`, `or[G][N].*`, `sort[N].*`,
//!    `offset`, `limit` and `fields` parameters into a [`PageRequest`].
//! 2. [`PageRequest::validate`] checks the window and projection against a
//!    [`PageConfig`].
//! 3. [`QueryTranslator`] resolves field names against an [`EntitySchema`],
//!    coerces values and appends the identity tie-break to the sort.
//! 4. [`PageAssembler`] counts, fetches and wraps the rows in a
//!    [`PageResponse`].
//!
//! ```rust,ignore
//! async fn list(
//!     State(state): State<AppState>,
//!     PageQuery(request): PageQuery,
//! ) -> Result<PagedJson<serde_json::Value>, ApiError> {
//!     let page = paginate(&state.store, &state.schema, &state.config, request).await?;
//!     Ok(PagedJson::new("instances", page))
//! }
//! ```

pub mod assembler;
pub mod config;
pub mod docs;
pub mod errors;
pub mod extract;
pub mod filtering;
pub mod models;
pub mod pagination;
pub mod persistence;
pub mod query;
pub mod schema;

pub use assembler::{PageAssembler, paginate};
pub use config::{ConfigError, LimitPolicy, PageConfig};
pub use docs::PageQueryParams;
pub use errors::{ApiError, QueryError};
pub use extract::PageQuery;
pub use filtering::{FilterOperator, parse_params, parse_query_string, to_query_string};
pub use models::{FilterClause, PageRequest, PageResponse, Projection, SortDirection, SortOrder, Window};
pub use pagination::{PagedJson, content_range};
pub use persistence::{InMemoryStore, Persistence, SeaOrmStore};
pub use query::{CompiledQuery, Predicate, QueryTranslator};
pub use schema::{EntitySchema, FieldDescriptor, FieldType};
