use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Query parameters accepted by paged list endpoints.
///
/// This type only documents the parameters for `OpenAPI`; requests are parsed
/// by [`PageQuery`](crate::PageQuery), which also accepts any number of
/// indexed clauses beyond the first one shown here.
///
/// # Filtering
/// Clauses are bracket-indexed from 0 with no gaps and are combined with AND:
/// ```text
/// search[0].field=status&search[0].op=EQ&search[0].value=ACTIVE
/// search[1].field=region&search[1].op=IN&search[1].value=eu&search[1].value=us
/// ```
/// OR-groups use a second index. Groups are OR-ed with each other and the
/// result is AND-ed with the `search` clauses:
/// ```text
/// or[0][0].field=name&or[0][0].op=STARTS_WITH&or[0][0].value=web
/// ```
///
/// # Sorting
/// `sort[N].field` with `sort[N].order` (`ASC` or `DESC`, default `ASC`).
/// The identity field is always appended as a final tie-break.
///
/// # Pagination
/// `offset` (default 0) and `limit` (default 20). `limit=UNLIMITED` returns
/// every match.
///
/// # Projection
/// `fields` keeps only the listed fields plus the identity field; `fields!`
/// drops the listed fields. The two cannot be combined.
#[derive(Deserialize, IntoParams, ToSchema, Default)]
#[into_params(parameter_in = Query)]
pub struct PageQueryParams {
    /// Field name of the first filter clause.
    #[serde(rename = "search[0].field")]
    #[param(example = "status")]
    pub search_field: Option<String>,
    /// Operator of the first filter clause: `EQ`, `NE`, `LT`, `LE`, `GT`, `GE`,
    /// `IN`, `NOT_IN`, `CONTAINS`, `STARTS_WITH`, `ENDS_WITH`, `EXISTS`,
    /// `NOT_EXISTS`, `HAS` or `HAS_NONE`.
    #[serde(rename = "search[0].op")]
    #[param(example = "EQ")]
    pub search_op: Option<String>,
    /// Value of the first filter clause; repeat the key for `IN`-style operators.
    #[serde(rename = "search[0].value")]
    #[param(example = "ACTIVE")]
    pub search_value: Option<String>,
    /// Primary sort field.
    #[serde(rename = "sort[0].field")]
    #[param(example = "name")]
    pub sort_field: Option<String>,
    /// Primary sort direction.
    #[serde(rename = "sort[0].order")]
    #[param(example = "ASC")]
    pub sort_order: Option<String>,
    /// Number of matches to skip.
    #[param(example = 0)]
    pub offset: Option<u64>,
    /// Page size, or `UNLIMITED`.
    #[param(example = "20")]
    pub limit: Option<String>,
    /// Comma-separated fields to include.
    #[param(example = "name,status")]
    pub fields: Option<String>,
    /// Comma-separated fields to exclude.
    #[serde(rename = "fields!")]
    #[param(example = "region")]
    pub fields_excluded: Option<String>,
}
