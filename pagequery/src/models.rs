//! Request and response shapes of the paged query contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use utoipa::ToSchema;

use crate::config::{LimitPolicy, PageConfig};
use crate::errors::QueryError;
use crate::filtering::FilterOperator;

/// One `field <op> values` comparison.
///
/// Values stay raw strings until the translator knows the field's type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field_name: String,
    pub operator: FilterOperator,
    pub values: Vec<String>,
}

impl FilterClause {
    pub fn new<I, V>(field_name: impl Into<String>, operator: FilterOperator, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        Self {
            field_name: field_name.into(),
            operator,
            values: values.into_iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Clause for `EXISTS` / `NOT_EXISTS`
    pub fn presence(field_name: impl Into<String>, operator: FilterOperator) -> Self {
        Self {
            field_name: field_name.into(),
            operator,
            values: Vec::new(),
        }
    }

    /// Check the value count against the operator's arity.
    ///
    /// # Errors
    /// `MalformedFilter` naming `parameter` when the count does not fit.
    pub fn check_arity(&self, parameter: &str) -> Result<(), QueryError> {
        let arity = self.operator.arity();
        if arity.accepts(self.values.len()) {
            Ok(())
        } else {
            Err(QueryError::malformed(
                parameter,
                format!(
                    "operator {} on field '{}' takes {arity}, got {}",
                    self.operator,
                    self.field_name,
                    self.values.len()
                ),
            ))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }

    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field_name: String,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(field_name: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field_name: field_name.into(),
            direction,
        }
    }

    pub fn asc(field_name: impl Into<String>) -> Self {
        Self::new(field_name, SortDirection::Asc)
    }

    pub fn desc(field_name: impl Into<String>) -> Self {
        Self::new(field_name, SortDirection::Desc)
    }
}

/// Validated pagination bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Bounded { offset: u64, limit: u64 },
    /// Fetch every match. Expensive on big collections.
    Unlimited,
}

impl Window {
    #[must_use]
    pub fn offset(self) -> u64 {
        match self {
            Self::Bounded { offset, .. } => offset,
            Self::Unlimited => 0,
        }
    }

    #[must_use]
    pub fn limit(self) -> Option<u64> {
        match self {
            Self::Bounded { limit, .. } => Some(limit),
            Self::Unlimited => None,
        }
    }
}

/// Which fields the caller wants back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    All,
    Include(BTreeSet<String>),
    Exclude(BTreeSet<String>),
}

impl Projection {
    /// Whether `field` survives this projection
    #[must_use]
    pub fn keeps(&self, field: &str) -> bool {
        match self {
            Self::All => true,
            Self::Include(fields) => fields.contains(field),
            Self::Exclude(fields) => !fields.contains(field),
        }
    }
}

/// Filters, sort orders, projection and pagination bounds for one list call.
///
/// Offsets and limits are kept as given (signed, optional) so that
/// [`PageRequest::validate`] can report bad input instead of the parser
/// silently repairing it.
///
/// ```rust
/// use pagequery::{FilterOperator, PageRequest, SortOrder};
///
/// let request = PageRequest::new()
///     .add_filter("appId", FilterOperator::Eq, ["app-1"])
///     .add_sort(SortOrder::asc("name"))
///     .with_limit(50);
/// assert_eq!(request.filters.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Combined with AND
    pub filters: Vec<FilterClause>,
    /// Outer list OR, inner lists AND; the disjunction is AND-ed with `filters`
    pub or_groups: Vec<Vec<FilterClause>>,
    /// First entry is the primary key; later entries break ties
    pub sort_orders: Vec<SortOrder>,
    pub offset: i64,
    /// `None` means the configured default
    pub limit: Option<i64>,
    pub fields_included: BTreeSet<String>,
    pub fields_excluded: BTreeSet<String>,
    /// Bypass offset/limit and fetch every match
    pub unlimited: bool,
}

impl PageRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add_filter<I, V>(mut self, field: impl Into<String>, operator: FilterOperator, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.filters.push(FilterClause::new(field, operator, values));
        self
    }

    #[must_use]
    pub fn add_clause(mut self, clause: FilterClause) -> Self {
        self.filters.push(clause);
        self
    }

    /// Add one AND-group to the OR-disjunction
    #[must_use]
    pub fn add_or_group(mut self, group: Vec<FilterClause>) -> Self {
        self.or_groups.push(group);
        self
    }

    #[must_use]
    pub fn add_sort(mut self, order: SortOrder) -> Self {
        self.sort_orders.push(order);
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self.unlimited = false;
        self
    }

    #[must_use]
    pub fn unlimited(mut self) -> Self {
        self.unlimited = true;
        self.limit = None;
        self
    }

    /// Each entry is read like the wire `fields` value: split on `,`,
    /// trimmed, empty names dropped.
    #[must_use]
    pub fn add_fields_included<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field: String = field.into();
            self.fields_included.extend(split_field_list(&field));
        }
        self
    }

    /// Same splitting as [`PageRequest::add_fields_included`].
    #[must_use]
    pub fn add_fields_excluded<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field: String = field.into();
            self.fields_excluded.extend(split_field_list(&field));
        }
        self
    }

    /// Every clause, top-level first, then each OR-group in order
    pub fn clauses(&self) -> impl Iterator<Item = &FilterClause> {
        self.filters.iter().chain(self.or_groups.iter().flatten())
    }

    /// Validate pagination bounds and apply defaults.
    ///
    /// # Errors
    /// - `InvalidPagination` for a negative offset, or a limit outside
    ///   `[1, max_limit]` under [`LimitPolicy::Reject`]
    pub fn window(&self, config: &PageConfig) -> Result<Window, QueryError> {
        if self.offset < 0 {
            return Err(QueryError::InvalidPagination(format!(
                "offset must be >= 0, got {}",
                self.offset
            )));
        }
        if self.unlimited {
            return Ok(Window::Unlimited);
        }

        let max = i64::try_from(config.max_limit).unwrap_or(i64::MAX).max(1);
        let requested = self
            .limit
            .unwrap_or_else(|| i64::try_from(config.default_limit).unwrap_or(max));
        let limit = if (1..=max).contains(&requested) {
            requested
        } else {
            match config.limit_policy {
                LimitPolicy::Reject => {
                    return Err(QueryError::InvalidPagination(format!(
                        "limit must be between 1 and {max}, got {requested}"
                    )));
                }
                LimitPolicy::Clamp => {
                    let clamped = requested.clamp(1, max);
                    tracing::warn!(requested, clamped, "Clamped out-of-range page limit");
                    clamped
                }
            }
        };

        Ok(Window::Bounded {
            offset: self.offset.unsigned_abs(),
            limit: limit.unsigned_abs(),
        })
    }

    /// Resolve the two field selectors into one projection.
    ///
    /// # Errors
    /// `InvalidProjection` when both inclusion and exclusion are set.
    pub fn projection(&self) -> Result<Projection, QueryError> {
        match (self.fields_included.is_empty(), self.fields_excluded.is_empty()) {
            (true, true) => Ok(Projection::All),
            (false, true) => Ok(Projection::Include(self.fields_included.clone())),
            (true, false) => Ok(Projection::Exclude(self.fields_excluded.clone())),
            (false, false) => Err(QueryError::InvalidProjection(
                "fields and fields! cannot be combined".to_string(),
            )),
        }
    }

    /// Run every request-level check that does not need an entity schema.
    ///
    /// # Errors
    /// See [`Self::window`] and [`Self::projection`].
    pub fn validate(&self, config: &PageConfig) -> Result<(Window, Projection), QueryError> {
        let window = self.window(config)?;
        let projection = self.projection()?;
        Ok((window, projection))
    }
}

/// Comma-separated field list, trimmed, empty names dropped
pub(crate) fn split_field_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
}

/// One page of results plus the total match count.
///
/// Serializes as `{"resultList": [...], "totalCount": n, "offset": n, "limit": n}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub result_list: Vec<T>,
    /// Matches ignoring offset/limit
    pub total_count: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> PageResponse<T> {
    /// Build the envelope for a window. Unlimited pages report `offset = 0`
    /// and `limit = result_list.len()`.
    #[must_use]
    pub fn new(result_list: Vec<T>, total_count: u64, window: Window) -> Self {
        let (offset, limit) = match window {
            Window::Bounded { offset, limit } => (offset, limit),
            Window::Unlimited => (0, result_list.len() as u64),
        };
        Self {
            result_list,
            total_count,
            offset,
            limit,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.result_list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.result_list.is_empty()
    }

    /// More matches exist past this page
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.offset + (self.result_list.len() as u64) < self.total_count
    }

    pub fn map<U, F>(self, f: F) -> PageResponse<U>
    where
        F: FnMut(T) -> U,
    {
        PageResponse {
            result_list: self.result_list.into_iter().map(f).collect(),
            total_count: self.total_count,
            offset: self.offset,
            limit: self.limit,
        }
    }
}
