//! Inverse of the parser: turn a [`PageRequest`] back into query parameters.
//!
//! Useful for building "next page" links and for clients that construct
//! requests in Rust. Parsing the output yields an equal request.

use crate::models::{FilterClause, PageRequest};

use super::parser::{OR_PREFIX, SEARCH_PREFIX, SORT_PREFIX, UNLIMITED_TOKEN};

fn push_clause(pairs: &mut Vec<(String, String)>, prefix: &str, clause: &FilterClause) {
    pairs.push((format!("{prefix}.field"), clause.field_name.clone()));
    pairs.push((format!("{prefix}.op"), clause.operator.token().to_string()));
    for value in &clause.values {
        pairs.push((format!("{prefix}.value"), value.clone()));
    }
}

fn join_fields<'a>(fields: impl IntoIterator<Item = &'a String>) -> String {
    fields.into_iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Key/value pairs in the bracket-indexed convention.
#[must_use]
pub fn to_query_pairs(request: &PageRequest) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for (index, clause) in request.filters.iter().enumerate() {
        push_clause(&mut pairs, &format!("{SEARCH_PREFIX}[{index}]"), clause);
    }
    for (group, clauses) in request.or_groups.iter().enumerate() {
        for (index, clause) in clauses.iter().enumerate() {
            push_clause(&mut pairs, &format!("{OR_PREFIX}[{group}][{index}]"), clause);
        }
    }
    for (index, order) in request.sort_orders.iter().enumerate() {
        pairs.push((format!("{SORT_PREFIX}[{index}].field"), order.field_name.clone()));
        pairs.push((format!("{SORT_PREFIX}[{index}].order"), order.direction.token().to_string()));
    }

    if request.offset != 0 {
        pairs.push(("offset".to_string(), request.offset.to_string()));
    }
    if request.unlimited {
        pairs.push(("limit".to_string(), UNLIMITED_TOKEN.to_string()));
    } else if let Some(limit) = request.limit {
        pairs.push(("limit".to_string(), limit.to_string()));
    }

    if !request.fields_included.is_empty() {
        pairs.push(("fields".to_string(), join_fields(&request.fields_included)));
    }
    if !request.fields_excluded.is_empty() {
        pairs.push(("fields!".to_string(), join_fields(&request.fields_excluded)));
    }

    pairs
}

/// Percent-encoded query string, without the leading `?`.
#[must_use]
pub fn to_query_string(request: &PageRequest) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(to_query_pairs(request))
        .finish()
}

impl PageRequest {
    /// Same request moved to `offset`
    #[must_use]
    pub fn at_offset(&self, offset: u64) -> Self {
        let mut next = self.clone();
        next.offset = i64::try_from(offset).unwrap_or(i64::MAX);
        next
    }
}
