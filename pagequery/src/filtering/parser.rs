//! Structural parse of the bracket-indexed query parameters.
//!
//! Recognised keys:
//!
//! | key | meaning |
//! |---|---|
//! | `search[N].field` / `.op` / `.value` | AND-ed filter clause, `value` repeatable |
//! | `or[G][N].field` / `.op` / `.value` | clause `N` of OR-group `G` |
//! | `sort[N].field` / `.order` | sort key, `order` defaults to `ASC` |
//! | `offset`, `limit` | `limit=UNLIMITED` fetches every match |
//! | `fields`, `fields!` | comma-separated inclusion / exclusion projection |
//!
//! Any other key is left for the endpoint. Values are kept as strings; the
//! translator coerces them once the entity schema is known.

use std::collections::BTreeMap;

use crate::errors::QueryError;
use crate::filtering::FilterOperator;
use crate::models::{FilterClause, PageRequest, SortDirection, SortOrder, split_field_list};

pub(crate) const SEARCH_PREFIX: &str = "search";
pub(crate) const OR_PREFIX: &str = "or";
pub(crate) const SORT_PREFIX: &str = "sort";
pub(crate) const UNLIMITED_TOKEN: &str = "UNLIMITED";

#[derive(Default)]
struct ClauseParts {
    field: Option<String>,
    op: Option<String>,
    values: Vec<String>,
}

#[derive(Default)]
struct SortParts {
    field: Option<String>,
    order: Option<String>,
}

#[derive(Default)]
struct Collected {
    search: BTreeMap<usize, ClauseParts>,
    or_groups: BTreeMap<usize, BTreeMap<usize, ClauseParts>>,
    sort: BTreeMap<usize, SortParts>,
    offset: Option<String>,
    limit: Option<String>,
    fields: Option<String>,
    fields_excluded: Option<String>,
}

/// Parse a raw query string such as `search[0].field=status&search[0].op=EQ&...`.
///
/// # Errors
/// See [`parse_params`].
pub fn parse_query_string(query: &str) -> Result<PageRequest, QueryError> {
    parse_params(url::form_urlencoded::parse(query.as_bytes()))
}

/// Parse a key/value multimap into a [`PageRequest`].
///
/// Pure: the same pairs always produce the same request.
///
/// # Errors
/// - `MalformedFilter` for a group missing `field` or `op`, an unknown
///   operator, a value count that does not fit the operator, an unknown
///   attribute, a repeated single-valued attribute, or an index gap
/// - `InvalidPagination` for a non-integer or repeated `offset` / `limit`
pub fn parse_params<I, K, V>(params: I) -> Result<PageRequest, QueryError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut collected = Collected::default();
    for (key, value) in params {
        collect_pair(&mut collected, key.as_ref(), value.as_ref())?;
    }
    build_request(collected)
}

fn collect_pair(collected: &mut Collected, key: &str, value: &str) -> Result<(), QueryError> {
    match key {
        "offset" => set_once_pagination(&mut collected.offset, key, value),
        "limit" => set_once_pagination(&mut collected.limit, key, value),
        "fields" => set_once_projection(&mut collected.fields, key, value),
        "fields!" => set_once_projection(&mut collected.fields_excluded, key, value),
        _ => {
            if let Some(rest) = strip_group_prefix(key, SEARCH_PREFIX) {
                let (index, attr) = split_index(key, rest)?;
                let attr = strip_attr(key, attr)?;
                let parts = collected.search.entry(index).or_default();
                apply_clause_attr(parts, key, attr, value)
            } else if let Some(rest) = strip_group_prefix(key, OR_PREFIX) {
                let (group, rest) = split_index(key, rest)?;
                let (index, attr) = split_index(key, rest)?;
                let attr = strip_attr(key, attr)?;
                let parts = collected
                    .or_groups
                    .entry(group)
                    .or_default()
                    .entry(index)
                    .or_default();
                apply_clause_attr(parts, key, attr, value)
            } else if let Some(rest) = strip_group_prefix(key, SORT_PREFIX) {
                let (index, attr) = split_index(key, rest)?;
                let attr = strip_attr(key, attr)?;
                let parts = collected.sort.entry(index).or_default();
                apply_sort_attr(parts, key, attr, value)
            } else {
                Ok(())
            }
        }
    }
}

/// `search[0].field` -> `[0].field`; `searchTerm` -> None
fn strip_group_prefix<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix).filter(|rest| rest.starts_with('['))
}

/// `[12].field` -> (12, `.field`)
fn split_index<'a>(key: &str, rest: &'a str) -> Result<(usize, &'a str), QueryError> {
    let inner = rest
        .strip_prefix('[')
        .ok_or_else(|| QueryError::malformed(key, "expected '[' index"))?;
    let close = inner
        .find(']')
        .ok_or_else(|| QueryError::malformed(key, "unterminated '[' index"))?;
    let digits = &inner[..close];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QueryError::malformed(
            key,
            format!("index '{digits}' is not a non-negative integer"),
        ));
    }
    let index = digits
        .parse::<usize>()
        .map_err(|_| QueryError::malformed(key, format!("index '{digits}' is too large")))?;
    Ok((index, &inner[close + 1..]))
}

fn strip_attr<'a>(key: &str, rest: &'a str) -> Result<&'a str, QueryError> {
    rest.strip_prefix('.')
        .filter(|attr| !attr.is_empty())
        .ok_or_else(|| QueryError::malformed(key, "expected '.<attribute>' after index"))
}

fn apply_clause_attr(
    parts: &mut ClauseParts,
    key: &str,
    attr: &str,
    value: &str,
) -> Result<(), QueryError> {
    match attr {
        "field" => set_once(&mut parts.field, key, value),
        "op" => set_once(&mut parts.op, key, value),
        "value" => {
            parts.values.push(value.to_string());
            Ok(())
        }
        other => Err(QueryError::malformed(
            key,
            format!("unknown attribute '{other}', expected field, op or value"),
        )),
    }
}

fn apply_sort_attr(parts: &mut SortParts, key: &str, attr: &str, value: &str) -> Result<(), QueryError> {
    match attr {
        "field" => set_once(&mut parts.field, key, value),
        "order" => set_once(&mut parts.order, key, value),
        other => Err(QueryError::malformed(
            key,
            format!("unknown attribute '{other}', expected field or order"),
        )),
    }
}

fn set_once(slot: &mut Option<String>, key: &str, value: &str) -> Result<(), QueryError> {
    if slot.is_some() {
        return Err(QueryError::malformed(key, "given more than once"));
    }
    *slot = Some(value.to_string());
    Ok(())
}

fn set_once_pagination(slot: &mut Option<String>, key: &str, value: &str) -> Result<(), QueryError> {
    if slot.is_some() {
        return Err(QueryError::InvalidPagination(format!("{key} given more than once")));
    }
    *slot = Some(value.to_string());
    Ok(())
}

fn set_once_projection(slot: &mut Option<String>, key: &str, value: &str) -> Result<(), QueryError> {
    if slot.is_some() {
        return Err(QueryError::InvalidProjection(format!("{key} given more than once")));
    }
    *slot = Some(value.to_string());
    Ok(())
}

/// Indices must run 0, 1, 2, ... with no holes.
fn check_contiguous<T>(entries: &BTreeMap<usize, T>, describe: impl Fn(usize) -> String) -> Result<(), QueryError> {
    for (expected, &index) in entries.keys().enumerate() {
        if index != expected {
            return Err(QueryError::malformed(
                describe(index),
                format!("index {index} present but {} missing", describe(expected)),
            ));
        }
    }
    Ok(())
}

fn build_clauses(
    parts: BTreeMap<usize, ClauseParts>,
    describe: impl Fn(usize) -> String,
) -> Result<Vec<FilterClause>, QueryError> {
    check_contiguous(&parts, &describe)?;
    parts
        .into_iter()
        .map(|(index, parts)| build_clause(&describe(index), parts))
        .collect()
}

fn build_clause(parameter: &str, parts: ClauseParts) -> Result<FilterClause, QueryError> {
    let field = match parts.field {
        Some(field) if !field.trim().is_empty() => field.trim().to_string(),
        Some(_) => return Err(QueryError::malformed(parameter, "field must not be empty")),
        None if parts.op.is_some() => {
            return Err(QueryError::malformed(parameter, "op given without field"));
        }
        None => return Err(QueryError::malformed(parameter, "value given without field")),
    };
    let op_token = parts
        .op
        .ok_or_else(|| QueryError::malformed(parameter, format!("field '{field}' given without op")))?;
    let operator = FilterOperator::from_token(&op_token)
        .ok_or_else(|| QueryError::malformed(parameter, format!("unknown operator '{op_token}'")))?;

    if parts.values.is_empty() && !operator.is_presence_check() {
        return Err(QueryError::malformed(
            parameter,
            format!("operator {operator} on field '{field}' requires a value"),
        ));
    }

    let clause = FilterClause {
        field_name: field,
        operator,
        values: parts.values,
    };
    clause.check_arity(parameter)?;
    Ok(clause)
}

fn build_sort(parts: BTreeMap<usize, SortParts>) -> Result<Vec<SortOrder>, QueryError> {
    let describe = |index: usize| format!("{SORT_PREFIX}[{index}]");
    check_contiguous(&parts, describe)?;
    parts
        .into_iter()
        .map(|(index, parts)| {
            let parameter = describe(index);
            let field = parts
                .field
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .ok_or_else(|| QueryError::malformed(&parameter, "sort entry without field"))?;
            let direction = match parts.order {
                None => SortDirection::Asc,
                Some(token) => SortDirection::from_token(&token).ok_or_else(|| {
                    QueryError::malformed(&parameter, format!("order must be ASC or DESC, got '{token}'"))
                })?,
            };
            Ok(SortOrder::new(field, direction))
        })
        .collect()
}

fn parse_integer(key: &str, raw: &str) -> Result<i64, QueryError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| QueryError::InvalidPagination(format!("{key} must be an integer, got '{raw}'")))
}

fn build_request(collected: Collected) -> Result<PageRequest, QueryError> {
    let filters = build_clauses(collected.search, |index| format!("{SEARCH_PREFIX}[{index}]"))?;

    check_contiguous(&collected.or_groups, |group| format!("{OR_PREFIX}[{group}]"))?;
    let or_groups = collected
        .or_groups
        .into_iter()
        .map(|(group, clauses)| build_clauses(clauses, |index| format!("{OR_PREFIX}[{group}][{index}]")))
        .collect::<Result<Vec<_>, _>>()?;

    let sort_orders = build_sort(collected.sort)?;

    let offset = collected
        .offset
        .as_deref()
        .map(|raw| parse_integer("offset", raw))
        .transpose()?
        .unwrap_or(0);

    let (limit, unlimited) = match collected.limit.as_deref() {
        None => (None, false),
        Some(raw) if raw.trim().eq_ignore_ascii_case(UNLIMITED_TOKEN) => (None, true),
        Some(raw) => (Some(parse_integer("limit", raw)?), false),
    };

    Ok(PageRequest {
        filters,
        or_groups,
        sort_orders,
        offset,
        limit,
        fields_included: collected.fields.as_deref().map(split_field_list).into_iter().flatten().collect(),
        fields_excluded: collected
            .fields_excluded
            .as_deref()
            .map(split_field_list)
            .into_iter()
            .flatten()
            .collect(),
        unlimited,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pairs: &[(&str, &str)]) -> Result<PageRequest, QueryError> {
        parse_params(pairs.iter().copied())
    }

    #[test]
    fn test_empty_params_give_defaults() {
        let request = parse(&[]).unwrap();
        assert_eq!(request, PageRequest::default());
    }

    #[test]
    fn test_single_clause() {
        let request = parse(&[
            ("search[0].field", "status"),
            ("search[0].op", "eq"),
            ("search[0].value", "ACTIVE"),
        ])
        .unwrap();
        assert_eq!(
            request.filters,
            vec![FilterClause::new("status", FilterOperator::Eq, ["ACTIVE"])]
        );
    }

    #[test]
    fn test_clauses_ordered_by_index_not_arrival() {
        let request = parse(&[
            ("search[1].field", "b"),
            ("search[1].op", "EXISTS"),
            ("search[0].op", "IN"),
            ("search[0].value", "x"),
            ("search[0].field", "a"),
            ("search[0].value", "y"),
        ])
        .unwrap();
        assert_eq!(request.filters[0].field_name, "a");
        assert_eq!(request.filters[0].values, vec!["x", "y"]);
        assert_eq!(request.filters[1], FilterClause::presence("b", FilterOperator::Exists));
    }

    #[test]
    fn test_op_without_field_rejected() {
        let err = parse(&[("search[0].op", "EQ"), ("search[0].value", "1")]).unwrap_err();
        match err {
            QueryError::MalformedFilter { parameter, reason } => {
                assert_eq!(parameter, "search[0]");
                assert!(reason.contains("without field"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_field_without_op_rejected_before_schema_lookup() {
        let err = parse_query_string("search[0].field=unknownField").unwrap_err();
        match err {
            QueryError::MalformedFilter { parameter, reason } => {
                assert_eq!(parameter, "search[0]");
                assert!(reason.contains("'unknownField' given without op"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_index_gap_rejected() {
        let err = parse(&[
            ("search[0].field", "a"),
            ("search[0].op", "EXISTS"),
            ("search[2].field", "b"),
            ("search[2].op", "EXISTS"),
        ])
        .unwrap_err();
        match err {
            QueryError::MalformedFilter { parameter, reason } => {
                assert_eq!(parameter, "search[2]");
                assert!(reason.contains("search[1] missing"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_missing_value_rejected_unless_presence_check() {
        let err = parse(&[("search[0].field", "a"), ("search[0].op", "GT")]).unwrap_err();
        assert!(matches!(err, QueryError::MalformedFilter { .. }));

        let ok = parse(&[("search[0].field", "a"), ("search[0].op", "not_exists")]).unwrap();
        assert_eq!(ok.filters[0].operator, FilterOperator::NotExists);
    }

    #[test]
    fn test_too_many_values_for_eq_rejected() {
        let err = parse(&[
            ("search[0].field", "a"),
            ("search[0].op", "EQ"),
            ("search[0].value", "1"),
            ("search[0].value", "2"),
        ])
        .unwrap_err();
        assert!(matches!(err, QueryError::MalformedFilter { .. }));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let err = parse(&[
            ("search[0].field", "a"),
            ("search[0].op", "LIKE"),
            ("search[0].value", "x"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("LIKE"));
    }

    #[test]
    fn test_bad_index_and_attribute_rejected() {
        assert!(parse(&[("search[x].field", "a")]).is_err());
        assert!(parse(&[("search[0]", "a")]).is_err());
        assert!(parse(&[("search[0].colour", "a")]).is_err());
        assert!(parse(&[("sort[0].direction", "ASC")]).is_err());
        assert!(parse(&[("search[0.field", "a")]).is_err());
    }

    #[test]
    fn test_repeated_field_rejected() {
        let err = parse(&[("search[0].field", "a"), ("search[0].field", "b")]).unwrap_err();
        assert!(matches!(err, QueryError::MalformedFilter { .. }));
    }

    #[test]
    fn test_unrelated_keys_ignored() {
        let request = parse(&[("accountId", "acc-1"), ("searchTerm", "foo"), ("routingId", "r")]).unwrap();
        assert_eq!(request, PageRequest::default());
    }

    #[test]
    fn test_or_groups() {
        let request = parse(&[
            ("or[0][0].field", "status"),
            ("or[0][0].op", "EQ"),
            ("or[0][0].value", "ACTIVE"),
            ("or[1][0].field", "replicas"),
            ("or[1][0].op", "GE"),
            ("or[1][0].value", "3"),
            ("or[1][1].field", "region"),
            ("or[1][1].op", "EQ"),
            ("or[1][1].value", "eu"),
        ])
        .unwrap();
        assert_eq!(request.or_groups.len(), 2);
        assert_eq!(request.or_groups[0].len(), 1);
        assert_eq!(request.or_groups[1][1].field_name, "region");
    }

    #[test]
    fn test_or_group_gap_rejected() {
        let err = parse(&[("or[1][0].field", "a"), ("or[1][0].op", "EXISTS")]).unwrap_err();
        match err {
            QueryError::MalformedFilter { parameter, .. } => assert_eq!(parameter, "or[1]"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_sort_orders() {
        let request = parse(&[
            ("sort[0].field", "name"),
            ("sort[1].field", "createdAt"),
            ("sort[1].order", "desc"),
        ])
        .unwrap();
        assert_eq!(
            request.sort_orders,
            vec![SortOrder::asc("name"), SortOrder::desc("createdAt")]
        );
    }

    #[test]
    fn test_sort_bad_order_rejected() {
        assert!(parse(&[("sort[0].field", "name"), ("sort[0].order", "sideways")]).is_err());
        assert!(parse(&[("sort[0].order", "ASC")]).is_err());
    }

    #[test]
    fn test_pagination_values() {
        let request = parse(&[("offset", "40"), ("limit", "10")]).unwrap();
        assert_eq!(request.offset, 40);
        assert_eq!(request.limit, Some(10));

        // negative values survive parsing; validation rejects them later
        let negative = parse(&[("offset", "-1")]).unwrap();
        assert_eq!(negative.offset, -1);
    }

    #[test]
    fn test_unlimited_token() {
        let request = parse(&[("limit", "unlimited")]).unwrap();
        assert!(request.unlimited);
        assert_eq!(request.limit, None);
    }

    #[test]
    fn test_non_integer_pagination_rejected() {
        assert!(matches!(
            parse(&[("offset", "ten")]),
            Err(QueryError::InvalidPagination(_))
        ));
        assert!(matches!(
            parse(&[("limit", "1.5")]),
            Err(QueryError::InvalidPagination(_))
        ));
        assert!(matches!(
            parse(&[("limit", "1"), ("limit", "2")]),
            Err(QueryError::InvalidPagination(_))
        ));
    }

    #[test]
    fn test_projection_lists() {
        let request = parse(&[("fields", "name, status,,uuid")]).unwrap();
        assert_eq!(request.fields_included.len(), 3);
        assert!(request.fields_included.contains("status"));

        let excluded = parse(&[("fields!", "secret")]).unwrap();
        assert!(excluded.fields_excluded.contains("secret"));
    }

    #[test]
    fn test_query_string_decoding() {
        let request = parse_query_string(
            "search%5B0%5D.field=name&search[0].op=STARTS_WITH&search[0].value=web%20server&fields!=token",
        )
        .unwrap();
        assert_eq!(request.filters[0].values, vec!["web server"]);
        assert!(request.fields_excluded.contains("token"));
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let pairs = [
            ("search[0].field", "status"),
            ("search[0].op", "IN"),
            ("search[0].value", "A"),
            ("search[0].value", "B"),
            ("sort[0].field", "name"),
            ("limit", "5"),
        ];
        assert_eq!(parse(&pairs).unwrap(), parse(&pairs).unwrap());
    }
}
