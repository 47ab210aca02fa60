use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::predicate::{Comparison, CompiledQuery, Predicate, SortKey, TypedValue};
use crate::config::PageConfig;
use crate::errors::QueryError;
use crate::filtering::FilterOperator;
use crate::models::{FilterClause, PageRequest, Projection, SortDirection, Window};
use crate::schema::{EntitySchema, FieldDescriptor, FieldType};

/// Compiles a [`PageRequest`] against an [`EntitySchema`].
///
/// Stateless apart from its configuration; one translator can serve every
/// entity type and every request concurrently.
#[derive(Debug, Clone, Default)]
pub struct QueryTranslator {
    config: PageConfig,
}

impl QueryTranslator {
    #[must_use]
    pub fn new(config: PageConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Validate, coerce and compile one request.
    ///
    /// # Errors
    /// - `InvalidPagination` / `InvalidProjection` from request validation,
    ///   or a projection naming a field the entity does not have
    /// - `MalformedFilter` for a clause whose value count does not fit its operator
    /// - `UnknownFilterField` / `UnknownSortField` for fields that are not
    ///   searchable / sortable on this entity
    /// - `FilterTypeMismatch` when a value does not coerce to the field type
    ///   or the operator does not apply to it
    /// - `UnlimitedRefused` for an unlimited request against a large entity
    ///   while the guard is on
    pub fn translate(&self, request: PageRequest, schema: &EntitySchema) -> Result<CompiledQuery, QueryError> {
        let (window, projection) = request.validate(&self.config)?;

        if window == Window::Unlimited {
            if schema.large && self.config.refuse_unlimited_on_large {
                return Err(QueryError::UnlimitedRefused {
                    entity: schema.entity.clone(),
                });
            }
            tracing::warn!(entity = %schema.entity, "Compiling unlimited query");
        }

        let projection = check_projection(projection, schema)?;
        let predicate = build_predicate(&request, schema)?;
        let sort = build_sort(&request, schema)?;

        tracing::debug!(
            entity = %schema.entity,
            comparisons = predicate.comparison_count(),
            sort_keys = sort.len(),
            offset = window.offset(),
            limit = ?window.limit(),
            "Compiled paged query"
        );

        Ok(CompiledQuery {
            entity: schema.entity.clone(),
            predicate,
            sort,
            window,
            projection,
        })
    }
}

fn check_projection(projection: Projection, schema: &EntitySchema) -> Result<Projection, QueryError> {
    if let Projection::Include(names) | Projection::Exclude(names) = &projection {
        if let Some(unknown) = names.iter().find(|name| !schema.contains(name)) {
            return Err(QueryError::InvalidProjection(format!(
                "unknown field '{unknown}' for {}",
                schema.entity
            )));
        }
    }
    Ok(match projection {
        Projection::Include(mut fields) => {
            fields.insert(schema.identity_field.clone());
            Projection::Include(fields)
        }
        other => other,
    })
}

fn build_predicate(request: &PageRequest, schema: &EntitySchema) -> Result<Predicate, QueryError> {
    let mut parts = request
        .filters
        .iter()
        .enumerate()
        .map(|(index, clause)| compile_clause(&format!("search[{index}]"), clause, schema))
        .collect::<Result<Vec<_>, _>>()?;

    if !request.or_groups.is_empty() {
        let groups = request
            .or_groups
            .iter()
            .enumerate()
            .map(|(group, clauses)| {
                clauses
                    .iter()
                    .enumerate()
                    .map(|(index, clause)| compile_clause(&format!("or[{group}][{index}]"), clause, schema))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Predicate::all)
            })
            .collect::<Result<Vec<_>, _>>()?;
        parts.push(Predicate::any(groups));
    }

    Ok(Predicate::all(parts))
}

fn compile_clause(parameter: &str, clause: &FilterClause, schema: &EntitySchema) -> Result<Predicate, QueryError> {
    clause.check_arity(parameter)?;
    let field = clause.field_name.as_str();
    let descriptor = schema
        .searchable(field)
        .ok_or_else(|| QueryError::UnknownFilterField {
            field: field.to_string(),
        })?;

    check_operator(field, clause.operator, descriptor)?;

    let values = clause
        .values
        .iter()
        .map(|raw| coerce_for(field, clause.operator, &descriptor.field_type, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Predicate::Compare(Comparison {
        field: field.to_string(),
        field_type: descriptor.field_type.clone(),
        multi_valued: descriptor.multi_valued,
        operator: clause.operator,
        values,
    }))
}

fn check_operator(field: &str, operator: FilterOperator, descriptor: &FieldDescriptor) -> Result<(), QueryError> {
    let ty = &descriptor.field_type;
    if operator.is_ordering() && !ty.is_ordered() {
        return Err(QueryError::mismatch(
            field,
            operator.token(),
            format!("operator {operator} does not apply to {ty} fields"),
        ));
    }
    if operator.is_text_match() && !ty.is_textual() {
        return Err(QueryError::mismatch(
            field,
            operator.token(),
            format!("operator {operator} only applies to text fields, not {ty}"),
        ));
    }
    Ok(())
}

fn coerce_for(field: &str, operator: FilterOperator, ty: &FieldType, raw: &str) -> Result<TypedValue, QueryError> {
    if operator.is_text_match() {
        // substring of an enum variant, not a whole variant
        return Ok(TypedValue::String(raw.to_string()));
    }
    coerce(field, ty, raw)
}

/// Coerce one raw string to the field's declared type.
///
/// # Errors
/// `FilterTypeMismatch` naming the field and raw value.
pub fn coerce(field: &str, ty: &FieldType, raw: &str) -> Result<TypedValue, QueryError> {
    let trimmed = raw.trim();
    let mismatch = |expected: &str| QueryError::mismatch(field, raw, format!("expected {expected}"));
    match ty {
        FieldType::String => Ok(TypedValue::String(raw.to_string())),
        FieldType::Integer => trimmed
            .parse::<i64>()
            .map(TypedValue::Integer)
            .map_err(|_| mismatch("an integer")),
        FieldType::Float => trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(TypedValue::Float)
            .ok_or_else(|| mismatch("a finite number")),
        FieldType::Boolean => {
            if trimmed.eq_ignore_ascii_case("true") {
                Ok(TypedValue::Boolean(true))
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(TypedValue::Boolean(false))
            } else {
                Err(mismatch("true or false"))
            }
        }
        FieldType::Timestamp => parse_timestamp(trimmed)
            .map(TypedValue::Timestamp)
            .ok_or_else(|| mismatch("an RFC 3339 timestamp or epoch milliseconds")),
        FieldType::Uuid => Uuid::parse_str(trimmed)
            .map(TypedValue::Uuid)
            .map_err(|_| mismatch("a UUID")),
        FieldType::Enum(variants) => variants
            .iter()
            .find(|variant| variant.eq_ignore_ascii_case(trimmed))
            .map(|variant| TypedValue::String(variant.clone()))
            .ok_or_else(|| mismatch(&ty.to_string())),
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    raw.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
}

fn build_sort(request: &PageRequest, schema: &EntitySchema) -> Result<Vec<SortKey>, QueryError> {
    let mut keys = request
        .sort_orders
        .iter()
        .map(|order| {
            schema
                .sortable(&order.field_name)
                .map(|_| SortKey {
                    field: order.field_name.clone(),
                    direction: order.direction,
                })
                .ok_or_else(|| QueryError::UnknownSortField {
                    field: order.field_name.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // the identity field makes the order total; anything after it is dead weight
    if let Some(position) = keys.iter().position(|k| k.field == schema.identity_field) {
        keys.truncate(position + 1);
    } else {
        keys.push(SortKey {
            field: schema.identity_field.clone(),
            direction: SortDirection::Asc,
        });
    }
    Ok(keys)
}
