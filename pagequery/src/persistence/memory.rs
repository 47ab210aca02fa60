use async_trait::async_trait;
use sea_orm::DbErr;
use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::Persistence;
use crate::filtering::FilterOperator;
use crate::models::{Projection, SortDirection, Window};
use crate::query::translator::parse_timestamp;
use crate::query::{Comparison, Predicate, SortKey, TypedValue};
use crate::schema::FieldType;

/// JSON document collection evaluated in process.
///
/// Field names may be dotted paths (`value.type`) into nested objects. A
/// missing or `null` field only satisfies `NOT_EXISTS`, the same as a SQL
/// `NULL` column.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    documents: Vec<Value>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new(documents: Vec<Value>) -> Self {
        Self { documents }
    }

    pub fn insert(&mut self, document: Value) {
        self.documents.push(document);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn matching(&self, predicate: &Predicate) -> impl Iterator<Item = &Value> {
        self.documents.iter().filter(move |doc| evaluate(predicate, doc))
    }
}

impl FromIterator<Value> for InMemoryStore {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[async_trait]
impl Persistence for InMemoryStore {
    type Row = Value;

    async fn count(&self, predicate: &Predicate) -> Result<u64, DbErr> {
        Ok(self.matching(predicate).count() as u64)
    }

    async fn fetch(
        &self,
        predicate: &Predicate,
        sort: &[SortKey],
        window: Window,
        projection: &Projection,
    ) -> Result<Vec<Value>, DbErr> {
        let mut rows: Vec<&Value> = self.matching(predicate).collect();
        rows.sort_by(|a, b| compare_documents(a, b, sort));

        let (skip, take) = match window {
            Window::Bounded { offset, limit } => (
                usize::try_from(offset).unwrap_or(usize::MAX),
                usize::try_from(limit).unwrap_or(usize::MAX),
            ),
            Window::Unlimited => (0, usize::MAX),
        };

        Ok(rows
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|doc| project(doc, projection))
            .collect())
    }
}

fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
        .filter(|value| !value.is_null())
}

/// Evaluate a predicate against one document.
#[must_use]
pub fn evaluate(predicate: &Predicate, document: &Value) -> bool {
    match predicate {
        Predicate::True => true,
        Predicate::Compare(comparison) => evaluate_comparison(comparison, document),
        Predicate::And(parts) => parts.iter().all(|p| evaluate(p, document)),
        Predicate::Or(parts) => parts.iter().any(|p| evaluate(p, document)),
    }
}

fn evaluate_comparison(comparison: &Comparison, document: &Value) -> bool {
    let Some(value) = lookup(document, &comparison.field) else {
        return comparison.operator == FilterOperator::NotExists;
    };

    let elements: Vec<&Value> = match value {
        Value::Array(items) if comparison.multi_valued => items.iter().collect(),
        other => vec![other],
    };

    let any_element = |op: FilterOperator| {
        elements
            .iter()
            .any(|element| element_matches(op, element, comparison))
    };

    match comparison.operator {
        FilterOperator::Exists => true,
        FilterOperator::NotExists => false,
        FilterOperator::Ne => !any_element(FilterOperator::Eq),
        FilterOperator::NotIn | FilterOperator::HasNone => !any_element(FilterOperator::In),
        FilterOperator::Has => any_element(FilterOperator::In),
        op => any_element(op),
    }
}

fn element_matches(op: FilterOperator, element: &Value, comparison: &Comparison) -> bool {
    if op.is_text_match() {
        let (Some(text), Some(needle)) = (element.as_str(), comparison.values.first().and_then(TypedValue::as_str))
        else {
            return false;
        };
        let text = text.to_lowercase();
        let needle = needle.to_lowercase();
        return match op {
            FilterOperator::Contains => text.contains(&needle),
            FilterOperator::StartsWith => text.starts_with(&needle),
            _ => text.ends_with(&needle),
        };
    }

    let Some(actual) = typed_from_json(element, &comparison.field_type) else {
        return false;
    };
    let ordering = |expected: &TypedValue| actual.compare(expected);

    match op {
        FilterOperator::In => comparison
            .values
            .iter()
            .any(|v| ordering(v) == Some(Ordering::Equal)),
        _ => {
            let Some(expected) = comparison.values.first() else {
                return false;
            };
            match (op, ordering(expected)) {
                (_, None) => false,
                (FilterOperator::Eq, Some(o)) => o == Ordering::Equal,
                (FilterOperator::Lt, Some(o)) => o == Ordering::Less,
                (FilterOperator::Le, Some(o)) => o != Ordering::Greater,
                (FilterOperator::Gt, Some(o)) => o == Ordering::Greater,
                (FilterOperator::Ge, Some(o)) => o != Ordering::Less,
                _ => false,
            }
        }
    }
}

fn typed_from_json(value: &Value, field_type: &FieldType) -> Option<TypedValue> {
    match field_type {
        FieldType::String | FieldType::Enum(_) => value.as_str().map(|s| TypedValue::String(s.to_string())),
        FieldType::Integer => value.as_i64().map(TypedValue::Integer),
        FieldType::Float => value.as_f64().map(TypedValue::Float),
        FieldType::Boolean => value.as_bool().map(TypedValue::Boolean),
        FieldType::Timestamp => {
            let parsed = match value {
                Value::String(s) => parse_timestamp(s),
                Value::Number(n) => n.as_i64().and_then(chrono::DateTime::from_timestamp_millis),
                _ => None,
            };
            parsed.map(TypedValue::Timestamp)
        }
        FieldType::Uuid => value
            .as_str()
            .and_then(|s| uuid::Uuid::parse_str(s).ok())
            .map(TypedValue::Uuid),
    }
}

/// Missing values sort first, like SQL `NULLS FIRST` on ascending order.
fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x
                    .as_f64()
                    .partial_cmp(&y.as_f64())
                    .unwrap_or(Ordering::Equal),
            },
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

fn compare_documents(a: &Value, b: &Value, sort: &[SortKey]) -> Ordering {
    for key in sort {
        let ordering = compare_json(lookup(a, &key.field), lookup(b, &key.field));
        let ordering = match key.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn project(document: &Value, projection: &Projection) -> Value {
    match (projection, document) {
        (Projection::All, _) => document.clone(),
        (_, Value::Object(fields)) => Value::Object(
            fields
                .iter()
                .filter(|(name, _)| projection.keeps(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect::<Map<_, _>>(),
        ),
        _ => document.clone(),
    }
}
