//! Sea-ORM backend.
//!
//! Compiles a [`Predicate`] into a `sea_orm::Condition`, counts with
//! `PaginatorTrait::count` and fetches rows as JSON objects keyed by field
//! name.

use async_trait::async_trait;
use sea_orm::{
    Condition, DatabaseConnection, DbErr, EntityTrait, IdenStatic, Iterable, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Alias, Expr, Func, LikeExpr, SimpleExpr},
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::marker::PhantomData;

use super::Persistence;
use crate::filtering::FilterOperator;
use crate::models::{Projection, SortDirection, Window};
use crate::query::{Comparison, Predicate, SortKey, TypedValue};

/// Paged queries over one Sea-ORM entity.
///
/// Field names map to column names one-to-one unless overridden with
/// [`SeaOrmStore::with_column`].
///
/// ```rust,ignore
/// let store = SeaOrmStore::<cluster::Entity>::new(db.clone())
///     .with_column("createdAt", "created_at");
/// let page = pagequery::paginate(&store, &schema, &config, request).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SeaOrmStore<E> {
    db: DatabaseConnection,
    columns: HashMap<String, String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntityTrait> SeaOrmStore<E> {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            columns: HashMap::new(),
            _entity: PhantomData,
        }
    }

    /// Map an API field name onto a differently named column
    #[must_use]
    pub fn with_column(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.columns.insert(field.into(), column.into());
        self
    }

    fn column_for<'a>(&'a self, field: &'a str) -> &'a str {
        self.columns.get(field).map_or(field, String::as_str)
    }

    fn field_for<'a>(&'a self, column: &'a str) -> &'a str {
        self.columns
            .iter()
            .find(|(_, c)| c.as_str() == column)
            .map_or(column, |(field, _)| field.as_str())
    }

    fn column_expr(&self, field: &str) -> Expr {
        Expr::col(Alias::new(self.column_for(field)))
    }

    /// Build the `WHERE` condition for a predicate.
    ///
    /// # Errors
    /// `DbErr::Custom` for comparisons SQL cannot express portably
    /// (value operators on multi-valued fields).
    pub fn condition(&self, predicate: &Predicate) -> Result<Condition, DbErr> {
        Ok(match predicate {
            Predicate::True => Condition::all(),
            Predicate::Compare(comparison) => Condition::all().add(self.comparison(comparison)?),
            Predicate::And(parts) => parts
                .iter()
                .try_fold(Condition::all(), |acc, part| Ok::<_, DbErr>(acc.add(self.condition(part)?)))?,
            Predicate::Or(parts) => parts
                .iter()
                .try_fold(Condition::any(), |acc, part| Ok::<_, DbErr>(acc.add(self.condition(part)?)))?,
        })
    }

    fn comparison(&self, comparison: &Comparison) -> Result<SimpleExpr, DbErr> {
        let op = comparison.operator;
        if comparison.multi_valued && !op.is_presence_check() {
            return Err(DbErr::Custom(format!(
                "operator {op} on multi-valued field '{}' is not supported by the SQL backend",
                comparison.field
            )));
        }

        let column = self.column_expr(&comparison.field);
        let mut values = comparison.values.iter().map(to_sea_value);
        let mut first = || {
            values
                .next()
                .ok_or_else(|| DbErr::Custom(format!("operator {op} on '{}' has no value", comparison.field)))
        };

        Ok(match op {
            FilterOperator::Eq => column.eq(first()?),
            FilterOperator::Ne => column.ne(first()?),
            FilterOperator::Lt => column.lt(first()?),
            FilterOperator::Le => column.lte(first()?),
            FilterOperator::Gt => column.gt(first()?),
            FilterOperator::Ge => column.gte(first()?),
            FilterOperator::In | FilterOperator::Has => {
                column.is_in(comparison.values.iter().map(to_sea_value))
            }
            FilterOperator::NotIn | FilterOperator::HasNone => {
                column.is_not_in(comparison.values.iter().map(to_sea_value))
            }
            FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith => {
                let needle = comparison
                    .values
                    .first()
                    .and_then(TypedValue::as_str)
                    .unwrap_or_default();
                self.like_condition(&comparison.field, op, needle)
            }
            FilterOperator::Exists => column.is_not_null(),
            FilterOperator::NotExists => column.is_null(),
        })
    }

    /// Case-insensitive LIKE with `%` and `_` in the needle escaped
    fn like_condition(&self, field: &str, op: FilterOperator, needle: &str) -> SimpleExpr {
        let escaped = needle
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_")
            .to_uppercase();
        let pattern = match op {
            FilterOperator::StartsWith => format!("{escaped}%"),
            FilterOperator::EndsWith => format!("%{escaped}"),
            _ => format!("%{escaped}%"),
        };
        Expr::expr(Func::upper(self.column_expr(field))).like(LikeExpr::new(pattern).escape('\\'))
    }

    /// `(column, json key)` pairs surviving the projection
    fn selected_columns(&self, projection: &Projection) -> Vec<(String, String)> {
        E::Column::iter()
            .map(|column| {
                let name = column.as_str().to_string();
                let field = self.field_for(&name).to_string();
                (name, field)
            })
            .filter(|(_, field)| projection.keeps(field))
            .collect()
    }
}

fn to_sea_value(value: &TypedValue) -> sea_orm::Value {
    match value {
        TypedValue::String(v) => v.clone().into(),
        TypedValue::Integer(v) => (*v).into(),
        TypedValue::Float(v) => (*v).into(),
        TypedValue::Boolean(v) => (*v).into(),
        TypedValue::Timestamp(v) => (*v).into(),
        TypedValue::Uuid(v) => (*v).into(),
    }
}

#[async_trait]
impl<E> Persistence for SeaOrmStore<E>
where
    E: EntityTrait,
    E::Model: Sync,
{
    type Row = JsonValue;

    async fn count(&self, predicate: &Predicate) -> Result<u64, DbErr> {
        let condition = self.condition(predicate)?;
        E::find().filter(condition).count(&self.db).await
    }

    async fn fetch(
        &self,
        predicate: &Predicate,
        sort: &[SortKey],
        window: Window,
        projection: &Projection,
    ) -> Result<Vec<JsonValue>, DbErr> {
        let condition = self.condition(predicate)?;
        let mut select = E::find().filter(condition).select_only();

        for (column, field) in self.selected_columns(projection) {
            select = select.expr_as(SimpleExpr::from(Expr::col(Alias::new(column.as_str()))), field.as_str());
        }

        for key in sort {
            let order = match key.direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };
            select = select.order_by(SimpleExpr::from(self.column_expr(&key.field)), order);
        }

        if let Window::Bounded { offset, limit } = window {
            select = select.offset(offset).limit(limit);
        }

        select.into_json().all(&self.db).await
    }
}
