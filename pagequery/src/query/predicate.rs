//! Backend-agnostic query plan: a boolean tree of typed comparisons plus
//! sort keys, window and projection.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use crate::filtering::FilterOperator;
use crate::models::{Projection, SortDirection, Window};
use crate::schema::FieldType;

/// A filter value after coercion to its field's declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl TypedValue {
    /// Ordering between comparable values. Integers and floats compare
    /// numerically; any other cross-type pair is unordered.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::Uuid(a), Self::Uuid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => f.write_str(v),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Timestamp(v) => f.write_str(&v.to_rfc3339()),
            Self::Uuid(v) => write!(f, "{v}"),
        }
    }
}

/// One typed `field <op> values` test.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: String,
    pub field_type: FieldType,
    pub multi_valued: bool,
    pub operator: FilterOperator,
    pub values: Vec<TypedValue>,
}

/// Boolean expression over comparisons.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches everything
    True,
    Compare(Comparison),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Conjunction, flattening trivial cases
    #[must_use]
    pub fn all(mut parts: Vec<Self>) -> Self {
        parts.retain(|p| *p != Self::True);
        match parts.len() {
            0 => Self::True,
            1 => parts.remove(0),
            _ => Self::And(parts),
        }
    }

    /// Disjunction, flattening trivial cases. An empty disjunction matches
    /// nothing, so callers only build one from at least one group.
    #[must_use]
    pub fn any(mut parts: Vec<Self>) -> Self {
        if parts.contains(&Self::True) {
            return Self::True;
        }
        match parts.len() {
            1 => parts.remove(0),
            _ => Self::Or(parts),
        }
    }

    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }

    /// Number of leaf comparisons
    #[must_use]
    pub fn comparison_count(&self) -> usize {
        match self {
            Self::True => 0,
            Self::Compare(_) => 1,
            Self::And(parts) | Self::Or(parts) => parts.iter().map(Self::comparison_count).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Output of the translator, input of the persistence layer.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub entity: String,
    pub predicate: Predicate,
    /// Always ends with the entity's identity field
    pub sort: Vec<SortKey>,
    pub window: Window,
    pub projection: Projection,
}

impl CompiledQuery {
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.window.offset()
    }

    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.window.limit()
    }

    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.window == Window::Unlimited
    }
}
