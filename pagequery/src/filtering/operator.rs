//! Filter operators and their arity rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Comparison operators accepted in `search[N].op`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    /// Equality (=)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Le,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Ge,
    /// Value is one of the listed values
    In,
    /// Value is none of the listed values
    NotIn,
    /// Case-insensitive substring match
    Contains,
    /// Case-insensitive prefix match
    StartsWith,
    /// Case-insensitive suffix match
    EndsWith,
    /// Field is present (IS NOT NULL)
    Exists,
    /// Field is absent (IS NULL)
    NotExists,
    /// Any element of the field equals one of the listed values
    Has,
    /// No element of the field equals any of the listed values
    HasNone,
}

/// How many values an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    None,
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::None => count == 0,
            Self::Exactly(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "no values"),
            Self::Exactly(1) => write!(f, "exactly one value"),
            Self::Exactly(n) => write!(f, "exactly {n} values"),
            Self::AtLeast(1) => write!(f, "one or more values"),
            Self::AtLeast(n) => write!(f, "at least {n} values"),
        }
    }
}

impl FilterOperator {
    pub const ALL: [Self; 15] = [
        Self::Eq,
        Self::Ne,
        Self::Lt,
        Self::Le,
        Self::Gt,
        Self::Ge,
        Self::In,
        Self::NotIn,
        Self::Contains,
        Self::StartsWith,
        Self::EndsWith,
        Self::Exists,
        Self::NotExists,
        Self::Has,
        Self::HasNone,
    ];

    /// Wire token for this operator
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Lt => "LT",
            Self::Le => "LE",
            Self::Gt => "GT",
            Self::Ge => "GE",
            Self::In => "IN",
            Self::NotIn => "NOT_IN",
            Self::Contains => "CONTAINS",
            Self::StartsWith => "STARTS_WITH",
            Self::EndsWith => "ENDS_WITH",
            Self::Exists => "EXISTS",
            Self::NotExists => "NOT_EXISTS",
            Self::Has => "HAS",
            Self::HasNone => "HAS_NONE",
        }
    }

    /// Parse an operator token, ignoring ASCII case
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|op| op.token().eq_ignore_ascii_case(token))
    }

    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Self::Eq
            | Self::Ne
            | Self::Lt
            | Self::Le
            | Self::Gt
            | Self::Ge
            | Self::Contains
            | Self::StartsWith
            | Self::EndsWith => Arity::Exactly(1),
            Self::In | Self::NotIn | Self::Has | Self::HasNone => Arity::AtLeast(1),
            Self::Exists | Self::NotExists => Arity::None,
        }
    }

    /// True for `EXISTS` / `NOT_EXISTS`, which carry no `value`
    #[must_use]
    pub const fn is_presence_check(self) -> bool {
        matches!(self, Self::Exists | Self::NotExists)
    }

    /// True for operators that need an ordered field type
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }

    /// True for the case-insensitive text matching operators
    #[must_use]
    pub const fn is_text_match(self) -> bool {
        matches!(self, Self::Contains | Self::StartsWith | Self::EndsWith)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| format!("unknown filter operator '{s}'"))
    }
}
