//! Per-entity field metadata.
//!
//! Each entity type exposed through a list endpoint supplies one
//! [`EntitySchema`] describing which fields can be filtered, sorted and
//! projected, and how their raw string values are typed.
//!
//! ```rust
//! use pagequery::{EntitySchema, FieldType};
//!
//! let schema = EntitySchema::new("service_instances", "id")
//!     .field("id", FieldType::Integer)
//!     .field("name", FieldType::String)
//!     .field("status", FieldType::enumeration(["ACTIVE", "INACTIVE"]))
//!     .field("tags", FieldType::String)
//!     .multi_valued("tags")
//!     .hidden("secret", FieldType::String);
//! assert!(schema.get("name").unwrap().searchable);
//! ```

use std::collections::BTreeMap;
use std::fmt;

/// Declared type of a field; drives value coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    /// RFC 3339 text or epoch milliseconds
    Timestamp,
    Uuid,
    /// Closed set of variants, matched case-insensitively
    Enum(Vec<String>),
}

impl FieldType {
    pub fn enumeration<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(variants.into_iter().map(Into::into).collect())
    }

    /// Whether `<`, `<=`, `>`, `>=` make sense
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        !matches!(self, Self::Boolean)
    }

    /// Whether substring matching makes sense
    #[must_use]
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::String | Self::Enum(_))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::Boolean => f.write_str("boolean"),
            Self::Timestamp => f.write_str("timestamp"),
            Self::Uuid => f.write_str("uuid"),
            Self::Enum(variants) => write!(f, "one of [{}]", variants.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub field_type: FieldType,
    pub searchable: bool,
    pub sortable: bool,
    /// Field holds a list of values of `field_type`
    pub multi_valued: bool,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            searchable: true,
            sortable: true,
            multi_valued: false,
        }
    }
}

/// Field set of one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub entity: String,
    /// Unique, always-increasing field appended to every sort
    pub identity_field: String,
    pub fields: BTreeMap<String, FieldDescriptor>,
    /// Large collections may refuse unlimited queries
    pub large: bool,
}

impl EntitySchema {
    pub fn new(entity: impl Into<String>, identity_field: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            identity_field: identity_field.into(),
            fields: BTreeMap::new(),
            large: false,
        }
    }

    /// Searchable and sortable field
    #[must_use]
    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.with_descriptor(name, FieldDescriptor::new(field_type))
    }

    /// Field that can be projected but neither filtered nor sorted
    #[must_use]
    pub fn hidden(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.with_descriptor(
            name,
            FieldDescriptor {
                searchable: false,
                sortable: false,
                ..FieldDescriptor::new(field_type)
            },
        )
    }

    #[must_use]
    pub fn with_descriptor(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.insert(name.into(), descriptor);
        self
    }

    /// Mark an already declared field as list-valued (and therefore unsortable)
    #[must_use]
    pub fn multi_valued(mut self, name: &str) -> Self {
        if let Some(descriptor) = self.fields.get_mut(name) {
            descriptor.multi_valued = true;
            descriptor.sortable = false;
        }
        self
    }

    #[must_use]
    pub fn unsortable(mut self, name: &str) -> Self {
        if let Some(descriptor) = self.fields.get_mut(name) {
            descriptor.sortable = false;
        }
        self
    }

    #[must_use]
    pub fn large(mut self) -> Self {
        self.large = true;
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn searchable(&self, name: &str) -> Option<&FieldDescriptor> {
        self.get(name).filter(|d| d.searchable)
    }

    #[must_use]
    pub fn sortable(&self, name: &str) -> Option<&FieldDescriptor> {
        self.get(name).filter(|d| d.sortable)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}
