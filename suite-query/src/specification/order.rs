//! Ordering keys
//!
//! # Example
//!
//! ```rust
//! use suite_query::specification::{OrderBy, OrderDirection, SortField};
//!
//! const SORTABLE: &[SortField] = &[SortField::new("Id", "id"), SortField::new("Name", "name")];
//!
//! let order = OrderBy::parse("name", OrderDirection::Descending, SORTABLE).unwrap();
//! assert_eq!(order.key, "name");
//! assert!(OrderBy::parse("Secret", OrderDirection::Ascending, SORTABLE).is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    #[serde(rename = "asc", alias = "ASC", alias = "Asc", alias = "ascending")]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    #[serde(rename = "desc", alias = "DESC", alias = "Desc", alias = "descending")]
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

impl OrderDirection {
    /// Convert to SQL ORDER BY clause fragment
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// A sortable field exposed to callers
///
/// `name` is what callers send (`orderBy=CreatedAt`), `column` is the field
/// name the store knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortField {
    /// Public name, matched case-insensitively
    pub name: &'static str,
    /// Record field or column name
    pub column: &'static str,
}

impl SortField {
    /// Declare a sortable field
    pub const fn new(name: &'static str, column: &'static str) -> Self {
        Self { name, column }
    }
}

/// Ordering key plus direction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderBy {
    /// Record field or column to order by
    pub key: String,
    /// Sort direction
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Order by `key` ascending
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: OrderDirection::Ascending,
        }
    }

    /// Order by `key` descending
    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: OrderDirection::Descending,
        }
    }

    /// Resolve a caller-supplied sort field against an allow-list
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `requested` names no sortable field.
    pub fn parse(
        requested: &str,
        direction: OrderDirection,
        allowed: &[SortField],
    ) -> Result<Self, Error> {
        let requested = requested.trim();
        allowed
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(requested))
            .map(|field| Self {
                key: field.column.to_string(),
                direction,
            })
            .ok_or_else(|| {
                let names: Vec<&str> = allowed.iter().map(|field| field.name).collect();
                Error::Validation(format!(
                    "Unknown sort field '{}'; expected one of: {}",
                    requested,
                    names.join(", ")
                ))
            })
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key, self.direction)
    }
}
