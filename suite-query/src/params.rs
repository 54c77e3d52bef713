//! Page parameters accepted from callers
//!
//! [`PageParameters`] is the input contract shared by list endpoints. It is
//! plain data: each call site decides which of the filter fields it honours
//! and folds them into its specification.
//!
//! # Example
//!
//! ```rust
//! use suite_query::params::PageParameters;
//!
//! let params = PageParameters::default()
//!     .with_page(2)
//!     .with_page_size(25)
//!     .with_search_text("  spa ");
//!
//! assert_eq!(params.page_number, 2);
//! assert_eq!(params.page_size_or(10), 25);
//! assert_eq!(params.search_text(), Some("spa"));
//! assert_eq!(params.active, Some(true));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::specification::{OrderBy, OrderDirection, SortField};

/// Sort field used when the caller names none
pub const DEFAULT_ORDER_BY: &str = "Id";

/// Paging, ordering and filter input for list queries
///
/// Missing fields take their defaults, so an empty query string is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageParameters {
    /// 1-based page number; values below 1 are treated as 1
    pub page_number: i64,
    /// Records per page; `None` or values below 1 use the endpoint default
    pub page_size: Option<i64>,
    /// Public name of the sort field
    pub order_by: String,
    /// Sort direction
    pub order_direction: OrderDirection,
    /// Free-text search
    pub search_text: Option<String>,
    /// Only active (or inactive) records; `None` means either
    pub active: Option<bool>,
    /// Parent record filter
    pub parent_id: Option<String>,
    /// Category filter
    pub category_id: Option<String>,
    /// Featured flag filter
    pub featured: Option<bool>,
}

impl Default for PageParameters {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: None,
            order_by: DEFAULT_ORDER_BY.to_string(),
            order_direction: OrderDirection::Ascending,
            search_text: None,
            active: Some(true),
            parent_id: None,
            category_id: None,
            featured: None,
        }
    }
}

impl PageParameters {
    /// Set the page number
    #[must_use]
    pub fn with_page(mut self, page_number: i64) -> Self {
        self.page_number = page_number;
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Set the sort field and direction
    #[must_use]
    pub fn with_order(mut self, order_by: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by = order_by.into();
        self.order_direction = direction;
        self
    }

    /// Set the search text
    #[must_use]
    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    /// Set the parent filter
    #[must_use]
    pub fn with_parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set or clear the active filter
    #[must_use]
    pub fn with_active(mut self, active: Option<bool>) -> Self {
        self.active = active;
        self
    }

    /// The requested page size, or `default` when none was given
    pub fn page_size_or(&self, default: u64) -> i64 {
        self.page_size
            .unwrap_or_else(|| i64::try_from(default).unwrap_or(i64::MAX))
    }

    /// Trimmed search text; `None` when absent or blank
    pub fn search_text(&self) -> Option<&str> {
        self.search_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Resolve the requested ordering against an allow-list
    ///
    /// # Errors
    ///
    /// Returns a validation error when `orderBy` names no allowed field.
    pub fn ordering(&self, allowed: &[SortField]) -> Result<OrderBy> {
        OrderBy::parse(&self.order_by, self.order_direction, allowed)
    }
}
