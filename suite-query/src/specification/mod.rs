//! Declarative query specifications
//!
//! A [`Specification`] describes how to carve a result set out of one entity
//! type: a filter predicate, relationship expansions, an ordering key, and
//! optional paging hints. Building one never touches a data source; it is an
//! immutable value that can be shared across concurrent requests.
//!
//! Call sites build specifications per use case, folding caller-supplied
//! filter values into the criteria. An absent or blank value omits its clause
//! entirely, so "no parent filter" means "any parent", not "parent is null".
//!
//! # Example
//!
//! ```rust
//! use suite_query::predicate::FilterCondition;
//! use suite_query::specification::{OrderBy, Specification};
//!
//! struct Category;
//!
//! let parent_id: Option<&str> = Some("A");
//! let search: Option<&str> = Some("   ");
//!
//! let spec = Specification::<Category>::builder()
//!     .and_when(parent_id, |id| FilterCondition::eq("parent_id", id))
//!     .and_when_text(search, |text| FilterCondition::contains("name", text))
//!     .criteria(FilterCondition::eq("active", true))
//!     .include("subcategories.images.image")
//!     .order_by(OrderBy::asc("name"))
//!     .build();
//!
//! // The blank search clause was omitted
//! assert_eq!(spec.criteria().unwrap().conditions().count(), 2);
//! assert_eq!(spec.expansion_paths().len(), 3);
//! assert!(!spec.is_paging_enabled());
//! ```

mod include;
mod order;

use std::fmt;
use std::marker::PhantomData;

pub use include::{ExpansionPath, Include, IncludeTree};
pub use order::{OrderBy, OrderDirection, SortField};

use crate::predicate::{and, Predicate};

/// Paging hints carried by a specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    /// Records to skip
    pub skip: u64,
    /// Maximum records to return
    pub take: u64,
}

/// Immutable description of filter, expansion, order, and paging intent for `T`
pub struct Specification<T> {
    criteria: Option<Predicate>,
    includes: IncludeTree,
    order_by: Option<OrderBy>,
    paging: Option<Paging>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Specification<T> {
    /// Start building a specification
    pub fn builder() -> SpecificationBuilder<T> {
        SpecificationBuilder::new()
    }

    /// A specification matching every non-deleted record, unordered
    pub fn all() -> Self {
        Self::builder().build()
    }

    /// The filter predicate; `None` matches everything
    pub fn criteria(&self) -> Option<&Predicate> {
        self.criteria.as_ref()
    }

    /// The include tree
    pub fn includes(&self) -> &IncludeTree {
        &self.includes
    }

    /// Every expansion path in the order the evaluator applies them
    pub fn expansion_paths(&self) -> Vec<ExpansionPath> {
        self.includes.walk()
    }

    /// The ordering key
    pub fn order_by(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    /// Whether the specification carries its own paging hints
    pub fn is_paging_enabled(&self) -> bool {
        self.paging.is_some()
    }

    /// Records to skip when paging is enabled
    pub fn skip(&self) -> u64 {
        self.paging.map_or(0, |paging| paging.skip)
    }

    /// Records to take when paging is enabled
    pub fn take(&self) -> Option<u64> {
        self.paging.map(|paging| paging.take)
    }

    /// The paging hints
    pub fn paging(&self) -> Option<Paging> {
        self.paging
    }
}

// Manual impls so `T` itself needs no bounds.
impl<T> Clone for Specification<T> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            includes: self.includes.clone(),
            order_by: self.order_by.clone(),
            paging: self.paging,
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Specification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("entity", &std::any::type_name::<T>())
            .field("criteria", &self.criteria)
            .field("includes", &self.includes)
            .field("order_by", &self.order_by)
            .field("paging", &self.paging)
            .finish()
    }
}

impl<T> PartialEq for Specification<T> {
    fn eq(&self, other: &Self) -> bool {
        self.criteria == other.criteria
            && self.includes == other.includes
            && self.order_by == other.order_by
            && self.paging == other.paging
    }
}

/// Builder for [`Specification`]
pub struct SpecificationBuilder<T> {
    clauses: Vec<Predicate>,
    includes: IncludeTree,
    order_by: Option<OrderBy>,
    paging: Option<Paging>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> SpecificationBuilder<T> {
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            clauses: Vec::new(),
            includes: IncludeTree::default(),
            order_by: None,
            paging: None,
            _entity: PhantomData,
        }
    }

    /// AND a predicate into the criteria
    #[must_use]
    pub fn criteria(mut self, predicate: impl Into<Predicate>) -> Self {
        self.clauses.push(predicate.into());
        self
    }

    /// AND a clause built from `value`, or omit it when `value` is `None`
    #[must_use]
    pub fn and_when<V, P, F>(self, value: Option<V>, clause: F) -> Self
    where
        F: FnOnce(V) -> P,
        P: Into<Predicate>,
    {
        match value {
            Some(value) => self.criteria(clause(value)),
            None => self,
        }
    }

    /// Like [`and_when`](Self::and_when) for text input: `None`, empty and
    /// whitespace-only values omit the clause; others are passed trimmed.
    #[must_use]
    pub fn and_when_text<S, P, F>(self, value: Option<S>, clause: F) -> Self
    where
        S: AsRef<str>,
        F: FnOnce(&str) -> P,
        P: Into<Predicate>,
    {
        match value.as_ref().map(|v| v.as_ref().trim()) {
            Some(text) if !text.is_empty() => {
                let predicate = clause(text).into();
                self.criteria(predicate)
            }
            _ => self,
        }
    }

    /// Register a dotted expansion path such as `"category.images.image"`
    #[must_use]
    pub fn include(self, dotted: &str) -> Self {
        self.include_path(&ExpansionPath::parse(dotted))
    }

    /// Register an expansion path
    #[must_use]
    pub fn include_path(mut self, path: &ExpansionPath) -> Self {
        self.includes.insert(path);
        self
    }

    /// Set the ordering key, replacing any previous one
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    /// Enable paging hints
    #[must_use]
    pub fn paging(mut self, skip: u64, take: u64) -> Self {
        self.paging = Some(Paging { skip, take });
        self
    }

    /// Finish the specification
    pub fn build(self) -> Specification<T> {
        let criteria = if self.clauses.is_empty() {
            None
        } else {
            Some(and(self.clauses)).filter(|predicate| !predicate.is_always())
        };

        Specification {
            criteria,
            includes: self.includes,
            order_by: self.order_by,
            paging: self.paging,
            _entity: PhantomData,
        }
    }
}

impl<T> Default for SpecificationBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::FilterCondition;

    struct Voucher;

    fn assert_send_sync<S: Send + Sync>() {}

    #[test]
    fn test_specification_is_send_sync() {
        // Holds no reference to T, so even a non-Sync entity type is fine
        assert_send_sync::<Specification<std::rc::Rc<Voucher>>>();
    }

    #[test]
    fn test_empty_specification() {
        let spec = Specification::<Voucher>::all();
        assert!(spec.criteria().is_none());
        assert!(spec.includes().is_empty());
        assert!(spec.order_by().is_none());
        assert!(!spec.is_paging_enabled());
        assert_eq!(spec.skip(), 0);
        assert_eq!(spec.take(), None);
    }

    #[test]
    fn test_absent_values_omit_clauses() {
        let parent: Option<String> = None;
        let spec = Specification::<Voucher>::builder()
            .and_when(parent, |id| FilterCondition::eq("parent_id", id))
            .and_when_text(Some(""), |text| FilterCondition::contains("name", text))
            .and_when_text(None::<&str>, |text| FilterCondition::contains("code", text))
            .build();
        assert!(spec.criteria().is_none());
    }

    #[test]
    fn test_present_values_are_conjoined() {
        let spec = Specification::<Voucher>::builder()
            .and_when(Some("pkg-1"), |id| FilterCondition::eq("package_id", id))
            .and_when(Some(true), |active| FilterCondition::eq("active", active))
            .build();
        let fields: Vec<_> = spec
            .criteria()
            .unwrap()
            .conditions()
            .map(|c| c.field.as_str())
            .collect();
        assert_eq!(fields, vec!["package_id", "active"]);
    }

    #[test]
    fn test_text_clause_is_trimmed() {
        let spec = Specification::<Voucher>::builder()
            .and_when_text(Some("  spa "), |text| FilterCondition::contains("name", text))
            .build();
        let condition = spec.criteria().unwrap().conditions().next().unwrap().clone();
        assert_eq!(condition, FilterCondition::contains("name", "spa"));
    }

    #[test]
    fn test_identity_criteria_collapses_to_none() {
        let spec = Specification::<Voucher>::builder()
            .criteria(Predicate::always())
            .build();
        assert!(spec.criteria().is_none());
    }

    #[test]
    fn test_duplicate_includes_are_idempotent() {
        let once = Specification::<Voucher>::builder()
            .include("package.images")
            .build();
        let twice = Specification::<Voucher>::builder()
            .include("package.images")
            .include("package.images")
            .include("package")
            .build();
        assert_eq!(once, twice);
        assert_eq!(twice.expansion_paths().len(), 2);
    }

    #[test]
    fn test_order_by_last_wins() {
        let spec = Specification::<Voucher>::builder()
            .order_by(OrderBy::asc("id"))
            .order_by(OrderBy::desc("created_at"))
            .build();
        assert_eq!(spec.order_by(), Some(&OrderBy::desc("created_at")));
    }

    #[test]
    fn test_paging_hints() {
        let spec = Specification::<Voucher>::builder().paging(20, 10).build();
        assert!(spec.is_paging_enabled());
        assert_eq!(spec.skip(), 20);
        assert_eq!(spec.take(), Some(10));
        assert_eq!(spec.paging(), Some(Paging { skip: 20, take: 10 }));
    }

    #[test]
    fn test_clone_is_equal() {
        let spec = Specification::<Voucher>::builder()
            .criteria(FilterCondition::eq("active", true))
            .include("package")
            .build();
        assert_eq!(spec.clone(), spec);
    }

    #[test]
    fn test_debug_names_entity() {
        let spec = Specification::<Voucher>::all();
        assert!(format!("{:?}", spec).contains("Voucher"));
    }
}
