//! Soft-delete capability and base filter
//!
//! Any entity that marks deletion with a flag implements [`Auditable`]. The
//! evaluator asks [`SoftDeleteFilter`] for the standing base predicate of the
//! entity type, so deleted rows are excluded from every specification without
//! the specification author writing the clause.
//!
//! # Example
//!
//! ```rust
//! use suite_query::predicate::Predicate;
//! use suite_query::soft_delete::{Auditable, SoftDeleteFilter};
//!
//! struct Voucher {
//!     deleted: bool,
//! }
//!
//! impl Auditable for Voucher {
//!     const DELETED_COLUMN: &'static str = "deleted";
//!
//!     fn is_deleted(&self) -> bool {
//!         self.deleted
//!     }
//! }
//!
//! let base = SoftDeleteFilter::<Voucher>::build();
//! assert_eq!(base, Predicate::NotDeleted { column: "deleted" });
//! ```

use std::marker::PhantomData;

use crate::predicate::Predicate;

/// Capability of entities that are soft-deleted rather than removed
pub trait Auditable {
    /// Column holding the deletion flag in SQL-backed stores
    const DELETED_COLUMN: &'static str = "is_deleted";

    /// Whether the record has been soft-deleted
    fn is_deleted(&self) -> bool;
}

/// Builds the standing "not deleted" predicate for an auditable type
///
/// Only types implementing [`Auditable`] can ask for the filter, so a missing
/// accessor is a compile error rather than a runtime failure.
#[derive(Debug)]
pub struct SoftDeleteFilter<T> {
    _entity: PhantomData<fn() -> T>,
}

impl<T: Auditable> SoftDeleteFilter<T> {
    /// The base predicate excluding records with the deletion flag set
    pub fn build() -> Predicate {
        Predicate::NotDeleted {
            column: T::DELETED_COLUMN,
        }
    }
}
