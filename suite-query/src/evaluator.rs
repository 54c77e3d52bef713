//! Applies specifications to data sources
//!
//! Evaluation is pure: it narrows a lazy [`DataSource`] and hands it back
//! without touching the store. The soft-delete guard of the entity type is
//! always applied, ANDed with the specification's own criteria in a single
//! filter, so no specification can surface a deleted record.

use tokio_util::sync::CancellationToken;

use crate::error::Cancelled;
use crate::soft_delete::{Auditable, SoftDeleteFilter};
use crate::source::{DataSource, SourceResult};
use crate::specification::Specification;

/// Turns a [`Specification`] into a narrowed, still-lazy data source
///
/// # Example
///
/// ```rust
/// use suite_query::evaluator::SpecificationEvaluator;
/// use suite_query::predicate::{FilterCondition, FilterValue, Record};
/// use suite_query::soft_delete::Auditable;
/// use suite_query::source::{DataSource, InMemorySource};
/// use suite_query::specification::{OrderBy, Specification};
///
/// #[derive(Clone)]
/// struct Voucher {
///     code: &'static str,
///     deleted: bool,
/// }
///
/// impl Record for Voucher {
///     fn field(&self, name: &str) -> Option<FilterValue> {
///         (name == "code").then(|| self.code.into())
///     }
/// }
///
/// impl Auditable for Voucher {
///     fn is_deleted(&self) -> bool {
///         self.deleted
///     }
/// }
///
/// let source = InMemorySource::new(vec![
///     Voucher { code: "B", deleted: false },
///     Voucher { code: "A", deleted: true },
///     Voucher { code: "C", deleted: false },
/// ]);
/// let spec = Specification::<Voucher>::builder()
///     .criteria(FilterCondition::ne("code", "C"))
///     .order_by(OrderBy::asc("code"))
///     .build();
///
/// let narrowed = SpecificationEvaluator::evaluate(source, &spec);
/// assert_eq!(narrowed.predicates().len(), 1);
/// assert!(narrowed.predicates()[0].excludes_deleted());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecificationEvaluator;

impl SpecificationEvaluator {
    /// Narrow `source` by the soft-delete guard, criteria, expansions and order
    ///
    /// Expansion paths are applied depth-first in registration order, so a
    /// nested path always follows its parent.
    pub fn evaluate<T, S>(source: S, spec: &Specification<T>) -> S
    where
        T: Auditable + Send,
        S: DataSource<T>,
    {
        let base = SoftDeleteFilter::<T>::build();
        let predicate = match spec.criteria() {
            Some(criteria) => base.and(criteria.clone()),
            None => base,
        };

        let mut source = source.filter(predicate);
        for path in spec.expansion_paths() {
            source = source.expand(path);
        }
        if let Some(order) = spec.order_by() {
            source = source.order_by(order.clone());
        }
        source
    }

    /// Evaluate, apply the specification's own paging when enabled, and
    /// materialize
    ///
    /// Returns `Err(Cancelled)` if `cancel` fires first; store failures are
    /// the inner `SourceResult`.
    pub async fn list<T, S>(
        source: S,
        spec: &Specification<T>,
        cancel: &CancellationToken,
    ) -> Result<SourceResult<Vec<T>>, Cancelled>
    where
        T: Auditable + Send,
        S: DataSource<T>,
    {
        let mut source = Self::evaluate(source, spec);
        if let Some(paging) = spec.paging() {
            source = source.skip(paging.skip).take(paging.take);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(entity = std::any::type_name::<T>(), "List cancelled");
                Err(Cancelled)
            }
            result = source.materialize() => Ok(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{FilterCondition, FilterValue, Predicate, Record};
    use crate::source::{InMemorySource, InMemoryStore};
    use crate::specification::{ExpansionPath, OrderBy};

    #[derive(Debug, Clone, PartialEq)]
    struct Category {
        id: i64,
        parent_id: Option<&'static str>,
        active: bool,
        is_deleted: bool,
        trail: Vec<String>,
    }

    impl Record for Category {
        fn field(&self, name: &str) -> Option<FilterValue> {
            match name {
                "id" => Some(self.id.into()),
                "parent_id" => Some(self.parent_id.into()),
                "active" => Some(self.active.into()),
                _ => None,
            }
        }
    }

    impl Auditable for Category {
        fn is_deleted(&self) -> bool {
            self.is_deleted
        }
    }

    fn category(id: i64, parent_id: Option<&'static str>) -> Category {
        Category {
            id,
            parent_id,
            active: true,
            is_deleted: false,
            trail: Vec::new(),
        }
    }

    fn ids(items: &[Category]) -> Vec<i64> {
        items.iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_soft_delete_applied_without_criteria() {
        let source = SpecificationEvaluator::evaluate(
            InMemorySource::new(vec![category(1, None)]),
            &Specification::all(),
        );
        assert_eq!(
            source.predicates(),
            [Predicate::NotDeleted {
                column: "is_deleted"
            }]
        );
    }

    #[test]
    fn test_criteria_and_guard_in_one_filter() {
        let spec = Specification::<Category>::builder()
            .criteria(FilterCondition::eq("parent_id", "A"))
            .build();
        let source =
            SpecificationEvaluator::evaluate(InMemorySource::new(vec![category(1, None)]), &spec);
        assert_eq!(source.predicates().len(), 1);
        assert!(source.predicates()[0].excludes_deleted());
        assert_eq!(source.predicates()[0].conditions().count(), 1);
    }

    #[test]
    fn test_expansions_depth_first() {
        let spec = Specification::<Category>::builder()
            .include("subcategories.images.image")
            .include("vouchers")
            .include("subcategories.images")
            .include("subcategories.parent")
            .build();
        let source =
            SpecificationEvaluator::evaluate(InMemorySource::new(Vec::<Category>::new()), &spec);
        let applied: Vec<String> = source.expansions().iter().map(ToString::to_string).collect();
        assert_eq!(
            applied,
            [
                "subcategories",
                "subcategories.images",
                "subcategories.images.image",
                "subcategories.parent",
                "vouchers",
            ]
        );
    }

    #[test]
    fn test_order_applied() {
        let spec = Specification::<Category>::builder()
            .order_by(OrderBy::desc("id"))
            .build();
        let source =
            SpecificationEvaluator::evaluate(InMemorySource::new(Vec::<Category>::new()), &spec);
        assert_eq!(source.ordering(), Some(&OrderBy::desc("id")));
    }

    #[tokio::test]
    async fn test_deleted_never_returned_even_when_criteria_target_them() {
        let mut deleted = category(2, Some("A"));
        deleted.is_deleted = true;
        let spec = Specification::<Category>::builder()
            .criteria(FilterCondition::eq("id", 2_i64))
            .build();

        let items = SpecificationEvaluator::list(
            InMemorySource::new(vec![category(1, Some("A")), deleted]),
            &spec,
            &CancellationToken::new(),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_evaluation_is_idempotent() {
        let data: Vec<Category> = (1..=12)
            .map(|id| category(id, if id % 2 == 0 { Some("A") } else { Some("B") }))
            .collect();
        let spec = Specification::<Category>::builder()
            .criteria(FilterCondition::eq("parent_id", "A"))
            .order_by(OrderBy::desc("id"))
            .build();
        let cancel = CancellationToken::new();

        let first = SpecificationEvaluator::list(InMemorySource::new(data.clone()), &spec, &cancel)
            .await
            .unwrap()
            .unwrap();
        let second = SpecificationEvaluator::list(InMemorySource::new(data), &spec, &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(ids(&first), vec![12, 10, 8, 6, 4, 2]);
    }

    #[tokio::test]
    async fn test_list_applies_paging_hints() {
        let spec = Specification::<Category>::builder()
            .order_by(OrderBy::asc("id"))
            .paging(3, 2)
            .build();
        let items = SpecificationEvaluator::list(
            InMemorySource::new((1..=10).map(|id| category(id, None)).collect()),
            &spec,
            &CancellationToken::new(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(ids(&items), vec![4, 5]);
    }

    #[tokio::test]
    async fn test_list_runs_expanders_in_order() {
        let store = InMemoryStore::new(vec![category(1, None)])
            .with_expander("subcategories", |items: &mut [Category], _: &[Category]| {
                items.iter_mut().for_each(|c| c.trail.push("subcategories".into()));
                Ok(())
            })
            .with_expander(
                "subcategories.images",
                |items: &mut [Category], _: &[Category]| {
                    items.iter_mut().for_each(|c| c.trail.push("images".into()));
                    Ok(())
                },
            );
        let spec = Specification::<Category>::builder()
            .include_path(&ExpansionPath::from_segments(["subcategories", "images"]))
            .build();

        let items = SpecificationEvaluator::list(store.snapshot().await, &spec, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(items[0].trail, vec!["subcategories", "images"]);
    }

    #[tokio::test]
    async fn test_list_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = SpecificationEvaluator::list(
            InMemorySource::new(vec![category(1, None)]),
            &Specification::all(),
            &cancel,
        )
        .await;
        assert_eq!(outcome.unwrap_err(), Cancelled);
    }
}
