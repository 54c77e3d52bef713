//! In-memory data source
//!
//! [`InMemoryStore`] owns a copy-on-write vector of records behind a tokio
//! `RwLock`. Each call to [`InMemoryStore::snapshot`] hands out an
//! [`InMemorySource`] over an immutable `Arc` of the current contents, so a
//! count and a fetch made through the same source always see the same rows,
//! regardless of concurrent writers.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{DataSource, SourceError, SourceOperation, SourceResult, Window};
use crate::predicate::{Predicate, Record};
use crate::soft_delete::Auditable;
use crate::specification::{ExpansionPath, OrderBy, OrderDirection};

/// Attaches related data for one expansion path
///
/// Receives the materialized page and the full snapshot it came from.
pub type Expander<T> = Arc<dyn Fn(&mut [T], &[T]) -> SourceResult<()> + Send + Sync>;

type Expanders<T> = Arc<HashMap<String, Expander<T>>>;

/// Lazy query over an immutable snapshot
pub struct InMemorySource<T> {
    snapshot: Arc<Vec<T>>,
    expanders: Expanders<T>,
    predicates: Vec<Predicate>,
    expansions: Vec<ExpansionPath>,
    order: Option<OrderBy>,
    window: Window,
}

impl<T> InMemorySource<T> {
    /// Query over `items` with no expanders registered
    pub fn new(items: Vec<T>) -> Self {
        Self::from_snapshot(Arc::new(items), Arc::new(HashMap::new()))
    }

    fn from_snapshot(snapshot: Arc<Vec<T>>, expanders: Expanders<T>) -> Self {
        Self {
            snapshot,
            expanders,
            predicates: Vec::new(),
            expansions: Vec::new(),
            order: None,
            window: Window::default(),
        }
    }

    /// Expansion paths applied so far, in application order
    pub fn expansions(&self) -> &[ExpansionPath] {
        &self.expansions
    }

    /// Predicates applied so far
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// The current ordering key
    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order.as_ref()
    }

    fn check_expansions(&self) -> SourceResult<()> {
        match self
            .expansions
            .iter()
            .find(|path| !self.expanders.contains_key(&path.to_string()))
        {
            Some(path) => Err(SourceError::validation_failed(
                SourceOperation::Expand,
                format!("Unknown include path '{}'", path),
            )
            .with_context(path.to_string())),
            None => Ok(()),
        }
    }
}

impl<T> InMemorySource<T>
where
    T: Record + Auditable + Clone,
{
    fn matching(&self) -> Vec<&T> {
        let mut matched: Vec<&T> = self
            .snapshot
            .iter()
            .filter(|record| self.predicates.iter().all(|p| p.matches(*record)))
            .collect();

        if let Some(order) = &self.order {
            matched.sort_by(|a, b| compare_by(*a, *b, order));
        }
        matched
    }

    fn count_now(&self) -> SourceResult<u64> {
        self.check_expansions()?;
        Ok(self.window.count(self.matching().len() as u64))
    }

    fn materialize_now(&self) -> SourceResult<Vec<T>> {
        self.check_expansions()?;
        let offset = usize::try_from(self.window.offset).unwrap_or(usize::MAX);
        let limit = self
            .window
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

        let mut items: Vec<T> = self
            .matching()
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        for path in &self.expansions {
            if let Some(expander) = self.expanders.get(&path.to_string()) {
                expander(&mut items, &self.snapshot)
                    .map_err(|e| e.with_operation(SourceOperation::Expand))?;
            }
        }
        Ok(items)
    }
}

/// Ascending order puts missing and null keys first; descending reverses it.
fn compare_by<T: Record>(a: &T, b: &T, order: &OrderBy) -> Ordering {
    let left = a.field(&order.key).filter(|v| !v.is_null());
    let right = b.field(&order.key).filter(|v| !v.is_null());
    let ordering = match (&left, &right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(l), Some(r)) => l.compare(r).unwrap_or(Ordering::Equal),
    };
    match order.direction {
        OrderDirection::Ascending => ordering,
        OrderDirection::Descending => ordering.reverse(),
    }
}

impl<T> Clone for InMemorySource<T> {
    fn clone(&self) -> Self {
        Self {
            snapshot: Arc::clone(&self.snapshot),
            expanders: Arc::clone(&self.expanders),
            predicates: self.predicates.clone(),
            expansions: self.expansions.clone(),
            order: self.order.clone(),
            window: self.window,
        }
    }
}

impl<T> fmt::Debug for InMemorySource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySource")
            .field("records", &self.snapshot.len())
            .field("predicates", &self.predicates)
            .field("expansions", &self.expansions)
            .field("order", &self.order)
            .field("window", &self.window)
            .finish()
    }
}

impl<T> DataSource<T> for InMemorySource<T>
where
    T: Record + Auditable + Clone + Send + Sync,
{
    fn filter(mut self, predicate: Predicate) -> Self {
        if !predicate.is_always() {
            self.predicates.push(predicate);
        }
        self
    }

    fn expand(mut self, path: ExpansionPath) -> Self {
        if !path.is_empty() {
            self.expansions.push(path);
        }
        self
    }

    fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    fn skip(mut self, n: u64) -> Self {
        self.window = self.window.skip(n);
        self
    }

    fn take(mut self, n: u64) -> Self {
        self.window = self.window.take(n);
        self
    }

    fn count(&self) -> impl Future<Output = SourceResult<u64>> + Send {
        std::future::ready(self.count_now())
    }

    fn materialize(self) -> impl Future<Output = SourceResult<Vec<T>>> + Send {
        std::future::ready(self.materialize_now())
    }

    // Both reads come from the same immutable snapshot.
    fn fetch_page(
        self,
        skip: u64,
        take: u64,
    ) -> impl Future<Output = SourceResult<(u64, Vec<T>)>> + Send {
        let result = self
            .count_now()
            .and_then(|total| Ok((total, self.skip(skip).take(take).materialize_now()?)));
        std::future::ready(result)
    }
}

/// Shared, mutable collection that hands out consistent snapshots
///
/// # Example
///
/// ```rust
/// use suite_query::predicate::{FilterValue, Record};
/// use suite_query::soft_delete::Auditable;
/// use suite_query::source::{DataSource, InMemoryStore};
///
/// #[derive(Clone)]
/// struct Tag {
///     name: &'static str,
///     deleted: bool,
/// }
///
/// impl Record for Tag {
///     fn field(&self, name: &str) -> Option<FilterValue> {
///         (name == "name").then(|| self.name.into())
///     }
/// }
///
/// impl Auditable for Tag {
///     fn is_deleted(&self) -> bool {
///         self.deleted
///     }
/// }
///
/// # tokio_test_runtime(async {
/// let store = InMemoryStore::new(vec![Tag { name: "spa", deleted: false }]);
/// let source = store.snapshot().await;
/// store.insert(Tag { name: "golf", deleted: false }).await;
///
/// // The earlier snapshot does not see the insert
/// assert_eq!(source.count().await.unwrap(), 1);
/// assert_eq!(store.snapshot().await.count().await.unwrap(), 2);
/// # });
/// # fn tokio_test_runtime(f: impl std::future::Future<Output = ()>) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct InMemoryStore<T> {
    items: RwLock<Arc<Vec<T>>>,
    expanders: Expanders<T>,
}

impl<T> InMemoryStore<T> {
    /// Create a store seeded with `items`
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(Arc::new(items)),
            expanders: Arc::new(HashMap::new()),
        }
    }

    /// Register the expander for a dotted include path
    ///
    /// Nested paths get their own expander; it runs after its parent's.
    #[must_use]
    pub fn with_expander<F>(mut self, path: &str, expander: F) -> Self
    where
        F: Fn(&mut [T], &[T]) -> SourceResult<()> + Send + Sync + 'static,
    {
        let key = ExpansionPath::parse(path).to_string();
        let mut expanders: HashMap<String, Expander<T>> = self
            .expanders
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();
        expanders.insert(key, Arc::new(expander));
        self.expanders = Arc::new(expanders);
        self
    }

    /// A lazy source over the current contents
    pub async fn snapshot(&self) -> InMemorySource<T> {
        let items = Arc::clone(&*self.items.read().await);
        InMemorySource::from_snapshot(items, Arc::clone(&self.expanders))
    }

    /// Number of records, deleted ones included
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Whether the store holds no records at all
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl<T: Clone> InMemoryStore<T> {
    /// Append a record
    pub async fn insert(&self, item: T) {
        self.modify(|items| items.push(item)).await;
    }

    /// Mutate the contents; outstanding snapshots keep the old copy
    pub async fn modify<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        let mut guard = self.items.write().await;
        f(Arc::make_mut(&mut *guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{FilterCondition, FilterValue};

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: i64,
        name: Option<&'static str>,
        deleted: bool,
        tags: Vec<&'static str>,
    }

    impl Record for Item {
        fn field(&self, name: &str) -> Option<FilterValue> {
            match name {
                "id" => Some(self.id.into()),
                "name" => Some(self.name.into()),
                _ => None,
            }
        }
    }

    impl Auditable for Item {
        fn is_deleted(&self) -> bool {
            self.deleted
        }
    }

    fn item(id: i64, name: Option<&'static str>) -> Item {
        Item {
            id,
            name,
            deleted: false,
            tags: Vec::new(),
        }
    }

    fn ids(items: &[Item]) -> Vec<i64> {
        items.iter().map(|i| i.id).collect()
    }

    #[tokio::test]
    async fn test_filter_is_lazy_and_anded() {
        let source = InMemorySource::new((1..=10).map(|id| item(id, Some("x"))).collect())
            .filter(FilterCondition::gt("id", 3_i64).into())
            .filter(FilterCondition::lte("id", 6_i64).into());
        assert_eq!(source.predicates().len(), 2);
        assert_eq!(ids(&source.materialize().await.unwrap()), vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn test_identity_filter_is_dropped() {
        let source = InMemorySource::new(vec![item(1, None)]).filter(Predicate::always());
        assert!(source.predicates().is_empty());
    }

    #[tokio::test]
    async fn test_ordering_nulls_first_ascending() {
        let items = vec![item(1, Some("b")), item(2, None), item(3, Some("a"))];
        let asc = InMemorySource::new(items.clone())
            .order_by(OrderBy::asc("name"))
            .materialize()
            .await
            .unwrap();
        assert_eq!(ids(&asc), vec![2, 3, 1]);

        let desc = InMemorySource::new(items)
            .order_by(OrderBy::desc("name"))
            .materialize()
            .await
            .unwrap();
        assert_eq!(ids(&desc), vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn test_ordering_is_stable() {
        let items = vec![item(1, Some("a")), item(2, Some("a")), item(3, Some("a"))];
        let sorted = InMemorySource::new(items)
            .order_by(OrderBy::desc("name"))
            .materialize()
            .await
            .unwrap();
        assert_eq!(ids(&sorted), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_count_respects_window() {
        let source = InMemorySource::new((1..=25).map(|id| item(id, None)).collect());
        assert_eq!(source.count().await.unwrap(), 25);
        let windowed = source.skip(20).take(10);
        assert_eq!(windowed.count().await.unwrap(), 5);
        assert_eq!(ids(&windowed.materialize().await.unwrap()), vec![21, 22, 23, 24, 25]);
    }

    #[tokio::test]
    async fn test_fetch_page() {
        let source = InMemorySource::new((1..=25).map(|id| item(id, None)).collect())
            .order_by(OrderBy::desc("id"));
        let (total, items) = source.fetch_page(10, 10).await.unwrap();
        assert_eq!(total, 25);
        assert_eq!(ids(&items), (6..=15).rev().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_unknown_expansion_is_validation_failure() {
        let source = InMemorySource::new(vec![item(1, None)]).expand(ExpansionPath::parse("tags"));
        let err = source.count().await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.operation, SourceOperation::Expand);
        assert_eq!(err.context.as_deref(), Some("tags"));
    }

    #[tokio::test]
    async fn test_expanders_run_in_order() {
        let store = InMemoryStore::new(vec![item(1, None), item(2, None)])
            .with_expander("tags", |items: &mut [Item], _all: &[Item]| {
                for item in items.iter_mut() {
                    item.tags.push("tags");
                }
                Ok(())
            })
            .with_expander("tags.owner", |items: &mut [Item], all: &[Item]| {
                for item in items.iter_mut() {
                    assert_eq!(item.tags, vec!["tags"]);
                    item.tags.push(if all.len() == 2 { "owner" } else { "?" });
                }
                Ok(())
            });

        let source = store
            .snapshot()
            .await
            .expand(ExpansionPath::parse("tags"))
            .expand(ExpansionPath::parse("tags.owner"));
        assert_eq!(source.expansions().len(), 2);

        let items = source.take(1).materialize().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].tags, vec!["tags", "owner"]);
    }

    #[tokio::test]
    async fn test_expander_error_is_reported() {
        let store = InMemoryStore::new(vec![item(1, None)]).with_expander(
            "tags",
            |_items: &mut [Item], _all: &[Item]| {
                Err(SourceError::database_error(SourceOperation::Fetch, "lookup failed"))
            },
        );
        let err = store
            .snapshot()
            .await
            .expand(ExpansionPath::parse("tags"))
            .materialize()
            .await
            .unwrap_err();
        assert_eq!(err.operation, SourceOperation::Expand);
        assert!(!err.is_validation());
    }

    #[tokio::test]
    async fn test_snapshot_isolation() {
        let store = InMemoryStore::new(vec![item(1, None)]);
        let before = store.snapshot().await;
        store.insert(item(2, None)).await;
        store
            .modify(|items| {
                if let Some(first) = items.first_mut() {
                    first.deleted = true;
                }
            })
            .await;

        let old = before.materialize().await.unwrap();
        assert_eq!(old.len(), 1);
        assert!(!old[0].deleted);
        assert_eq!(store.len().await, 2);
        assert!(!store.is_empty().await);
    }

    #[tokio::test]
    async fn test_debug_does_not_dump_records() {
        let source = InMemorySource::new(vec![item(1, Some("secret"))]);
        let debug = format!("{:?}", source);
        assert!(debug.contains("records: 1"));
        assert!(!debug.contains("secret"));
    }
}
