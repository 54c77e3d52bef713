//! Data source abstraction
//!
//! A [`DataSource`] is a not-yet-materialized query over one entity type. The
//! evaluator narrows it with predicates, expansions and ordering without doing
//! any I/O; only [`count`](DataSource::count), [`materialize`](DataSource::materialize)
//! and [`fetch_page`](DataSource::fetch_page) touch the store.
//!
//! `skip` and `take` compose the way sequence operators do: `skip(n)` after a
//! `take(m)` leaves `m - n` records, and `take` never widens an earlier limit.
//!
//! Implementations:
//!
//! - [`InMemorySource`]: an immutable snapshot of a vector, always available
//! - `PgSource`: a PostgreSQL table queried through `sqlx` (feature `database`)

mod error;
mod memory;
#[cfg(feature = "database")]
mod postgres;

use std::future::Future;

pub use error::{SourceError, SourceErrorKind, SourceOperation, SourceResult};
pub use memory::{Expander, InMemorySource, InMemoryStore};
#[cfg(feature = "database")]
pub use postgres::{create_pool, ExpansionLoader, PgSource};

use crate::predicate::Predicate;
use crate::specification::{ExpansionPath, OrderBy};

/// Storage collaborator queried by the evaluator and the pagination executor
///
/// Uses RPITIT for the async operations, so implementations write plain
/// `async` blocks and the returned futures stay `Send` for use across tasks.
pub trait DataSource<T: Send>: Sized + Send {
    /// Narrow the query; repeated calls are ANDed
    fn filter(self, predicate: Predicate) -> Self;

    /// Attach related data along `path` when records are materialized
    fn expand(self, path: ExpansionPath) -> Self;

    /// Order the results; the last call wins
    fn order_by(self, order: OrderBy) -> Self;

    /// Skip `n` records
    fn skip(self, n: u64) -> Self;

    /// Keep at most `n` records
    fn take(self, n: u64) -> Self;

    /// Count the records the query currently describes
    fn count(&self) -> impl Future<Output = SourceResult<u64>> + Send;

    /// Run the query and return the records
    fn materialize(self) -> impl Future<Output = SourceResult<Vec<T>>> + Send;

    /// Count the query, then fetch `take` records starting at `skip`
    ///
    /// The default issues two independent operations, so a concurrent write
    /// may land between them. Sources able to read both from one consistent
    /// view override this.
    fn fetch_page(
        self,
        skip: u64,
        take: u64,
    ) -> impl Future<Output = SourceResult<(u64, Vec<T>)>> + Send {
        async move {
            let total = self.count().await?;
            let items = self.skip(skip).take(take).materialize().await?;
            Ok((total, items))
        }
    }
}

/// Window arithmetic shared by the sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Window {
    pub(crate) offset: u64,
    pub(crate) limit: Option<u64>,
}

impl Window {
    pub(crate) fn skip(self, n: u64) -> Self {
        Self {
            offset: self.offset.saturating_add(n),
            limit: self.limit.map(|limit| limit.saturating_sub(n)),
        }
    }

    pub(crate) fn take(self, n: u64) -> Self {
        Self {
            offset: self.offset,
            limit: Some(self.limit.map_or(n, |limit| limit.min(n))),
        }
    }

    /// How many of `available` records fall inside the window
    pub(crate) fn count(self, available: u64) -> u64 {
        let remaining = available.saturating_sub(self.offset);
        self.limit.map_or(remaining, |limit| remaining.min(limit))
    }
}
