//! # suite-query
//!
//! Declarative query specifications and bounded pagination for CRUD services.
//!
//! Call sites describe *what* they want (filter predicates, relationship
//! expansions, ordering, paging) as an immutable [`Specification`]. The engine
//! applies it to a lazy [`DataSource`], always excluding soft-deleted records,
//! and wraps one page of the result in a [`PaginatedResult`].
//!
//! ## Features
//!
//! - **Specifications**: composable AND-only criteria, nested include paths, allow-listed ordering
//! - **Soft delete**: compile-time `Auditable` capability, guard applied to every query
//! - **Pagination**: input normalization, count-then-fetch, consistent reads, timeouts, cancellation
//! - **Sources**: in-memory snapshots; PostgreSQL via `sqlx` (feature `database`)
//! - **HTTP**: `axum` responses for envelopes and errors (feature `http`, on by default)
//!
//! ## Example
//!
//! ```rust,no_run
//! use suite_query::prelude::*;
//!
//! #[derive(Clone)]
//! struct Category {
//!     parent_id: Option<String>,
//!     is_deleted: bool,
//! }
//!
//! impl Record for Category {
//!     fn field(&self, name: &str) -> Option<FilterValue> {
//!         match name {
//!             "parent_id" => Some(self.parent_id.clone().into()),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! impl Auditable for Category {
//!     fn is_deleted(&self) -> bool {
//!         self.is_deleted
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let store = InMemoryStore::new(Vec::<Category>::new());
//!     let executor = PaginationExecutor::from_config(&config.pagination);
//!
//!     let spec = Specification::<Category>::builder()
//!         .and_when(Some("A"), |id| FilterCondition::eq("parent_id", id))
//!         .build();
//!
//!     let page = executor
//!         .paginate(store.snapshot().await, &spec, 1, 10, &CancellationToken::new())
//!         .await?;
//!     println!("{} of {}", page.items().len(), page.total_count());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod envelope;
pub mod error;
pub mod evaluator;
pub mod observability;
pub mod pagination;
pub mod params;
pub mod predicate;
pub mod soft_delete;
pub mod source;
pub mod specification;

#[cfg(feature = "http")]
pub mod http;

pub use envelope::PaginatedResult;
pub use source::DataSource;
pub use specification::Specification;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, DatabaseConfig, PaginationConfig, ServiceConfig};
    pub use crate::envelope::{total_pages, Envelope, FailureKind, PaginatedResult};
    pub use crate::error::{Cancelled, Error, Result};
    pub use crate::evaluator::SpecificationEvaluator;
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::pagination::{PageRequest, PaginationExecutor, DEFAULT_PAGE_SIZE};
    pub use crate::params::PageParameters;
    pub use crate::predicate::{
        and, FilterCondition, FilterOperator, FilterValue, Predicate, Record,
    };
    pub use crate::soft_delete::{Auditable, SoftDeleteFilter};
    pub use crate::source::{
        DataSource, Expander, InMemorySource, InMemoryStore, SourceError, SourceErrorKind,
        SourceOperation, SourceResult,
    };
    pub use crate::specification::{
        ExpansionPath, IncludeTree, OrderBy, OrderDirection, SortField, Specification,
        SpecificationBuilder,
    };

    #[cfg(feature = "database")]
    pub use crate::source::{create_pool, ExpansionLoader, PgSource};

    #[cfg(feature = "http")]
    pub use crate::http::{client_closed_request, PageQuery};

    pub use tokio_util::sync::CancellationToken;
}
