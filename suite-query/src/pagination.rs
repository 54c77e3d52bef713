//! Bounded pagination
//!
//! [`PaginationExecutor`] turns a page number and size supplied by a caller
//! into one page of results. Inputs are normalized rather than rejected: a
//! page number below 1 becomes 1 and a page size below 1 becomes the default.
//! The executor counts the evaluated source before slicing it, so the
//! envelope always carries the total across all pages.
//!
//! Store failures never escape as errors. They are logged with full detail
//! and turned into a failed envelope carrying sanitized text. Cancellation is
//! the only non-envelope outcome.
//!
//! # Example
//!
//! ```rust
//! use suite_query::pagination::PaginationExecutor;
//! use suite_query::predicate::{FilterValue, Record};
//! use suite_query::soft_delete::Auditable;
//! use suite_query::source::InMemorySource;
//! use suite_query::specification::Specification;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Clone)]
//! struct Voucher(i64);
//!
//! impl Record for Voucher {
//!     fn field(&self, _name: &str) -> Option<FilterValue> {
//!         Some(self.0.into())
//!     }
//! }
//!
//! impl Auditable for Voucher {
//!     fn is_deleted(&self) -> bool {
//!         false
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let source = InMemorySource::new((1..=25).map(Voucher).collect());
//! let page = PaginationExecutor::new()
//!     .paginate(source, &Specification::all(), 3, 10, &CancellationToken::new())
//!     .await
//!     .unwrap();
//!
//! assert!(page.succeeded());
//! assert_eq!(page.items().len(), 5);
//! assert_eq!(page.total_pages(), 3);
//! # });
//! ```

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::PaginationConfig;
use crate::envelope::PaginatedResult;
use crate::error::Cancelled;
use crate::evaluator::SpecificationEvaluator;
use crate::soft_delete::Auditable;
use crate::source::{DataSource, SourceError, SourceOperation, SourceResult};
use crate::specification::Specification;

/// Page size applied when the caller asks for none
pub const DEFAULT_PAGE_SIZE: u64 = 10;

pub(crate) const UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable";
pub(crate) const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// A normalized page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page_number: u64,
    /// Records per page, at least 1
    pub page_size: u64,
}

impl PageRequest {
    /// Normalize raw caller input
    ///
    /// # Example
    ///
    /// ```rust
    /// use suite_query::pagination::PageRequest;
    ///
    /// let request = PageRequest::normalize(0, -5, 10, None);
    /// assert_eq!(request.page_number, 1);
    /// assert_eq!(request.page_size, 10);
    ///
    /// let capped = PageRequest::normalize(2, 500, 10, Some(100));
    /// assert_eq!(capped.page_size, 100);
    /// assert_eq!(capped.skip(), 100);
    /// ```
    pub fn normalize(
        page_number: i64,
        page_size: i64,
        default_page_size: u64,
        max_page_size: Option<u64>,
    ) -> Self {
        let page_number = u64::try_from(page_number).unwrap_or(0).max(1);
        let page_size = match u64::try_from(page_size) {
            Ok(size) if size > 0 => size,
            _ => default_page_size.max(1),
        };
        let page_size = max_page_size.map_or(page_size, |max| page_size.min(max.max(1)));
        Self {
            page_number,
            page_size,
        }
    }

    /// Records before this page
    pub fn skip(&self) -> u64 {
        (self.page_number - 1).saturating_mul(self.page_size)
    }
}

/// Counts, slices and wraps evaluated sources
#[derive(Debug, Clone)]
pub struct PaginationExecutor {
    default_page_size: u64,
    max_page_size: Option<u64>,
    timeout: Option<Duration>,
    consistent_reads: bool,
}

impl Default for PaginationExecutor {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: None,
            timeout: None,
            consistent_reads: true,
        }
    }
}

impl PaginationExecutor {
    /// Executor with the stock defaults and no timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor configured from the `pagination` section
    pub fn from_config(config: &PaginationConfig) -> Self {
        Self {
            default_page_size: config.default_page_size.max(1),
            max_page_size: config.max_page_size,
            timeout: config.timeout(),
            consistent_reads: config.consistent_reads,
        }
    }

    /// Override the default page size
    #[must_use]
    pub fn with_default_page_size(mut self, size: u64) -> Self {
        self.default_page_size = size.max(1);
        self
    }

    /// Cap page sizes
    #[must_use]
    pub fn with_max_page_size(mut self, max: Option<u64>) -> Self {
        self.max_page_size = max;
        self
    }

    /// Bound each query; exceeding it is an infrastructure failure
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether to ask the source for a consistent count and fetch
    #[must_use]
    pub fn with_consistent_reads(mut self, enabled: bool) -> Self {
        self.consistent_reads = enabled;
        self
    }

    /// The configured default page size
    pub fn default_page_size(&self) -> u64 {
        self.default_page_size
    }

    /// Normalize caller input with this executor's settings
    pub fn page_request(&self, page_number: i64, page_size: i64) -> PageRequest {
        PageRequest::normalize(
            page_number,
            page_size,
            self.default_page_size,
            self.max_page_size,
        )
    }

    /// Evaluate `spec` against `source`, then execute one page
    ///
    /// The specification's own paging hints are ignored; the page request
    /// decides the window.
    pub async fn paginate<T, S>(
        &self,
        source: S,
        spec: &Specification<T>,
        page_number: i64,
        page_size: i64,
        cancel: &CancellationToken,
    ) -> Result<PaginatedResult<T>, Cancelled>
    where
        T: Auditable + Send,
        S: DataSource<T>,
    {
        let source = SpecificationEvaluator::evaluate(source, spec);
        self.execute(source, page_number, page_size, cancel).await
    }

    /// Count `source`, fetch one page of it and wrap the result
    pub async fn execute<T, S>(
        &self,
        source: S,
        page_number: i64,
        page_size: i64,
        cancel: &CancellationToken,
    ) -> Result<PaginatedResult<T>, Cancelled>
    where
        T: Send,
        S: DataSource<T>,
    {
        let request = self.page_request(page_number, page_size);
        let entity = std::any::type_name::<T>();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(
                    entity,
                    page_number = request.page_number,
                    page_size = request.page_size,
                    "Pagination cancelled"
                );
                return Err(Cancelled);
            }
            outcome = self.fetch(source, request) => outcome,
        };

        Ok(match outcome {
            Ok((total_count, items)) => {
                tracing::debug!(
                    entity,
                    page_number = request.page_number,
                    page_size = request.page_size,
                    total_count,
                    returned = items.len(),
                    "Page fetched"
                );
                PaginatedResult::success(
                    items,
                    total_count,
                    request.page_number,
                    request.page_size,
                )
            }
            Err(error) => failure_envelope(entity, &error),
        })
    }

    async fn fetch<T, S>(&self, source: S, request: PageRequest) -> SourceResult<(u64, Vec<T>)>
    where
        T: Send,
        S: DataSource<T>,
    {
        let skip = request.skip();
        let take = request.page_size;
        let consistent = self.consistent_reads;

        let work = async move {
            if consistent {
                source.fetch_page(skip, take).await
            } else {
                let total = source.count().await?;
                let items = source.skip(skip).take(take).materialize().await?;
                Ok((total, items))
            }
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, work).await.unwrap_or_else(|_| {
                Err(SourceError::timeout(
                    SourceOperation::Fetch,
                    format!("Query exceeded {}ms", limit.as_millis()),
                ))
            }),
            None => work.await,
        }
    }
}

fn failure_envelope<T>(entity: &str, error: &SourceError) -> PaginatedResult<T> {
    if error.is_validation() {
        tracing::warn!(
            entity,
            operation = %error.operation,
            context = ?error.context,
            "Rejected query: {}",
            error.message
        );
        return PaginatedResult::failure(vec![error.message.clone()]);
    }

    tracing::error!(
        entity,
        operation = %error.operation,
        kind = %error.kind,
        context = ?error.context,
        retriable = error.is_retriable(),
        "Source error: {}",
        error.message
    );
    let message = if error.is_retriable() {
        UNAVAILABLE_MESSAGE
    } else {
        INTERNAL_MESSAGE
    };
    PaginatedResult::infrastructure_failure(vec![message.to_string()])
}
