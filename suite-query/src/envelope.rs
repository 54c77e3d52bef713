//! Result envelopes
//!
//! Every query answer leaves the engine wrapped in an envelope carrying a
//! success flag and user-facing messages. Fields are private: the only way to
//! obtain a value is through the factories, so a successful envelope always
//! carries consistent page metadata and a failed one never carries items.
//!
//! # Example
//!
//! ```rust
//! use suite_query::envelope::PaginatedResult;
//!
//! let page = PaginatedResult::success(vec!["a", "b"], 12, 2, 10);
//! assert!(page.succeeded());
//! assert_eq!(page.total_pages(), 2);
//!
//! let failed: PaginatedResult<&str> = PaginatedResult::failure(vec!["Unknown sort field".into()]);
//! assert!(!failed.succeeded());
//! assert!(failed.items().is_empty());
//! assert_eq!(failed.total_count(), 0);
//! ```

use serde::Serialize;

/// Why a failed envelope failed
///
/// Not serialized; used only to pick a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request was invalid as stated
    Validation,
    /// The store could not answer
    Infrastructure,
}

/// Ceiling division of `total_count` by `page_size`; 0 for an empty set
///
/// # Example
///
/// ```rust
/// use suite_query::envelope::total_pages;
///
/// assert_eq!(total_pages(25, 10), 3);
/// assert_eq!(total_pages(20, 10), 2);
/// assert_eq!(total_pages(0, 10), 0);
/// ```
pub fn total_pages(total_count: u64, page_size: u64) -> u64 {
    if total_count == 0 || page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size)
}

/// One page of results plus metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    items: Vec<T>,
    page_number: u64,
    page_size: u64,
    total_count: u64,
    total_pages: u64,
    succeeded: bool,
    messages: Vec<String>,
    #[serde(skip)]
    failure_kind: Option<FailureKind>,
}

impl<T> PaginatedResult<T> {
    /// A successful page
    ///
    /// `total_pages` is derived from `total_count` and `page_size`.
    pub fn success(items: Vec<T>, total_count: u64, page_number: u64, page_size: u64) -> Self {
        Self {
            items,
            page_number,
            page_size,
            total_count,
            total_pages: total_pages(total_count, page_size),
            succeeded: true,
            messages: Vec::new(),
            failure_kind: None,
        }
    }

    /// A failed page caused by an invalid request
    pub fn failure(messages: Vec<String>) -> Self {
        Self::failed(FailureKind::Validation, messages)
    }

    /// A failed page caused by the store
    ///
    /// `messages` must already be sanitized for callers.
    pub fn infrastructure_failure(messages: Vec<String>) -> Self {
        Self::failed(FailureKind::Infrastructure, messages)
    }

    fn failed(kind: FailureKind, messages: Vec<String>) -> Self {
        Self {
            items: Vec::new(),
            page_number: 0,
            page_size: 0,
            total_count: 0,
            total_pages: 0,
            succeeded: false,
            messages,
            failure_kind: Some(kind),
        }
    }

    /// Items on this page
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the envelope, keeping the items
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// 1-based page number
    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    /// Effective page size
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Records matching the query across all pages
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Number of pages
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Whether the query succeeded
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// User-facing messages
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Failure classification; `None` on success
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure_kind
    }

    /// Map each item, keeping the metadata
    ///
    /// # Example
    ///
    /// ```rust
    /// use suite_query::envelope::PaginatedResult;
    ///
    /// let page = PaginatedResult::success(vec![1, 2, 3], 3, 1, 10);
    /// let mapped = page.map(|n| n.to_string());
    /// assert_eq!(mapped.items(), ["1", "2", "3"]);
    /// ```
    pub fn map<U, F>(self, f: F) -> PaginatedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
            succeeded: self.succeeded,
            messages: self.messages,
            failure_kind: self.failure_kind,
        }
    }
}

/// Single-item envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    data: Option<T>,
    succeeded: bool,
    messages: Vec<String>,
    #[serde(skip)]
    failure_kind: Option<FailureKind>,
}

impl<T> Envelope<T> {
    /// A successful envelope
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            succeeded: true,
            messages: Vec::new(),
            failure_kind: None,
        }
    }

    /// A successful envelope carrying messages
    pub fn success_with_messages(data: T, messages: Vec<String>) -> Self {
        Self {
            messages,
            ..Self::success(data)
        }
    }

    /// A failed envelope caused by an invalid request
    pub fn failure(messages: Vec<String>) -> Self {
        Self {
            data: None,
            succeeded: false,
            messages,
            failure_kind: Some(FailureKind::Validation),
        }
    }

    /// A failed envelope caused by the store
    pub fn infrastructure_failure(messages: Vec<String>) -> Self {
        Self {
            failure_kind: Some(FailureKind::Infrastructure),
            ..Self::failure(messages)
        }
    }

    /// The payload
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Consume the envelope, keeping the payload
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Whether the operation succeeded
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// User-facing messages
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Failure classification; `None` on success
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure_kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(5, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(7, 0), 0);
        assert_eq!(total_pages(u64::MAX, 1), u64::MAX);
    }

    #[test]
    fn test_success_metadata() {
        let page = PaginatedResult::success(vec![21, 22, 23, 24, 25], 25, 3, 10);
        assert!(page.succeeded());
        assert_eq!(page.items().len(), 5);
        assert_eq!(page.page_number(), 3);
        assert_eq!(page.page_size(), 10);
        assert_eq!(page.total_count(), 25);
        assert_eq!(page.total_pages(), 3);
        assert!(page.messages().is_empty());
        assert!(page.failure_kind().is_none());
    }

    #[test]
    fn test_failure_is_zeroed() {
        let page: PaginatedResult<u8> =
            PaginatedResult::infrastructure_failure(vec!["Service temporarily unavailable".into()]);
        assert!(!page.succeeded());
        assert!(page.items().is_empty());
        assert_eq!(page.page_number(), 0);
        assert_eq!(page.page_size(), 0);
        assert_eq!(page.total_count(), 0);
        assert_eq!(page.total_pages(), 0);
        assert_eq!(page.failure_kind(), Some(FailureKind::Infrastructure));
    }

    #[test]
    fn test_serialized_shape() {
        let page = PaginatedResult::success(vec!["x"], 1, 1, 10);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "items": ["x"],
                "pageNumber": 1,
                "pageSize": 10,
                "totalCount": 1,
                "totalPages": 1,
                "succeeded": true,
                "messages": [],
            })
        );
    }

    #[test]
    fn test_failure_kind_is_not_serialized() {
        let page: PaginatedResult<u8> = PaginatedResult::failure(vec!["bad".into()]);
        let json = serde_json::to_value(&page).unwrap();
        assert!(json.get("failureKind").is_none());
        assert_eq!(json["succeeded"], false);
        assert_eq!(json["messages"][0], "bad");
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = PaginatedResult::success(vec![1, 2], 12, 2, 2).map(|n| n * 10);
        assert_eq!(page.items(), [10, 20]);
        assert_eq!(page.total_pages(), 6);
        assert_eq!(page.into_items(), vec![10, 20]);
    }

    #[test]
    fn test_envelope_success() {
        let envelope = Envelope::success("voucher");
        assert!(envelope.succeeded());
        assert_eq!(envelope.data(), Some(&"voucher"));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "data": "voucher", "succeeded": true, "messages": [] })
        );
    }

    #[test]
    fn test_envelope_failure() {
        let envelope: Envelope<String> = Envelope::failure(vec!["Category not found".into()]);
        assert!(!envelope.succeeded());
        assert!(envelope.data().is_none());
        assert_eq!(envelope.failure_kind(), Some(FailureKind::Validation));

        let envelope: Envelope<String> = Envelope::infrastructure_failure(vec!["down".into()]);
        assert_eq!(envelope.failure_kind(), Some(FailureKind::Infrastructure));
        assert!(envelope.into_data().is_none());
    }

    #[test]
    fn test_envelope_with_messages() {
        let envelope = Envelope::success_with_messages(1, vec!["Deleted".into()]);
        assert!(envelope.succeeded());
        assert_eq!(envelope.messages(), ["Deleted"]);
    }
}
