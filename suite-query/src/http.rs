//! HTTP response conversion for envelopes and errors
//!
//! | Outcome                 | Status | Body            |
//! |-------------------------|--------|-----------------|
//! | success                 | 200    | envelope JSON   |
//! | validation failure      | 400    | envelope JSON   |
//! | infrastructure failure  | 503    | envelope JSON   |
//! | cancelled               | 499    | empty           |
//!
//! [`PageQuery`] extracts [`PageParameters`] from the query string and turns a
//! malformed one into a 400 failure envelope instead of axum's plain-text
//! rejection.

use axum::{
    extract::{FromRequestParts, Query},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::envelope::{Envelope, FailureKind, PaginatedResult};
use crate::error::{Cancelled, Error};
use crate::pagination::{INTERNAL_MESSAGE, UNAVAILABLE_MESSAGE};
use crate::params::PageParameters;

/// Non-standard "client closed request" status
pub fn client_closed_request() -> StatusCode {
    StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Page parameters read from the query string
///
/// # Example
///
/// ```rust,ignore
/// async fn list(PageQuery(params): PageQuery) -> PaginatedResult<Category> {
///     // ...
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery(pub PageParameters);

impl<S> FromRequestParts<S> for PageQuery
where
    S: Send + Sync,
{
    type Rejection = PaginatedResult<()>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<PageParameters>::from_request_parts(parts, state).await {
            Ok(Query(params)) => Ok(Self(params)),
            Err(rejection) => {
                let message = rejection.body_text();
                tracing::warn!("Rejected page parameters: {}", message);
                Err(PaginatedResult::failure(vec![message]))
            }
        }
    }
}

fn status_for(failure: Option<FailureKind>) -> StatusCode {
    match failure {
        None => StatusCode::OK,
        Some(FailureKind::Validation) => StatusCode::BAD_REQUEST,
        Some(FailureKind::Infrastructure) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl<T: Serialize> IntoResponse for PaginatedResult<T> {
    fn into_response(self) -> Response {
        (status_for(self.failure_kind()), Json(self)).into_response()
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (status_for(self.failure_kind()), Json(self)).into_response()
    }
}

impl IntoResponse for Cancelled {
    fn into_response(self) -> Response {
        tracing::debug!("Request cancelled before completion");
        client_closed_request().into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation(message) => Envelope::<()>::failure(vec![message]).into_response(),
            Error::Cancelled(cancelled) => cancelled.into_response(),
            Error::Source(ref e) => {
                tracing::error!(
                    operation = %e.operation,
                    kind = %e.kind,
                    context = ?e.context,
                    retriable = e.is_retriable(),
                    "Source error: {}", e.message
                );
                let message = if e.is_retriable() {
                    UNAVAILABLE_MESSAGE
                } else {
                    INTERNAL_MESSAGE
                };
                Envelope::<()>::infrastructure_failure(vec![message.to_string()]).into_response()
            }
            other => {
                tracing::error!("Internal error: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(Envelope::<()>::failure(vec![INTERNAL_MESSAGE.to_string()])),
                )
                    .into_response()
            }
        }
    }
}
