//! Request handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use suite_query::prelude::*;

use crate::{
    models::{Category, Voucher},
    specs, AppState,
};

/// Health check endpoint
pub async fn health() -> &'static str {
    "ok"
}

/// `GET /api/categories`
pub async fn list_categories(
    State(state): State<AppState>,
    PageQuery(params): PageQuery,
) -> Result<PaginatedResult<Category>> {
    let spec = match specs::category_specification(&params) {
        Ok(spec) => spec,
        Err(err) => return rejected(err),
    };

    let executor = &state.category_pages;
    let page = executor
        .paginate(
            state.categories.snapshot().await,
            &spec,
            params.page_number,
            params.page_size_or(executor.default_page_size()),
            &state.shutdown.child_token(),
        )
        .await?;
    Ok(page)
}

/// `GET /api/vouchers`
pub async fn list_vouchers(
    State(state): State<AppState>,
    PageQuery(params): PageQuery,
) -> Result<PaginatedResult<Voucher>> {
    let spec = match specs::voucher_specification(&params) {
        Ok(spec) => spec,
        Err(err) => return rejected(err),
    };

    let executor = &state.voucher_pages;
    let page = executor
        .paginate(
            state.vouchers.snapshot().await,
            &spec,
            params.page_number,
            params.page_size_or(executor.default_page_size()),
            &state.shutdown.child_token(),
        )
        .await?;
    Ok(page)
}

/// `DELETE /api/categories/{id}`: flag the category as deleted
///
/// Listings stop returning it at once; snapshots already taken are unaffected.
pub async fn delete_category(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let deleted = state
        .categories
        .modify(|items| {
            items
                .iter_mut()
                .find(|category| category.id == id && !category.is_deleted)
                .map(|category| {
                    category.is_deleted = true;
                    category.clone()
                })
        })
        .await;

    match deleted {
        Some(category) => {
            tracing::info!(category_id = %category.id, "Category soft-deleted");
            Envelope::success(category).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(Envelope::<Category>::failure(vec![format!(
                "Category '{id}' not found"
            )])),
        )
            .into_response(),
    }
}

// Validation problems become a failed page so every listing answers with the same shape
fn rejected<T>(err: Error) -> Result<PaginatedResult<T>> {
    match err {
        Error::Validation(message) => {
            tracing::warn!("Rejected list request: {}", message);
            Ok(PaginatedResult::failure(vec![message]))
        }
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::router;

    fn app() -> (Router, AppState) {
        let state = AppState::seeded(&PaginationConfig::default(), CancellationToken::new());
        (router(state.clone()), state)
    }

    async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn ids(json: &Value) -> Vec<&str> {
        json["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["id"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health().await, "ok");
    }

    #[tokio::test]
    async fn test_children_of_parent() {
        let (app, _) = app();
        let (status, json) = call(
            app,
            Method::GET,
            "/api/categories?parentId=electronics&orderBy=Name",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&json), vec!["audio", "laptops", "phones"]);
        assert_eq!(json["totalCount"], 3);
        assert_eq!(json["totalPages"], 1);
        assert_eq!(json["succeeded"], true);
    }

    #[tokio::test]
    async fn test_default_listing_excludes_inactive_and_deleted() {
        let (app, _) = app();
        let (_, json) = call(app, Method::GET, "/api/categories").await;

        // 8 seeded, garden inactive, lighting deleted
        assert_eq!(json["totalCount"], 6);
        assert_eq!(json["pageSize"], 10);
        assert!(!ids(&json).contains(&"garden"));
        assert!(!ids(&json).contains(&"lighting"));
    }

    #[tokio::test]
    async fn test_subcategories_are_attached() {
        let (app, _) = app();
        let (_, json) = call(app, Method::GET, "/api/categories?searchText=home").await;

        assert_eq!(ids(&json), vec!["home"]);
        let children = json["items"][0]["subcategories"].as_array().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0]["id"], "kitchen");
    }

    #[tokio::test]
    async fn test_zero_page_size_uses_default() {
        let (app, _) = app();
        let (_, json) = call(app, Method::GET, "/api/vouchers?pageSize=0").await;
        assert_eq!(json["pageSize"], 25);
    }

    #[tokio::test]
    async fn test_voucher_paging() {
        let (app, _) = app();
        // 30 seeded, one deleted, six inactive (multiples of 5)
        let (_, json) = call(app, Method::GET, "/api/vouchers?pageNumber=3&pageSize=10").await;

        assert_eq!(json["totalCount"], 23);
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["pageNumber"], 3);
        assert_eq!(ids(&json).len(), 3);
    }

    #[tokio::test]
    async fn test_page_past_end_is_empty() {
        let (app, _) = app();
        let (status, json) = call(app, Method::GET, "/api/categories?pageNumber=99").await;

        assert_eq!(status, StatusCode::OK);
        assert!(ids(&json).is_empty());
        assert_eq!(json["totalCount"], 6);
        assert_eq!(json["totalPages"], 1);
    }

    #[tokio::test]
    async fn test_unknown_sort_field_is_bad_request() {
        let (app, _) = app();
        let (status, json) = call(app, Method::GET, "/api/vouchers?orderBy=Secret").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["succeeded"], false);
        assert_eq!(json["totalCount"], 0);
        assert!(json["messages"][0].as_str().unwrap().contains("Secret"));
    }

    #[tokio::test]
    async fn test_malformed_query_is_envelope() {
        let (app, _) = app();
        let (status, json) = call(app, Method::GET, "/api/categories?pageNumber=abc").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["succeeded"], false);
        assert_eq!(json["items"], serde_json::json!([]));
        assert!(json["messages"][0].as_str().unwrap().contains("pageNumber"));
    }

    #[tokio::test]
    async fn test_delete_hides_category() {
        let (app, state) = app();

        let (status, json) = call(app.clone(), Method::DELETE, "/api/categories/phones").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["id"], "phones");

        let (_, json) = call(app.clone(), Method::GET, "/api/categories?parentId=electronics").await;
        assert_eq!(ids(&json), vec!["audio", "laptops"]);

        let (status, _) = call(app, Method::DELETE, "/api/categories/phones").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // The record is flagged, not removed
        assert_eq!(state.categories.len().await, 8);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_listings() {
        let (app, state) = app();
        state.shutdown.cancel();

        let (status, json) = call(app, Method::GET, "/api/categories").await;
        assert_eq!(status.as_u16(), 499);
        assert_eq!(json, Value::Null);
    }
}
