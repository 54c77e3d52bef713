//! Catalog service: paginated category and voucher listings over in-memory stores

pub mod handlers;
pub mod models;
pub mod specs;

use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Router,
};
use suite_query::prelude::*;
use tower_http::trace::TraceLayer;

use crate::models::{Category, Voucher};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub categories: Arc<InMemoryStore<Category>>,
    pub vouchers: Arc<InMemoryStore<Voucher>>,
    pub category_pages: PaginationExecutor,
    pub voucher_pages: PaginationExecutor,
    /// Cancelled when the server begins shutting down
    pub shutdown: CancellationToken,
}

impl AppState {
    /// State over the given records
    pub fn new(
        categories: Vec<Category>,
        vouchers: Vec<Voucher>,
        pagination: &PaginationConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let categories = InMemoryStore::new(categories)
            .with_expander(specs::SUBCATEGORIES, specs::attach_subcategories);
        let category_pages = PaginationExecutor::from_config(pagination);
        let voucher_pages = category_pages
            .clone()
            .with_default_page_size(specs::VOUCHER_PAGE_SIZE);

        Self {
            categories: Arc::new(categories),
            vouchers: Arc::new(InMemoryStore::new(vouchers)),
            category_pages,
            voucher_pages,
            shutdown,
        }
    }

    /// State over the demo data set
    pub fn seeded(pagination: &PaginationConfig, shutdown: CancellationToken) -> Self {
        Self::new(
            models::seed_categories(),
            models::seed_vouchers(),
            pagination,
            shutdown,
        )
    }
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/categories/{id}", delete(handlers::delete_category))
        .route("/api/vouchers", get(handlers::list_vouchers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
