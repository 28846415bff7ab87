use axum::Router;
use domain_orders::{MongoOrderRepository, OrderService, handlers};
use domain_products::MongoProductRepository;

use crate::state::AppState;

/// Checkout and order tracking. Stock is taken from the product collection.
pub fn router(state: &AppState) -> Router {
    let service = OrderService::new(
        MongoOrderRepository::new(&state.db),
        MongoProductRepository::new(&state.db),
        state.config.pricing.clone(),
    );
    handlers::router(service)
}
