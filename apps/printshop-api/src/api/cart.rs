use axum::Router;
use domain_carts::{CartService, MongoCartRepository, handlers};
use domain_products::MongoProductRepository;

use crate::state::AppState;

pub fn router(state: &AppState) -> Router {
    let service = CartService::new(
        MongoCartRepository::new(&state.db),
        MongoProductRepository::new(&state.db),
    );
    handlers::router(service)
}
