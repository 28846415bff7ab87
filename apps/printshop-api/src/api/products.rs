use axum::Router;
use domain_products::{MongoProductRepository, ProductService, handlers};

use crate::state::AppState;

/// Catalog routes; uploads go to the shared media store.
pub fn router(state: &AppState) -> Router {
    let service = ProductService::new(MongoProductRepository::new(&state.db))
        .with_media_store(state.media.clone());
    handlers::router(service)
}
