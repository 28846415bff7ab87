use axum::Router;
use domain_products::MongoProductRepository;
use domain_reviews::{MongoReviewRepository, ReviewService, handlers};

use crate::state::AppState;

pub fn router(state: &AppState) -> Router {
    let service = ReviewService::new(
        MongoReviewRepository::new(&state.db),
        MongoProductRepository::new(&state.db),
    );
    handlers::router(service)
}
