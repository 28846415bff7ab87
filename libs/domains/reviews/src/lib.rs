//! Reviews Domain
//!
//! Signed-in customers review catalog products, one review per product.
//! Admins can hide reviews; hidden reviews drop out of the product listing
//! and the rating. Every change recomputes the product's average rating and
//! review count and stores them on the product, so catalog listings can sort
//! and display ratings without touching this collection.

pub mod error;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;

pub use error::{ReviewError, ReviewResult};
pub use handlers::ApiDoc;
pub use models::{
    CreateReview, ProductReviewsQuery, RatingSummary, Review, ReviewFilter, ReviewList,
    ReviewSort, ReviewStatus, UpdateReview, summarize,
};
pub use mongodb::MongoReviewRepository;
pub use repository::ReviewRepository;
pub use service::ReviewService;
