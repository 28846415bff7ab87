//! Products Domain
//!
//! The print shop catalog: browsing for the storefront, product management
//! for admins, and bulk upload from spreadsheets with an image archive.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, multipart uploads
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐     ┌─────────────┐
//! │   Service   │ ──► │    Bulk     │  ← spreadsheet + zip import
//! └──────┬──────┘     └─────────────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + MongoDB implementation)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, DTOs
//! └─────────────┘
//! ```
//!
//! Other domains use [`ProductRepository`] directly: orders take stock with
//! [`ProductRepository::take_stock`] and reviews write the aggregated rating
//! with [`ProductRepository::set_rating`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_products::{handlers, MongoProductRepository, ProductService};
//! use media_store::{MediaConfig, MediaStore};
//! use mongodb::Client;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::with_uri_str("mongodb://localhost:27017").await?;
//! let db = client.database("printshop");
//!
//! let repository = MongoProductRepository::new(&db);
//! repository.init_indexes().await?;
//!
//! let media = Arc::new(MediaStore::open(MediaConfig::new("./uploads")).await?);
//! let service = ProductService::new(repository).with_media_store(media);
//!
//! let router = handlers::router(service);
//! # Ok(())
//! # }
//! ```

pub mod bulk;
pub mod error;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use bulk::{BulkImportOptions, BulkImportReport, BulkUpload, DuplicateMode};
pub use error::{ProductError, ProductResult};
pub use handlers::ApiDoc;
pub use models::{
    CreateProduct, Product, ProductCategory, ProductFilter, ProductImage, ProductRating,
    ProductSort, ProductStatus, StockAdjustment, UpdateProduct,
};
pub use mongodb::MongoProductRepository;
#[cfg(any(test, feature = "mock"))]
pub use repository::MockProductRepository;
pub use repository::ProductRepository;
pub use service::ProductService;
