use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ProductResult;
use crate::models::{Product, ProductCategory, ProductFilter, ProductRating, UpdateProduct};

/// Repository trait for Product persistence
///
/// Other domains (carts, orders, reviews) depend on this trait rather than on
/// the MongoDB implementation, so their services can be tested with
/// `MockProductRepository`.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a fully built product
    async fn create(&self, product: Product) -> ProductResult<Product>;

    /// Get a product by ID
    async fn get_by_id(&self, id: Uuid) -> ProductResult<Option<Product>>;

    /// Fetch several products at once; missing ids are simply absent
    async fn get_by_ids(&self, ids: &[Uuid]) -> ProductResult<Vec<Product>>;

    /// Get a product by SKU
    async fn get_by_sku(&self, sku: &str) -> ProductResult<Option<Product>>;

    /// Get a product by exact name
    async fn get_by_name(&self, name: &str) -> ProductResult<Option<Product>>;

    /// List products with optional filters
    async fn list(&self, filter: ProductFilter) -> ProductResult<Vec<Product>>;

    /// Search products by text query
    async fn search(&self, query: &str, limit: i64, offset: u64) -> ProductResult<Vec<Product>>;

    /// Update an existing product
    async fn update(&self, id: Uuid, input: UpdateProduct) -> ProductResult<Product>;

    /// Delete a product by ID
    async fn delete(&self, id: Uuid) -> ProductResult<bool>;

    /// Count products matching a filter
    async fn count(&self, filter: ProductFilter) -> ProductResult<u64>;

    /// Check if a product SKU exists
    async fn exists_by_sku(&self, sku: &str) -> ProductResult<bool>;

    /// Check if a product name exists
    async fn exists_by_name(&self, name: &str) -> ProductResult<bool>;

    /// Add `quantity_change` to stock; fails with insufficient stock instead
    /// of going below zero
    async fn update_stock(&self, id: Uuid, quantity_change: i32) -> ProductResult<Product>;

    /// Atomically remove `quantity` units if that many are on hand.
    /// Returns `None` when the product is missing or short on stock.
    async fn take_stock(&self, id: Uuid, quantity: i32) -> ProductResult<Option<Product>>;

    /// Overwrite the aggregated review rating
    async fn set_rating(&self, id: Uuid, rating: ProductRating) -> ProductResult<()>;

    /// Get products by category
    async fn get_by_category(
        &self,
        category: ProductCategory,
        limit: i64,
        offset: u64,
    ) -> ProductResult<Vec<Product>>;

    /// Featured products that are on the storefront
    async fn get_featured(&self, limit: i64) -> ProductResult<Vec<Product>>;

    /// Get low stock products (stock at or below threshold)
    async fn get_low_stock(&self, threshold: i32, limit: i64) -> ProductResult<Vec<Product>>;
}
