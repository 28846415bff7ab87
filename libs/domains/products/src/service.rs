//! Product Service - Business logic layer

use media_store::{MediaKind, MediaStore};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::models::{
    CreateProduct, Product, ProductCategory, ProductFilter, ProductImage, ProductStatus,
    StockAdjustment, UpdateProduct, clamp_limit,
};
use crate::repository::ProductRepository;

/// Product service providing business logic operations
///
/// The service layer handles validation, business rules, and orchestrates
/// repository operations.
pub struct ProductService<R: ProductRepository> {
    pub(crate) repository: Arc<R>,
    pub(crate) media: Option<Arc<MediaStore>>,
}

impl<R: ProductRepository> ProductService<R> {
    /// Create a new ProductService with the given repository
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
            media: None,
        }
    }

    /// Enable image uploads and bulk image import.
    pub fn with_media_store(mut self, media: Arc<MediaStore>) -> Self {
        self.media = Some(media);
        self
    }

    pub(crate) fn media(&self) -> ProductResult<&MediaStore> {
        self.media.as_deref().ok_or(ProductError::MediaUnavailable)
    }

    /// Create a new product
    #[instrument(skip(self, input), fields(product_name = %input.name))]
    pub async fn create_product(&self, input: CreateProduct) -> ProductResult<Product> {
        input
            .validate()
            .map_err(|e| ProductError::Validation(e.to_string()))?;
        validate_compare_at(input.price, input.compare_at_price)?;

        if let Some(ref sku) = input.sku {
            if self.repository.exists_by_sku(sku).await? {
                return Err(ProductError::DuplicateSku(sku.trim().to_uppercase()));
            }
        }

        if self.repository.exists_by_name(&input.name).await? {
            return Err(ProductError::DuplicateName(input.name.trim().to_string()));
        }

        self.repository.create(Product::new(input)).await
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> ProductResult<Product> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    /// Get a product by SKU
    #[instrument(skip(self))]
    pub async fn get_by_sku(&self, sku: &str) -> ProductResult<Product> {
        self.repository
            .get_by_sku(sku)
            .await?
            .ok_or_else(|| ProductError::SkuNotFound(sku.to_string()))
    }

    /// List products with optional filters
    #[instrument(skip(self))]
    pub async fn list_products(&self, filter: ProductFilter) -> ProductResult<Vec<Product>> {
        self.repository.list(filter.normalized()).await
    }

    /// Search products
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        query: &str,
        limit: i64,
        offset: u64,
    ) -> ProductResult<Vec<Product>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ProductError::Validation(
                "Search query must not be empty".to_string(),
            ));
        }
        self.repository
            .search(query, clamp_limit(limit), offset)
            .await
    }

    /// Update an existing product
    #[instrument(skip(self, input))]
    pub async fn update_product(&self, id: Uuid, input: UpdateProduct) -> ProductResult<Product> {
        input
            .validate()
            .map_err(|e| ProductError::Validation(e.to_string()))?;

        let existing = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))?;

        validate_compare_at(
            input.price.unwrap_or(existing.price),
            input.compare_at_price.or(existing.compare_at_price),
        )?;

        if let Some(ref new_sku) = input.sku {
            let new_sku = new_sku.trim().to_uppercase();
            if existing.sku.as_ref() != Some(&new_sku)
                && self.repository.exists_by_sku(&new_sku).await?
            {
                return Err(ProductError::DuplicateSku(new_sku));
            }
        }

        if let Some(ref new_name) = input.name {
            let new_name = new_name.trim();
            if new_name != existing.name && self.repository.exists_by_name(new_name).await? {
                return Err(ProductError::DuplicateName(new_name.to_string()));
            }
        }

        self.repository.update(id, input).await
    }

    /// Delete a product
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> ProductResult<()> {
        if self.repository.get_by_id(id).await?.is_none() {
            return Err(ProductError::NotFound(id));
        }

        self.repository.delete(id).await?;
        Ok(())
    }

    /// Count products matching a filter
    #[instrument(skip(self))]
    pub async fn count_products(&self, filter: ProductFilter) -> ProductResult<u64> {
        self.repository.count(filter).await
    }

    /// Adjust product stock
    #[instrument(skip(self, adjustment), fields(reason = %adjustment.reason))]
    pub async fn adjust_stock(
        &self,
        id: Uuid,
        adjustment: StockAdjustment,
    ) -> ProductResult<Product> {
        adjustment
            .validate()
            .map_err(|e| ProductError::Validation(e.to_string()))?;

        if adjustment.quantity == 0 {
            return Err(ProductError::Validation(
                "Stock adjustment must not be zero".to_string(),
            ));
        }

        let product = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))?;

        let new_stock = product.stock + adjustment.quantity;
        if new_stock < 0 {
            return Err(ProductError::InsufficientStock {
                available: product.stock,
                requested: -adjustment.quantity,
            });
        }

        let product = self
            .repository
            .update_stock(id, adjustment.quantity)
            .await?;
        tracing::info!(
            product_id = %id,
            quantity = adjustment.quantity,
            reason = %adjustment.reason,
            "Stock adjusted"
        );
        Ok(product)
    }

    /// Get products by category
    #[instrument(skip(self))]
    pub async fn get_by_category(
        &self,
        category: ProductCategory,
        limit: i64,
        offset: u64,
    ) -> ProductResult<Vec<Product>> {
        self.repository
            .get_by_category(category, clamp_limit(limit), offset)
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_featured(&self, limit: i64) -> ProductResult<Vec<Product>> {
        self.repository.get_featured(clamp_limit(limit)).await
    }

    /// Get low stock products
    #[instrument(skip(self))]
    pub async fn get_low_stock(&self, threshold: i32, limit: i64) -> ProductResult<Vec<Product>> {
        if threshold < 0 {
            return Err(ProductError::Validation(
                "Threshold must not be negative".to_string(),
            ));
        }
        self.repository
            .get_low_stock(threshold, clamp_limit(limit))
            .await
    }

    /// Activate a product. Without stock it lands in out of stock instead.
    #[instrument(skip(self))]
    pub async fn activate_product(&self, id: Uuid) -> ProductResult<Product> {
        self.set_status(id, ProductStatus::Active).await
    }

    /// Deactivate a product
    #[instrument(skip(self))]
    pub async fn deactivate_product(&self, id: Uuid) -> ProductResult<Product> {
        self.set_status(id, ProductStatus::Inactive).await
    }

    /// Discontinue a product
    #[instrument(skip(self))]
    pub async fn discontinue_product(&self, id: Uuid) -> ProductResult<Product> {
        self.set_status(id, ProductStatus::Discontinued).await
    }

    async fn set_status(&self, id: Uuid, status: ProductStatus) -> ProductResult<Product> {
        let update = UpdateProduct {
            status: Some(status),
            ..Default::default()
        };
        self.repository.update(id, update).await
    }

    /// Store an uploaded image and attach it to the product.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_image(
        &self,
        id: Uuid,
        file_name: &str,
        bytes: &[u8],
        alt: Option<String>,
        make_primary: bool,
    ) -> ProductResult<Product> {
        let media = self.media()?;
        let product = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))?;

        let stored = media.store(MediaKind::ProductImage, file_name, bytes).await?;

        let mut images = product.images;
        if images.iter().any(|i| i.url == stored.url) {
            tracing::debug!(product_id = %id, url = %stored.url, "Image already attached");
            return self.get_product(id).await;
        }
        if make_primary {
            images.iter_mut().for_each(|i| i.is_primary = false);
        }
        let is_primary = make_primary || images.is_empty();
        images.push(ProductImage {
            url: stored.url,
            alt: alt.or_else(|| Some(product.name.clone())),
            is_primary,
            sort_order: images.len() as i32,
            key: Some(stored.key),
        });
        if is_primary {
            // The new image goes first so it is also first in listings
            images.rotate_right(1);
        }

        let update = UpdateProduct {
            images: Some(images),
            ..Default::default()
        };
        let product = self.repository.update(id, update).await?;
        tracing::info!(product_id = %id, images = product.images.len(), "Product image uploaded");
        Ok(product)
    }
}

fn validate_compare_at(price: i64, compare_at_price: Option<i64>) -> ProductResult<()> {
    match compare_at_price {
        Some(compare) if compare < price => Err(ProductError::Validation(
            "compare_at_price must not be lower than price".to_string(),
        )),
        _ => Ok(()),
    }
}

impl<R: ProductRepository> Clone for ProductService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            media: self.media.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductCategory;
    use crate::repository::MockProductRepository;
    use mockall::predicate::eq;
    use std::collections::BTreeMap;

    fn create_input(name: &str, sku: Option<&str>) -> CreateProduct {
        CreateProduct {
            name: name.to_string(),
            description: String::new(),
            price: 1999,
            compare_at_price: None,
            stock: 5,
            category: ProductCategory::Flyers,
            status: ProductStatus::Active,
            images: vec![],
            sku: sku.map(str::to_string),
            brand: None,
            tags: vec![],
            attributes: BTreeMap::new(),
            featured: false,
            min_order_quantity: 1,
        }
    }

    fn product(stock: i32) -> Product {
        Product::new(CreateProduct {
            stock,
            ..create_input("A5 Flyers", Some("FL-A5"))
        })
    }

    #[tokio::test]
    async fn test_create_product_rejects_duplicate_sku() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_exists_by_sku()
            .with(eq("fl-a5"))
            .returning(|_| Ok(true));
        mock_repo.expect_create().never();

        let service = ProductService::new(mock_repo);
        let result = service
            .create_product(create_input("A5 Flyers", Some("fl-a5")))
            .await;

        assert!(matches!(result, Err(ProductError::DuplicateSku(sku)) if sku == "FL-A5"));
    }

    #[tokio::test]
    async fn test_create_product_rejects_duplicate_name() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo.expect_exists_by_sku().returning(|_| Ok(false));
        mock_repo
            .expect_exists_by_name()
            .with(eq("A5 Flyers"))
            .returning(|_| Ok(true));

        let service = ProductService::new(mock_repo);
        let result = service
            .create_product(create_input("A5 Flyers", Some("FL-A5")))
            .await;

        assert!(matches!(result, Err(ProductError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_create_product_persists_built_product() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo.expect_exists_by_sku().returning(|_| Ok(false));
        mock_repo.expect_exists_by_name().returning(|_| Ok(false));
        mock_repo
            .expect_create()
            .withf(|p| p.sku.as_deref() == Some("FL-A5") && p.status == ProductStatus::Active)
            .returning(Ok);

        let service = ProductService::new(mock_repo);
        let created = service
            .create_product(create_input("A5 Flyers", Some("fl-a5")))
            .await
            .unwrap();
        assert_eq!(created.name, "A5 Flyers");
    }

    #[tokio::test]
    async fn test_create_product_rejects_compare_price_below_price() {
        let mock_repo = MockProductRepository::new();
        let service = ProductService::new(mock_repo);

        let result = service
            .create_product(CreateProduct {
                compare_at_price: Some(100),
                ..create_input("A5 Flyers", None)
            })
            .await;
        assert!(matches!(result, Err(ProductError::Validation(_))));
    }

    #[tokio::test]
    async fn test_adjust_stock_never_goes_negative() {
        let mut mock_repo = MockProductRepository::new();
        let existing = product(3);
        let id = existing.id;
        mock_repo
            .expect_get_by_id()
            .with(eq(id))
            .returning(move |_| Ok(Some(existing.clone())));
        mock_repo.expect_update_stock().never();

        let service = ProductService::new(mock_repo);
        let result = service
            .adjust_stock(
                id,
                StockAdjustment {
                    quantity: -4,
                    reason: "damaged".to_string(),
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(ProductError::InsufficientStock {
                available: 3,
                requested: 4
            })
        ));
    }

    #[tokio::test]
    async fn test_adjust_stock_applies_delta() {
        let mut mock_repo = MockProductRepository::new();
        let existing = product(3);
        let id = existing.id;
        let after = {
            let mut p = existing.clone();
            p.stock = 0;
            p.status = ProductStatus::OutOfStock;
            p
        };
        mock_repo
            .expect_get_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        mock_repo
            .expect_update_stock()
            .with(eq(id), eq(-3))
            .returning(move |_, _| Ok(after.clone()));

        let service = ProductService::new(mock_repo);
        let updated = service
            .adjust_stock(
                id,
                StockAdjustment {
                    quantity: -3,
                    reason: "sold at counter".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stock, 0);
        assert_eq!(updated.status, ProductStatus::OutOfStock);
    }

    #[tokio::test]
    async fn test_update_product_checks_new_sku() {
        let mut mock_repo = MockProductRepository::new();
        let existing = product(3);
        let id = existing.id;
        mock_repo
            .expect_get_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        mock_repo
            .expect_exists_by_sku()
            .with(eq("FL-A4"))
            .returning(|_| Ok(true));

        let service = ProductService::new(mock_repo);
        let result = service
            .update_product(
                id,
                UpdateProduct {
                    sku: Some("fl-a4".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(ProductError::DuplicateSku(_))));
    }

    #[tokio::test]
    async fn test_get_by_sku_not_found() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo.expect_get_by_sku().returning(|_| Ok(None));

        let service = ProductService::new(mock_repo);
        let result = service.get_by_sku("NOPE").await;
        assert!(matches!(result, Err(ProductError::SkuNotFound(_))));
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let service = ProductService::new(MockProductRepository::new());
        assert!(matches!(
            service.search_products("  ", 10, 0).await,
            Err(ProductError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_image_without_media_store() {
        let service = ProductService::new(MockProductRepository::new());
        let result = service
            .upload_image(Uuid::now_v7(), "a.png", b"png", None, false)
            .await;
        assert!(matches!(result, Err(ProductError::MediaUnavailable)));
    }
}
