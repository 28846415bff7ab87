//! MongoDB implementation of ProductRepository

use async_trait::async_trait;
use database::{contains_ci, escape_regex, id_filter, ids_in};
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document, doc, to_bson},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{ProductError, ProductResult};
use crate::models::{
    Product, ProductCategory, ProductFilter, ProductRating, ProductSort, ProductStatus,
    UpdateProduct,
};
use crate::repository::ProductRepository;

/// MongoDB implementation of the ProductRepository
pub struct MongoProductRepository {
    collection: Collection<Product>,
}

impl MongoProductRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.collection::<Product>("products");
        Self { collection }
    }

    /// Initialize indexes for optimal query performance
    pub async fn init_indexes(&self) -> ProductResult<()> {
        let indexes = vec![
            // SKU is optional, so the unique index is sparse
            IndexModel::builder()
                .keys(doc! { "sku": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .sparse(true)
                        .name("idx_sku_unique".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "name": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_name_unique".to_string())
                        .build(),
                )
                .build(),
            // Category + status for listing
            IndexModel::builder()
                .keys(doc! { "category": 1, "status": 1, "created_at": -1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_category_status".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "price": 1 })
                .options(IndexOptions::builder().name("idx_price".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "stock": 1 })
                .options(IndexOptions::builder().name("idx_stock".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "featured": 1, "status": 1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_featured".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "rating.average": -1 })
                .options(IndexOptions::builder().name("idx_rating".to_string()).build())
                .build(),
            // Text search on name, description and tags
            IndexModel::builder()
                .keys(doc! { "name": "text", "description": "text", "tags": "text" })
                .options(
                    IndexOptions::builder()
                        .name("idx_text_search".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "tags": 1 })
                .options(IndexOptions::builder().name("idx_tags".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "brand": 1 })
                .options(IndexOptions::builder().name("idx_brand".to_string()).build())
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Product indexes created successfully");
        Ok(())
    }

    /// Build a MongoDB filter document from ProductFilter
    fn build_filter(filter: &ProductFilter) -> Document {
        let mut doc = doc! {};

        match filter.status {
            Some(status) => {
                doc.insert("status", status.to_string());
            }
            None => {
                let visible: Vec<String> = ProductStatus::VISIBLE
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                doc.insert("status", doc! { "$in": visible });
            }
        }

        if let Some(ref category) = filter.category {
            doc.insert("category", category.to_string());
        }

        if let Some(brand) = filter.brand.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
            doc.insert(
                "brand",
                doc! { "$regex": format!("^{}$", escape_regex(brand)), "$options": "i" },
            );
        }

        // Price range
        if filter.min_price.is_some() || filter.max_price.is_some() {
            let mut price_filter = doc! {};
            if let Some(min) = filter.min_price {
                price_filter.insert("$gte", min);
            }
            if let Some(max) = filter.max_price {
                price_filter.insert("$lte", max);
            }
            doc.insert("price", price_filter);
        }

        match filter.in_stock {
            Some(true) => {
                doc.insert("stock", doc! { "$gt": 0 });
            }
            Some(false) => {
                doc.insert("stock", doc! { "$lte": 0 });
            }
            None => {}
        }

        if let Some(featured) = filter.featured {
            doc.insert("featured", featured);
        }

        if let Some(tag) = filter.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            doc.insert("tags", tag.to_lowercase());
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            doc.insert(
                "$or",
                vec![
                    doc! { "name": contains_ci(search) },
                    doc! { "description": contains_ci(search) },
                    doc! { "sku": contains_ci(search) },
                    doc! { "tags": contains_ci(search) },
                ],
            );
        }

        doc
    }

    fn sort_document(sort: ProductSort) -> Document {
        match sort {
            ProductSort::Newest => doc! { "created_at": -1 },
            ProductSort::PriceAsc => doc! { "price": 1, "created_at": -1 },
            ProductSort::PriceDesc => doc! { "price": -1, "created_at": -1 },
            ProductSort::Rating => doc! { "rating.average": -1, "rating.count": -1 },
            ProductSort::Name => doc! { "name": 1 },
        }
    }

    /// Update pipeline adding `delta` to stock and moving the status between
    /// active and out of stock to match the new level.
    fn stock_pipeline(delta: i32) -> Vec<Document> {
        vec![
            doc! {
                "$set": {
                    "stock": { "$add": ["$stock", delta] },
                    "updated_at": chrono::Utc::now().to_rfc3339(),
                }
            },
            Self::status_sync_stage(),
        ]
    }

    /// Pipeline stage keeping active and out of stock in line with the stored
    /// stock level. Other statuses are left alone.
    fn status_sync_stage() -> Document {
        doc! {
            "$set": {
                "status": {
                    "$switch": {
                        "branches": [
                            {
                                "case": { "$and": [
                                    { "$eq": ["$status", "active"] },
                                    { "$lte": ["$stock", 0] }
                                ] },
                                "then": "out_of_stock"
                            },
                            {
                                "case": { "$and": [
                                    { "$eq": ["$status", "out_of_stock"] },
                                    { "$gt": ["$stock", 0] }
                                ] },
                                "then": "active"
                            }
                        ],
                        "default": "$status"
                    }
                }
            }
        }
    }

    /// Update pipeline touching only the fields present in `input`, so
    /// concurrent stock movements are never overwritten. Values go through
    /// `$literal` because pipeline stages read `"$..."` strings as field paths.
    fn update_pipeline(input: UpdateProduct) -> ProductResult<Vec<Document>> {
        fn set<T: serde::Serialize>(
            fields: &mut Document,
            key: &str,
            value: Option<T>,
        ) -> ProductResult<()> {
            if let Some(value) = value {
                let value = to_bson(&value).map_err(|e| ProductError::Internal(e.to_string()))?;
                fields.insert(key, doc! { "$literal": value });
            }
            Ok(())
        }

        let input = input.normalized();
        let mut fields = Document::new();
        set(&mut fields, "name", input.name)?;
        set(&mut fields, "description", input.description)?;
        set(&mut fields, "price", input.price)?;
        set(&mut fields, "compare_at_price", input.compare_at_price)?;
        set(&mut fields, "stock", input.stock)?;
        set(&mut fields, "category", input.category)?;
        set(&mut fields, "status", input.status)?;
        set(&mut fields, "images", input.images)?;
        set(&mut fields, "sku", input.sku)?;
        set(&mut fields, "brand", input.brand)?;
        set(&mut fields, "tags", input.tags)?;
        set(&mut fields, "attributes", input.attributes)?;
        set(&mut fields, "featured", input.featured)?;
        set(&mut fields, "min_order_quantity", input.min_order_quantity)?;
        set(&mut fields, "updated_at", Some(chrono::Utc::now()))?;

        Ok(vec![doc! { "$set": fields }, Self::status_sync_stage()])
    }

    /// Apply a stock delta only while the result stays at or above zero.
    async fn apply_stock_delta(&self, id: Uuid, delta: i32) -> ProductResult<Option<Product>> {
        let mut filter = id_filter(id);
        filter.insert("stock", doc! { "$gte": (-delta).max(0) });

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let product = self
            .collection
            .find_one_and_update(filter, Self::stock_pipeline(delta))
            .with_options(options)
            .await?;
        Ok(product)
    }

    async fn find_many(
        &self,
        filter: Document,
        sort: Document,
        limit: i64,
        offset: u64,
    ) -> ProductResult<Vec<Product>> {
        let options = FindOptions::builder()
            .limit(limit)
            .skip(offset)
            .sort(sort)
            .build();

        let cursor = self.collection.find(filter).with_options(options).await?;
        let products: Vec<Product> = cursor.try_collect().await?;
        Ok(products)
    }
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    #[instrument(skip(self, product), fields(product_name = %product.name))]
    async fn create(&self, product: Product) -> ProductResult<Product> {
        self.collection.insert_one(&product).await?;

        tracing::info!(product_id = %product.id, "Product created successfully");
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> ProductResult<Option<Product>> {
        let product = self.collection.find_one(id_filter(id)).await?;
        Ok(product)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_by_ids(&self, ids: &[Uuid]) -> ProductResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.collection.find(doc! { "_id": ids_in(ids) }).await?;
        let products: Vec<Product> = cursor.try_collect().await?;
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn get_by_sku(&self, sku: &str) -> ProductResult<Option<Product>> {
        let filter = doc! { "sku": sku.trim().to_uppercase() };
        let product = self.collection.find_one(filter).await?;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn get_by_name(&self, name: &str) -> ProductResult<Option<Product>> {
        let product = self.collection.find_one(doc! { "name": name.trim() }).await?;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: ProductFilter) -> ProductResult<Vec<Product>> {
        self.find_many(
            Self::build_filter(&filter),
            Self::sort_document(filter.sort),
            filter.limit,
            filter.offset,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: i64, offset: u64) -> ProductResult<Vec<Product>> {
        let visible: Vec<String> = ProductStatus::VISIBLE
            .iter()
            .map(|s| s.to_string())
            .collect();
        let filter = doc! {
            "$text": { "$search": query },
            "status": { "$in": visible },
        };

        self.find_many(
            filter,
            doc! { "score": { "$meta": "textScore" } },
            limit,
            offset,
        )
        .await
    }

    #[instrument(skip(self, input))]
    async fn update(&self, id: Uuid, input: UpdateProduct) -> ProductResult<Product> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .collection
            .find_one_and_update(id_filter(id), Self::update_pipeline(input)?)
            .with_options(options)
            .await?
            .ok_or(ProductError::NotFound(id))?;

        tracing::info!(product_id = %id, "Product updated successfully");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> ProductResult<bool> {
        let result = self.collection.delete_one(id_filter(id)).await?;

        if result.deleted_count == 0 {
            return Err(ProductError::NotFound(id));
        }

        tracing::info!(product_id = %id, "Product deleted successfully");
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn count(&self, filter: ProductFilter) -> ProductResult<u64> {
        let mongo_filter = Self::build_filter(&filter);
        let count = self.collection.count_documents(mongo_filter).await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn exists_by_sku(&self, sku: &str) -> ProductResult<bool> {
        let filter = doc! { "sku": sku.trim().to_uppercase() };
        let count = self.collection.count_documents(filter).await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn exists_by_name(&self, name: &str) -> ProductResult<bool> {
        let filter = doc! { "name": name.trim() };
        let count = self.collection.count_documents(filter).await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn update_stock(&self, id: Uuid, quantity_change: i32) -> ProductResult<Product> {
        if let Some(product) = self.apply_stock_delta(id, quantity_change).await? {
            tracing::info!(product_id = %id, quantity_change, stock = product.stock, "Stock updated");
            return Ok(product);
        }

        // Either the product is gone or the change would go below zero
        let product = self
            .collection
            .find_one(id_filter(id))
            .await?
            .ok_or(ProductError::NotFound(id))?;
        Err(ProductError::InsufficientStock {
            available: product.stock,
            requested: -quantity_change,
        })
    }

    #[instrument(skip(self))]
    async fn take_stock(&self, id: Uuid, quantity: i32) -> ProductResult<Option<Product>> {
        let product = self.apply_stock_delta(id, -quantity.abs()).await?;
        if let Some(ref p) = product {
            tracing::info!(product_id = %id, quantity, stock = p.stock, "Stock taken");
        }
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn set_rating(&self, id: Uuid, rating: ProductRating) -> ProductResult<()> {
        let update = doc! {
            "$set": {
                "rating": to_bson(&rating).map_err(|e| ProductError::Internal(e.to_string()))?,
                "updated_at": chrono::Utc::now().to_rfc3339(),
            }
        };
        let result = self.collection.update_one(id_filter(id), update).await?;
        if result.matched_count == 0 {
            return Err(ProductError::NotFound(id));
        }

        tracing::info!(product_id = %id, average = rating.average, count = rating.count, "Rating updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_by_category(
        &self,
        category: ProductCategory,
        limit: i64,
        offset: u64,
    ) -> ProductResult<Vec<Product>> {
        let filter = ProductFilter {
            category: Some(category),
            ..Default::default()
        };
        self.find_many(
            Self::build_filter(&filter),
            doc! { "created_at": -1 },
            limit,
            offset,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_featured(&self, limit: i64) -> ProductResult<Vec<Product>> {
        let filter = ProductFilter {
            featured: Some(true),
            ..Default::default()
        };
        self.find_many(
            Self::build_filter(&filter),
            doc! { "rating.average": -1, "created_at": -1 },
            limit,
            0,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_low_stock(&self, threshold: i32, limit: i64) -> ProductResult<Vec<Product>> {
        let filter = doc! {
            "stock": { "$lte": threshold },
            "status": { "$in": ["active", "out_of_stock"] }
        };

        self.find_many(filter, doc! { "stock": 1, "name": 1 }, limit, 0)
            .await
    }
}
