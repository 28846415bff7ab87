//! MongoDB implementation of ReviewRepository

use async_trait::async_trait;
use database::{id_bson, id_filter};
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document, doc},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::ReviewResult;
use crate::models::{Review, ReviewFilter, ReviewSort, ReviewStatus};
use crate::repository::ReviewRepository;

pub struct MongoReviewRepository {
    collection: Collection<Review>,
}

impl MongoReviewRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Review>("reviews"),
        }
    }

    pub async fn init_indexes(&self) -> ReviewResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "product_id": 1, "user_id": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_product_author_unique".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "product_id": 1, "status": 1, "created_at": -1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "created_at": -1 })
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Review indexes initialized");
        Ok(())
    }

    async fn find_many(
        &self,
        filter: Document,
        sort: Document,
        limit: Option<i64>,
        offset: u64,
    ) -> ReviewResult<Vec<Review>> {
        let options = FindOptions::builder()
            .sort(sort)
            .limit(limit)
            .skip(offset)
            .build();
        let cursor = self.collection.find(filter).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }
}

fn published_for(product_id: Uuid) -> Document {
    doc! {
        "product_id": id_bson(product_id),
        "status": ReviewStatus::Published.to_string(),
    }
}

fn sort_document(sort: ReviewSort) -> Document {
    match sort {
        ReviewSort::Newest => doc! { "created_at": -1 },
        ReviewSort::Highest => doc! { "rating": -1, "created_at": -1 },
        ReviewSort::Lowest => doc! { "rating": 1, "created_at": -1 },
    }
}

fn build_filter(filter: &ReviewFilter) -> Document {
    let mut query = doc! {};
    if let Some(status) = filter.status {
        query.insert("status", status.to_string());
    }
    if let Some(product_id) = filter.product_id {
        query.insert("product_id", id_bson(product_id));
    }
    if let Some(rating) = filter.rating {
        query.insert("rating", rating);
    }
    query
}

#[async_trait]
impl ReviewRepository for MongoReviewRepository {
    #[instrument(skip(self, review), fields(product_id = %review.product_id))]
    async fn create(&self, review: Review) -> ReviewResult<Review> {
        self.collection.insert_one(&review).await?;
        tracing::info!(review_id = %review.id, rating = review.rating, "Review created");
        Ok(review)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> ReviewResult<Option<Review>> {
        Ok(self.collection.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self))]
    async fn find_by_author(
        &self,
        product_id: Uuid,
        user_id: Uuid,
    ) -> ReviewResult<Option<Review>> {
        let filter = doc! {
            "product_id": id_bson(product_id),
            "user_id": id_bson(user_id),
        };
        Ok(self.collection.find_one(filter).await?)
    }

    #[instrument(skip(self))]
    async fn list_for_product(
        &self,
        product_id: Uuid,
        sort: ReviewSort,
        limit: i64,
        offset: u64,
    ) -> ReviewResult<Vec<Review>> {
        self.find_many(published_for(product_id), sort_document(sort), Some(limit), offset)
            .await
    }

    #[instrument(skip(self))]
    async fn count_for_product(&self, product_id: Uuid) -> ReviewResult<u64> {
        Ok(self
            .collection
            .count_documents(published_for(product_id))
            .await?)
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: Uuid) -> ReviewResult<Vec<Review>> {
        self.find_many(
            doc! { "user_id": id_bson(user_id) },
            doc! { "created_at": -1 },
            None,
            0,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: ReviewFilter) -> ReviewResult<Vec<Review>> {
        self.find_many(
            build_filter(&filter),
            doc! { "created_at": -1 },
            Some(filter.limit),
            filter.offset,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn count(&self, filter: ReviewFilter) -> ReviewResult<u64> {
        Ok(self.collection.count_documents(build_filter(&filter)).await?)
    }

    #[instrument(skip(self, review), fields(review_id = %review.id))]
    async fn update(&self, review: Review) -> ReviewResult<Review> {
        self.collection
            .replace_one(id_filter(review.id), &review)
            .await?;
        tracing::info!(review_id = %review.id, "Review updated");
        Ok(review)
    }

    #[instrument(skip(self))]
    async fn set_status(&self, id: Uuid, status: ReviewStatus) -> ReviewResult<Option<Review>> {
        let update = doc! {
            "$set": {
                "status": status.to_string(),
                "updated_at": chrono::Utc::now().to_rfc3339(),
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let review = self
            .collection
            .find_one_and_update(id_filter(id), update)
            .with_options(options)
            .await?;
        if review.is_some() {
            tracing::info!(review_id = %id, %status, "Review status changed");
        }
        Ok(review)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> ReviewResult<bool> {
        let result = self.collection.delete_one(id_filter(id)).await?;
        if result.deleted_count > 0 {
            tracing::info!(review_id = %id, "Review deleted");
        }
        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self))]
    async fn published_ratings(&self, product_id: Uuid) -> ReviewResult<Vec<i32>> {
        let options = FindOptions::builder()
            .projection(doc! { "rating": 1, "_id": 0 })
            .build();
        let docs: Vec<Document> = self
            .collection
            .clone_with_type::<Document>()
            .find(published_for(product_id))
            .with_options(options)
            .await?
            .try_collect()
            .await?;
        Ok(docs
            .iter()
            .filter_map(|d| d.get_i32("rating").ok())
            .collect())
    }
}
