use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ReviewResult;
use crate::models::{Review, ReviewFilter, ReviewSort, ReviewStatus};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn create(&self, review: Review) -> ReviewResult<Review>;

    async fn get_by_id(&self, id: Uuid) -> ReviewResult<Option<Review>>;

    /// The review `user_id` wrote for `product_id`, if any
    async fn find_by_author(&self, product_id: Uuid, user_id: Uuid)
    -> ReviewResult<Option<Review>>;

    /// Published reviews of a product
    async fn list_for_product(
        &self,
        product_id: Uuid,
        sort: ReviewSort,
        limit: i64,
        offset: u64,
    ) -> ReviewResult<Vec<Review>>;

    async fn count_for_product(&self, product_id: Uuid) -> ReviewResult<u64>;

    /// Every review by a user, newest first
    async fn list_by_user(&self, user_id: Uuid) -> ReviewResult<Vec<Review>>;

    async fn list(&self, filter: ReviewFilter) -> ReviewResult<Vec<Review>>;

    async fn count(&self, filter: ReviewFilter) -> ReviewResult<u64>;

    async fn update(&self, review: Review) -> ReviewResult<Review>;

    async fn set_status(&self, id: Uuid, status: ReviewStatus) -> ReviewResult<Option<Review>>;

    async fn delete(&self, id: Uuid) -> ReviewResult<bool>;

    /// Star ratings of every published review of a product
    async fn published_ratings(&self, product_id: Uuid) -> ReviewResult<Vec<i32>>;
}
