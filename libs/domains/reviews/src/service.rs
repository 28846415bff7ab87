use axum_helpers::AuthUser;
use domain_products::{ProductError, ProductRating, ProductRepository};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ReviewError, ReviewResult};
use crate::models::{
    CreateReview, MAX_PAGE_SIZE, ProductReviewsQuery, RatingSummary, Review, ReviewFilter,
    ReviewList, ReviewStatus, UpdateReview, summarize,
};
use crate::repository::ReviewRepository;

pub struct ReviewService<R: ReviewRepository, P: ProductRepository> {
    reviews: Arc<R>,
    products: Arc<P>,
}

impl<R: ReviewRepository, P: ProductRepository> Clone for ReviewService<R, P> {
    fn clone(&self) -> Self {
        Self {
            reviews: Arc::clone(&self.reviews),
            products: Arc::clone(&self.products),
        }
    }
}

impl<R: ReviewRepository, P: ProductRepository> ReviewService<R, P> {
    pub fn new(reviews: R, products: P) -> Self {
        Self {
            reviews: Arc::new(reviews),
            products: Arc::new(products),
        }
    }

    /// Recompute a product's rating from its published reviews and store it
    /// on the product. A product deleted in the meantime is skipped.
    async fn refresh_rating(&self, product_id: Uuid) -> ReviewResult<RatingSummary> {
        let ratings = self.reviews.published_ratings(product_id).await?;
        let summary = summarize(product_id, &ratings);
        let rating = ProductRating {
            average: summary.average,
            count: summary.count,
        };
        match self.products.set_rating(product_id, rating).await {
            Ok(()) => {}
            Err(ProductError::NotFound(_)) => {
                tracing::warn!(%product_id, "Rating not stored, product no longer exists");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(summary)
    }

    #[instrument(skip(self, author, input), fields(author = %author.id, product_id = %input.product_id))]
    pub async fn create(&self, author: &AuthUser, input: CreateReview) -> ReviewResult<Review> {
        input
            .validate()
            .map_err(|e| ReviewError::Validation(e.to_string()))?;

        if self.products.get_by_id(input.product_id).await?.is_none() {
            return Err(ReviewError::ProductNotFound(input.product_id));
        }
        if self
            .reviews
            .find_by_author(input.product_id, author.id)
            .await?
            .is_some()
        {
            return Err(ReviewError::AlreadyReviewed);
        }

        let review = self
            .reviews
            .create(Review::new(input, author.id, author.name.clone()))
            .await?;
        self.refresh_rating(review.product_id).await?;
        Ok(review)
    }

    #[instrument(skip(self))]
    pub async fn list_for_product(
        &self,
        product_id: Uuid,
        query: ProductReviewsQuery,
    ) -> ReviewResult<ReviewList> {
        let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
        let total = self.reviews.count_for_product(product_id).await?;
        let data = self
            .reviews
            .list_for_product(product_id, query.sort, limit, query.offset)
            .await?;
        Ok(ReviewList {
            data,
            total,
            limit,
            offset: query.offset,
        })
    }

    #[instrument(skip(self))]
    pub async fn summary(&self, product_id: Uuid) -> ReviewResult<RatingSummary> {
        let ratings = self.reviews.published_ratings(product_id).await?;
        Ok(summarize(product_id, &ratings))
    }

    #[instrument(skip(self))]
    pub async fn list_mine(&self, user_id: Uuid) -> ReviewResult<Vec<Review>> {
        self.reviews.list_by_user(user_id).await
    }

    #[instrument(skip(self, input))]
    pub async fn update_mine(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: UpdateReview,
    ) -> ReviewResult<Review> {
        input
            .validate()
            .map_err(|e| ReviewError::Validation(e.to_string()))?;

        let mut review = self.get(id).await?;
        if review.user_id != user_id {
            return Err(ReviewError::NotAuthor);
        }
        let rating_changed = input.rating.is_some_and(|r| r != review.rating);
        review.apply_update(input);

        let review = self.reviews.update(review).await?;
        if rating_changed {
            self.refresh_rating(review.product_id).await?;
        }
        Ok(review)
    }

    /// Delete a review; authors delete their own, admins any
    #[instrument(skip(self, user), fields(user = %user.id))]
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> ReviewResult<()> {
        let review = self.get(id).await?;
        if review.user_id != user.id && !user.is_admin() {
            return Err(ReviewError::NotAuthor);
        }
        if !self.reviews.delete(id).await? {
            return Err(ReviewError::NotFound(id));
        }
        self.refresh_rating(review.product_id).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: ReviewFilter) -> ReviewResult<ReviewList> {
        let mut filter = filter;
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        let total = self.reviews.count(filter.clone()).await?;
        let (limit, offset) = (filter.limit, filter.offset);
        let data = self.reviews.list(filter).await?;
        Ok(ReviewList {
            data,
            total,
            limit,
            offset,
        })
    }

    async fn get(&self, id: Uuid) -> ReviewResult<Review> {
        self.reviews
            .get_by_id(id)
            .await?
            .ok_or(ReviewError::NotFound(id))
    }

    /// Hide or publish a review (admin moderation)
    #[instrument(skip(self))]
    pub async fn set_status(&self, id: Uuid, status: ReviewStatus) -> ReviewResult<Review> {
        let review = self
            .reviews
            .set_status(id, status)
            .await?
            .ok_or(ReviewError::NotFound(id))?;
        self.refresh_rating(review.product_id).await?;
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockReviewRepository;
    use domain_products::{
        CreateProduct, MockProductRepository, Product, ProductCategory, ProductStatus,
    };
    use mockall::predicate::*;

    fn author(roles: &[&str]) -> AuthUser {
        AuthUser {
            id: Uuid::now_v7(),
            email: "sam@example.com".into(),
            name: "Sam".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn product() -> Product {
        Product::new(CreateProduct {
            name: "Kraft envelopes".into(),
            description: String::new(),
            price: 450,
            compare_at_price: None,
            stock: 10,
            category: ProductCategory::Stationery,
            status: ProductStatus::Active,
            images: vec![],
            sku: None,
            brand: None,
            tags: vec![],
            attributes: Default::default(),
            featured: false,
            min_order_quantity: 1,
        })
    }

    fn input(product_id: Uuid, rating: i32) -> CreateReview {
        CreateReview {
            product_id,
            rating,
            title: None,
            comment: "Sturdy".into(),
        }
    }

    #[tokio::test]
    async fn test_create_recomputes_rating() {
        let product = product();
        let product_id = product.id;

        let mut products = MockProductRepository::new();
        products
            .expect_get_by_id()
            .returning(move |_| Ok(Some(product.clone())));
        products
            .expect_set_rating()
            .withf(move |id, r| *id == product_id && r.count == 2 && r.average == 4.5)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut reviews = MockReviewRepository::new();
        reviews.expect_find_by_author().returning(|_, _| Ok(None));
        reviews.expect_create().returning(Ok);
        reviews
            .expect_published_ratings()
            .with(eq(product_id))
            .returning(|_| Ok(vec![4, 5]));

        let service = ReviewService::new(reviews, products);
        let review = service
            .create(&author(&["customer"]), input(product_id, 5))
            .await
            .unwrap();
        assert_eq!(review.author_name, "Sam");
        assert_eq!(review.status, ReviewStatus::Published);
    }

    #[tokio::test]
    async fn test_one_review_per_product() {
        let product = product();
        let product_id = product.id;
        let sam = author(&[]);
        let existing = Review::new(input(product_id, 3), sam.id, "Sam".into());

        let mut products = MockProductRepository::new();
        products
            .expect_get_by_id()
            .returning(move |_| Ok(Some(product.clone())));
        let mut reviews = MockReviewRepository::new();
        reviews
            .expect_find_by_author()
            .returning(move |_, _| Ok(Some(existing.clone())));
        reviews.expect_create().never();

        let service = ReviewService::new(reviews, products);
        let result = service.create(&sam, input(product_id, 5)).await;
        assert!(matches!(result, Err(ReviewError::AlreadyReviewed)));
    }

    #[tokio::test]
    async fn test_review_requires_product() {
        let mut products = MockProductRepository::new();
        products.expect_get_by_id().returning(|_| Ok(None));

        let service = ReviewService::new(MockReviewRepository::new(), products);
        let result = service.create(&author(&[]), input(Uuid::now_v7(), 4)).await;
        assert!(matches!(result, Err(ReviewError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_only_author_or_admin_deletes() {
        let sam = author(&["customer"]);
        let review = Review::new(input(Uuid::now_v7(), 2), sam.id, "Sam".into());
        let id = review.id;

        let mut reviews = MockReviewRepository::new();
        reviews
            .expect_get_by_id()
            .returning(move |_| Ok(Some(review.clone())));
        reviews.expect_delete().times(1).returning(|_| Ok(true));
        reviews.expect_published_ratings().returning(|_| Ok(vec![]));

        let mut products = MockProductRepository::new();
        // Product already gone: the rating refresh is skipped quietly
        products
            .expect_set_rating()
            .returning(|id, _| Err(ProductError::NotFound(id)));

        let service = ReviewService::new(reviews, products);
        let stranger = service.delete(&author(&["customer"]), id).await;
        assert!(matches!(stranger, Err(ReviewError::NotAuthor)));

        service.delete(&author(&["admin"]), id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_keeps_rating_when_unchanged() {
        let sam = author(&[]);
        let review = Review::new(input(Uuid::now_v7(), 4), sam.id, "Sam".into());
        let id = review.id;

        let mut reviews = MockReviewRepository::new();
        reviews
            .expect_get_by_id()
            .returning(move |_| Ok(Some(review.clone())));
        reviews.expect_update().returning(Ok);
        reviews.expect_published_ratings().never();

        let service = ReviewService::new(reviews, MockProductRepository::new());
        let updated = service
            .update_mine(
                sam.id,
                id,
                UpdateReview {
                    rating: Some(4),
                    title: Some("Nice".into()),
                    comment: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title.as_deref(), Some("Nice"));
    }

    #[tokio::test]
    async fn test_hiding_refreshes_rating() {
        let review = Review::new(input(Uuid::now_v7(), 1), Uuid::now_v7(), "Troll".into());
        let product_id = review.product_id;

        let mut reviews = MockReviewRepository::new();
        reviews
            .expect_set_status()
            .with(always(), eq(ReviewStatus::Hidden))
            .returning(move |_, status| {
                let mut hidden = review.clone();
                hidden.status = status;
                Ok(Some(hidden))
            });
        reviews.expect_published_ratings().returning(|_| Ok(vec![5]));

        let mut products = MockProductRepository::new();
        products
            .expect_set_rating()
            .withf(move |id, r| *id == product_id && r.count == 1 && r.average == 5.0)
            .times(1)
            .returning(|_, _| Ok(()));

        let service = ReviewService::new(reviews, products);
        let hidden = service
            .set_status(Uuid::now_v7(), ReviewStatus::Hidden)
            .await
            .unwrap();
        assert_eq!(hidden.status, ReviewStatus::Hidden);
    }
}
