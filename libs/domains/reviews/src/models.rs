use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Published,
    Hidden,
}

/// Product review as stored in MongoDB
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Review {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub author_name: String,
    /// 1 to 5 stars
    pub rating: i32,
    pub title: Option<String>,
    pub comment: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReview {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 120))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub comment: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateReview {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,
    #[validate(length(max = 120))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub comment: Option<String>,
}

impl Review {
    pub fn new(input: CreateReview, user_id: Uuid, author_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            product_id: input.product_id,
            user_id,
            author_name,
            rating: input.rating,
            title: input.title.filter(|t| !t.trim().is_empty()),
            comment: input.comment,
            status: ReviewStatus::Published,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateReview) {
        if let Some(rating) = update.rating {
            self.rating = rating;
        }
        if let Some(title) = update.title {
            self.title = Some(title).filter(|t| !t.trim().is_empty());
        }
        if let Some(comment) = update.comment {
            self.comment = comment;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewSort {
    #[default]
    Newest,
    Highest,
    Lowest,
}

/// Paging and ordering of a product's reviews
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ProductReviewsQuery {
    #[serde(default)]
    pub sort: ReviewSort,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: u64,
}

impl Default for ProductReviewsQuery {
    fn default() -> Self {
        Self {
            sort: ReviewSort::Newest,
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Admin review filters
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ReviewFilter {
    pub status: Option<ReviewStatus>,
    pub product_id: Option<Uuid>,
    pub rating: Option<i32>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: u64,
}

impl Default for ReviewFilter {
    fn default() -> Self {
        Self {
            status: None,
            product_id: None,
            rating: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewList {
    pub data: Vec<Review>,
    pub total: u64,
    pub limit: i64,
    pub offset: u64,
}

/// Aggregate of a product's published reviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RatingSummary {
    pub product_id: Uuid,
    /// Mean rating rounded to two decimals, 0 without reviews
    pub average: f64,
    pub count: i64,
    /// Review counts by stars; index 0 counts one-star reviews
    pub distribution: Vec<i64>,
}

/// Summarize star ratings. Ratings outside 1..=5 are ignored.
pub fn summarize(product_id: Uuid, ratings: &[i32]) -> RatingSummary {
    let mut distribution = vec![0i64; 5];
    let mut sum = 0i64;
    let mut count = 0i64;
    for &rating in ratings {
        if (1..=5).contains(&rating) {
            distribution[(rating - 1) as usize] += 1;
            sum += i64::from(rating);
            count += 1;
        }
    }

    let average = if count == 0 {
        0.0
    } else {
        (sum as f64 / count as f64 * 100.0).round() / 100.0
    };

    RatingSummary {
        product_id,
        average,
        count,
        distribution,
    }
}
