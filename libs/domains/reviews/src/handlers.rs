use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use axum_helpers::{
    AdminUser, CurrentUser, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse,
        ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
};
use domain_products::ProductRepository;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::ReviewResult;
use crate::models::{
    CreateReview, ProductReviewsQuery, RatingSummary, Review, ReviewFilter, ReviewList,
    ReviewSort, ReviewStatus, UpdateReview,
};
use crate::repository::ReviewRepository;
use crate::service::ReviewService;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_review, list_my_reviews, product_reviews, product_summary, update_review,
        delete_review, admin_list_reviews, hide_review, publish_review
    ),
    components(
        schemas(
            Review, ReviewList, ReviewStatus, ReviewSort, RatingSummary, CreateReview,
            UpdateReview
        ),
        responses(
            BadRequestUuidResponse,
            BadRequestValidationResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            NotFoundResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Reviews", description = "Product reviews and ratings")
    )
)]
pub struct ApiDoc;

type SharedService<R, P> = Arc<ReviewService<R, P>>;

/// Create the `/reviews` router
pub fn router<R, P>(service: ReviewService<R, P>) -> Router
where
    R: ReviewRepository + 'static,
    P: ProductRepository + 'static,
{
    Router::new()
        .route("/", post(create_review))
        .route("/mine", get(list_my_reviews))
        .route("/product/{product_id}", get(product_reviews))
        .route("/product/{product_id}/summary", get(product_summary))
        .route("/{id}", patch(update_review).delete(delete_review))
        .route("/admin", get(admin_list_reviews))
        .route("/admin/{id}/hide", post(hide_review))
        .route("/admin/{id}/publish", post(publish_review))
        .with_state(Arc::new(service))
}

/// Review a product (one review per product)
#[utoipa::path(
    post,
    path = "",
    tag = "Reviews",
    request_body = CreateReview,
    responses(
        (status = 201, description = "Review created", body = Review),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn create_review<R: ReviewRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(input): ValidatedJson<CreateReview>,
) -> ReviewResult<(StatusCode, Json<Review>)> {
    let review = service.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// The caller's reviews
#[utoipa::path(
    get,
    path = "/mine",
    tag = "Reviews",
    responses(
        (status = 200, description = "Reviews", body = Vec<Review>),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn list_my_reviews<R: ReviewRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
) -> ReviewResult<Json<Vec<Review>>> {
    Ok(Json(service.list_mine(user.id).await?))
}

/// Published reviews of a product
#[utoipa::path(
    get,
    path = "/product/{product_id}",
    tag = "Reviews",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ProductReviewsQuery
    ),
    responses(
        (status = 200, description = "Reviews", body = ReviewList),
        (status = 400, response = BadRequestUuidResponse)
    )
)]
async fn product_reviews<R: ReviewRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    UuidPath(product_id): UuidPath,
    Query(query): Query<ProductReviewsQuery>,
) -> ReviewResult<Json<ReviewList>> {
    Ok(Json(service.list_for_product(product_id, query).await?))
}

/// Rating summary of a product
#[utoipa::path(
    get,
    path = "/product/{product_id}/summary",
    tag = "Reviews",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Rating summary", body = RatingSummary),
        (status = 400, response = BadRequestUuidResponse)
    )
)]
async fn product_summary<R: ReviewRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    UuidPath(product_id): UuidPath,
) -> ReviewResult<Json<RatingSummary>> {
    Ok(Json(service.summary(product_id).await?))
}

/// Edit one of the caller's reviews
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Reviews",
    params(("id" = Uuid, Path, description = "Review ID")),
    request_body = UpdateReview,
    responses(
        (status = 200, description = "Review updated", body = Review),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn update_review<R: ReviewRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateReview>,
) -> ReviewResult<Json<Review>> {
    Ok(Json(service.update_mine(user.id, id, input).await?))
}

/// Delete a review (author or admin)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Reviews",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn delete_review<R: ReviewRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    UuidPath(id): UuidPath,
) -> ReviewResult<StatusCode> {
    service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List reviews for moderation
#[utoipa::path(
    get,
    path = "/admin",
    tag = "Reviews",
    params(ReviewFilter),
    responses(
        (status = 200, description = "Reviews", body = ReviewList),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_list_reviews<R: ReviewRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    AdminUser(_admin): AdminUser,
    Query(filter): Query<ReviewFilter>,
) -> ReviewResult<Json<ReviewList>> {
    Ok(Json(service.list(filter).await?))
}

/// Hide a review from the storefront
#[utoipa::path(
    post,
    path = "/admin/{id}/hide",
    tag = "Reviews",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review hidden", body = Review),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn hide_review<R: ReviewRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
) -> ReviewResult<Json<Review>> {
    Ok(Json(service.set_status(id, ReviewStatus::Hidden).await?))
}

/// Publish a hidden review again
#[utoipa::path(
    post,
    path = "/admin/{id}/publish",
    tag = "Reviews",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review published", body = Review),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn publish_review<R: ReviewRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
) -> ReviewResult<Json<Review>> {
    Ok(Json(service.set_status(id, ReviewStatus::Published).await?))
}
