use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
};
use axum_helpers::{
    CurrentUser, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
};
use domain_products::ProductRepository;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::CartResult;
use crate::models::{
    AddItemRequest, CartLineInput, CartLinesRequest, MergeIssue, MergeIssueKind, MergeResult,
    MoveToCartRequest, PricedCart, PricedLine, SetQuantityRequest, WishlistLine,
    WishlistRequest, WishlistView,
};
use crate::repository::CartRepository;
use crate::service::CartService;

#[derive(OpenApi)]
#[openapi(
    paths(
        get_cart, clear_cart, add_item, set_quantity, remove_item, merge_cart, quote,
        get_wishlist, add_to_wishlist, remove_from_wishlist, move_to_cart
    ),
    components(
        schemas(
            AddItemRequest, SetQuantityRequest, CartLineInput, CartLinesRequest,
            PricedCart, PricedLine, MergeResult, MergeIssue, MergeIssueKind,
            WishlistRequest, WishlistView, WishlistLine, MoveToCartRequest
        ),
        responses(
            BadRequestUuidResponse,
            BadRequestValidationResponse,
            UnauthorizedResponse,
            NotFoundResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Cart", description = "Shopping cart and wishlist")
    )
)]
pub struct ApiDoc;

type SharedService<R, P> = Arc<CartService<R, P>>;

/// Create the `/cart` router. Everything except `/quote` needs a signed-in
/// user.
pub fn router<R, P>(service: CartService<R, P>) -> Router
where
    R: CartRepository + 'static,
    P: ProductRepository + 'static,
{
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/{product_id}", put(set_quantity).delete(remove_item))
        .route("/merge", post(merge_cart))
        .route("/quote", post(quote))
        .route("/wishlist", get(get_wishlist).post(add_to_wishlist))
        .route("/wishlist/{product_id}", delete(remove_from_wishlist))
        .route("/wishlist/{product_id}/move", post(move_to_cart))
        .with_state(Arc::new(service))
}

/// Get the priced cart
#[utoipa::path(
    get,
    path = "",
    tag = "Cart",
    responses(
        (status = 200, description = "Priced cart", body = PricedCart),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn get_cart<R: CartRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
) -> CartResult<Json<PricedCart>> {
    Ok(Json(service.get_cart(user.id).await?))
}

/// Empty the cart
#[utoipa::path(
    delete,
    path = "",
    tag = "Cart",
    responses(
        (status = 204, description = "Cart emptied"),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn clear_cart<R: CartRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
) -> CartResult<StatusCode> {
    service.clear(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a product to the cart
#[utoipa::path(
    post,
    path = "/items",
    tag = "Cart",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = PricedCart),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn add_item<R: CartRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(input): ValidatedJson<AddItemRequest>,
) -> CartResult<Json<PricedCart>> {
    Ok(Json(service.add_item(user.id, input).await?))
}

/// Set the quantity of a cart line (0 removes it)
#[utoipa::path(
    put,
    path = "/items/{product_id}",
    tag = "Cart",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body = SetQuantityRequest,
    responses(
        (status = 200, description = "Updated cart", body = PricedCart),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn set_quantity<R: CartRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    UuidPath(product_id): UuidPath,
    ValidatedJson(input): ValidatedJson<SetQuantityRequest>,
) -> CartResult<Json<PricedCart>> {
    Ok(Json(service.set_quantity(user.id, product_id, input).await?))
}

/// Remove a product from the cart
#[utoipa::path(
    delete,
    path = "/items/{product_id}",
    tag = "Cart",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Updated cart", body = PricedCart),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn remove_item<R: CartRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    UuidPath(product_id): UuidPath,
) -> CartResult<Json<PricedCart>> {
    Ok(Json(service.remove_item(user.id, product_id).await?))
}

/// Merge the cart kept in the browser before sign-in
#[utoipa::path(
    post,
    path = "/merge",
    tag = "Cart",
    request_body = CartLinesRequest,
    responses(
        (status = 200, description = "Merged cart and per-line issues", body = MergeResult),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn merge_cart<R: CartRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(input): ValidatedJson<CartLinesRequest>,
) -> CartResult<Json<MergeResult>> {
    Ok(Json(service.merge(user.id, input).await?))
}

/// Price an anonymous cart
#[utoipa::path(
    post,
    path = "/quote",
    tag = "Cart",
    request_body = CartLinesRequest,
    responses(
        (status = 200, description = "Priced cart", body = PricedCart),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
async fn quote<R: CartRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    ValidatedJson(input): ValidatedJson<CartLinesRequest>,
) -> CartResult<Json<PricedCart>> {
    Ok(Json(service.quote(input).await?))
}

/// Get the wishlist
#[utoipa::path(
    get,
    path = "/wishlist",
    tag = "Cart",
    responses(
        (status = 200, description = "Wishlist", body = WishlistView),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn get_wishlist<R: CartRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
) -> CartResult<Json<WishlistView>> {
    Ok(Json(service.wishlist(user.id).await?))
}

/// Add a product to the wishlist
#[utoipa::path(
    post,
    path = "/wishlist",
    tag = "Cart",
    request_body = WishlistRequest,
    responses(
        (status = 200, description = "Updated wishlist", body = WishlistView),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn add_to_wishlist<R: CartRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<WishlistRequest>,
) -> CartResult<Json<WishlistView>> {
    Ok(Json(service.add_to_wishlist(user.id, input.product_id).await?))
}

/// Remove a product from the wishlist
#[utoipa::path(
    delete,
    path = "/wishlist/{product_id}",
    tag = "Cart",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Updated wishlist", body = WishlistView),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn remove_from_wishlist<R: CartRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    UuidPath(product_id): UuidPath,
) -> CartResult<Json<WishlistView>> {
    Ok(Json(service.remove_from_wishlist(user.id, product_id).await?))
}

/// Move a wishlist product into the cart
#[utoipa::path(
    post,
    path = "/wishlist/{product_id}/move",
    tag = "Cart",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body(content = MoveToCartRequest, description = "Quantity, 1 when omitted"),
    responses(
        (status = 200, description = "Updated cart", body = PricedCart),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn move_to_cart<R: CartRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    UuidPath(product_id): UuidPath,
    ValidatedJson(input): ValidatedJson<MoveToCartRequest>,
) -> CartResult<Json<PricedCart>> {
    Ok(Json(service.move_to_cart(user.id, product_id, input).await?))
}
