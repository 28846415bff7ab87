use axum::{
    Json, Router,
    extract::{Path, Query, State},
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

use crate::error::OrderResult;
use crate::models::{
    CancelOrderRequest, CustomerInfo, Order, OrderFilter, OrderItem, OrderList, OrderStatus,
    PageQuery, PaymentMethod, PaymentStatus, PlaceOrderRequest, ShippingAddress, ShippingMethod,
    StatusChange, UpdatePaymentRequest, UpdateStatusRequest,
};
use crate::repository::OrderRepository;
use crate::service::OrderService;

#[derive(OpenApi)]
#[openapi(
    paths(
        place_order, list_my_orders, get_my_order, cancel_my_order,
        admin_list_orders, admin_get_order, admin_get_by_number,
        admin_update_status, admin_update_payment
    ),
    components(
        schemas(
            Order, OrderItem, OrderList, OrderStatus, PaymentStatus, PaymentMethod,
            ShippingMethod, ShippingAddress, CustomerInfo, StatusChange,
            PlaceOrderRequest, CancelOrderRequest, UpdateStatusRequest, UpdatePaymentRequest
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
        (name = "Orders", description = "Checkout and order history"),
        (name = "Orders (admin)", description = "Order fulfilment")
    )
)]
pub struct ApiDoc;

type SharedService<R, P> = Arc<OrderService<R, P>>;

/// Create the `/orders` router. Customer routes act on the caller's own
/// orders, `/admin/*` routes require the admin role.
pub fn router<R, P>(service: OrderService<R, P>) -> Router
where
    R: OrderRepository + 'static,
    P: ProductRepository + 'static,
{
    Router::new()
        .route("/", post(place_order).get(list_my_orders))
        .route("/{id}", get(get_my_order))
        .route("/{id}/cancel", post(cancel_my_order))
        .route("/admin", get(admin_list_orders))
        .route("/admin/number/{order_number}", get(admin_get_by_number))
        .route("/admin/{id}", get(admin_get_order))
        .route("/admin/{id}/status", patch(admin_update_status))
        .route("/admin/{id}/payment", patch(admin_update_payment))
        .with_state(Arc::new(service))
}

/// Place an order from a list of product lines
///
/// Prices come from the catalog; stock is reserved when the order is placed.
#[utoipa::path(
    post,
    path = "",
    tag = "Orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = Order),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn place_order<R: OrderRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(input): ValidatedJson<PlaceOrderRequest>,
) -> OrderResult<(StatusCode, Json<Order>)> {
    let customer = CustomerInfo {
        name: user.name,
        email: user.email,
        phone: None,
    };
    let order = service.place_order(user.id, customer, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List the caller's orders, newest first
#[utoipa::path(
    get,
    path = "",
    tag = "Orders",
    params(PageQuery),
    responses(
        (status = 200, description = "Orders", body = OrderList),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn list_my_orders<R: OrderRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<PageQuery>,
) -> OrderResult<Json<OrderList>> {
    Ok(Json(
        service
            .list_my_orders(user.id, page.limit, page.offset)
            .await?,
    ))
}

/// Get one of the caller's orders
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order", body = Order),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn get_my_order<R: OrderRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    UuidPath(id): UuidPath,
) -> OrderResult<Json<Order>> {
    Ok(Json(service.get_my_order(user.id, id).await?))
}

/// Cancel one of the caller's orders before processing starts
#[utoipa::path(
    post,
    path = "/{id}/cancel",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled", body = Order),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn cancel_my_order<R: OrderRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    CurrentUser(user): CurrentUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<CancelOrderRequest>,
) -> OrderResult<Json<Order>> {
    Ok(Json(service.cancel_my_order(user.id, id, input).await?))
}

/// List all orders with filters
#[utoipa::path(
    get,
    path = "/admin",
    tag = "Orders (admin)",
    params(OrderFilter),
    responses(
        (status = 200, description = "Orders", body = OrderList),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_list_orders<R: OrderRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    AdminUser(_admin): AdminUser,
    Query(filter): Query<OrderFilter>,
) -> OrderResult<Json<OrderList>> {
    Ok(Json(service.list_orders(filter).await?))
}

/// Get any order by ID
#[utoipa::path(
    get,
    path = "/admin/{id}",
    tag = "Orders (admin)",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order", body = Order),
        (status = 400, response = BadRequestUuidResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_get_order<R: OrderRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
) -> OrderResult<Json<Order>> {
    Ok(Json(service.get_order(id).await?))
}

/// Look an order up by its order number
#[utoipa::path(
    get,
    path = "/admin/number/{order_number}",
    tag = "Orders (admin)",
    params(("order_number" = String, Path, description = "Order number, e.g. ORD-20240501-3FA9C2")),
    responses(
        (status = 200, description = "Order", body = Order),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_get_by_number<R: OrderRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    AdminUser(_admin): AdminUser,
    Path(order_number): Path<String>,
) -> OrderResult<Json<Order>> {
    Ok(Json(service.get_by_number(&order_number).await?))
}

/// Move an order along its lifecycle
///
/// Cancelling returns the reserved stock to the catalog.
#[utoipa::path(
    patch,
    path = "/admin/{id}/status",
    tag = "Orders (admin)",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Order updated", body = Order),
        (status = 400, response = BadRequestValidationResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_update_status<R: OrderRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    AdminUser(admin): AdminUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateStatusRequest>,
) -> OrderResult<Json<Order>> {
    Ok(Json(service.update_status(admin.id, id, input).await?))
}

/// Record a payment status change
#[utoipa::path(
    patch,
    path = "/admin/{id}/payment",
    tag = "Orders (admin)",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Order updated", body = Order),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_update_payment<R: OrderRepository, P: ProductRepository>(
    State(service): State<SharedService<R, P>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
    Json(input): Json<UpdatePaymentRequest>,
) -> OrderResult<Json<Order>> {
    Ok(Json(service.update_payment_status(id, input).await?))
}
