//! HTTP handlers for Products API

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{
    AdminUser, AppError, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestResponse, BadRequestUuidResponse, BadRequestValidationResponse,
        ConflictResponse, ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse,
        PayloadTooLargeResponse, ServiceUnavailableResponse, UnauthorizedResponse,
    },
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::bulk::{
    BulkImportOptions, BulkImportReport, BulkRowError, BulkRowResult, BulkUpload, DuplicateMode,
    RowAction, columns::HeaderMode, spreadsheet::SheetFormat,
};
use crate::error::ProductResult;
use crate::models::{
    CreateProduct, Product, ProductCategory, ProductFilter, ProductImage, ProductRating,
    ProductSort, ProductStatus, StockAdjustment, UpdateProduct, default_limit,
};
use crate::repository::ProductRepository;
use crate::service::ProductService;

/// OpenAPI documentation for Products API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        create_product,
        get_product,
        update_product,
        delete_product,
        search_products,
        get_by_sku,
        get_by_category,
        get_featured,
        count_products,
        adjust_stock,
        get_low_stock,
        activate_product,
        deactivate_product,
        discontinue_product,
        upload_image,
        bulk_upload,
    ),
    components(
        schemas(
            Product, CreateProduct, UpdateProduct, ProductFilter, ProductImage, ProductRating,
            ProductStatus, ProductCategory, ProductSort, StockAdjustment,
            ImageUploadForm, BulkUploadForm, BulkImportReport, BulkRowResult, BulkRowError,
            RowAction, DuplicateMode, HeaderMode, SheetFormat
        ),
        responses(
            NotFoundResponse,
            BadRequestResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            ConflictResponse,
            PayloadTooLargeResponse,
            ServiceUnavailableResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Products", description = "Catalog browsing and admin product management")
    )
)]
pub struct ApiDoc;

/// Create the products router with all HTTP endpoints
pub fn router<R: ProductRepository + 'static>(service: ProductService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/count", get(count_products))
        .route("/search", get(search_products))
        .route("/featured", get(get_featured))
        .route("/low-stock", get(get_low_stock))
        .route("/bulk", post(bulk_upload))
        .route("/sku/{sku}", get(get_by_sku))
        .route("/category/{category}", get(get_by_category))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/{id}/stock", post(adjust_stock))
        .route("/{id}/images", post(upload_image))
        .route("/{id}/activate", post(activate_product))
        .route("/{id}/deactivate", post(deactivate_product))
        .route("/{id}/discontinue", post(discontinue_product))
        .with_state(shared_service)
}

/// List products with optional filters
#[utoipa::path(
    get,
    path = "",
    tag = "Products",
    params(ProductFilter),
    responses(
        (status = 200, description = "List of products", body = Vec<Product>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Query(filter): Query<ProductFilter>,
) -> ProductResult<Json<Vec<Product>>> {
    let products = service.list_products(filter).await?;
    Ok(Json(products))
}

/// Create a new product
#[utoipa::path(
    post,
    path = "",
    tag = "Products",
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created successfully", body = Product),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn create_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    AdminUser(_admin): AdminUser,
    ValidatedJson(input): ValidatedJson<CreateProduct>,
) -> ProductResult<impl IntoResponse> {
    let product = service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    UuidPath(id): UuidPath,
) -> ProductResult<Json<Product>> {
    let product = service.get_product(id).await?;
    Ok(Json(product))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated successfully", body = Product),
        (status = 400, response = BadRequestValidationResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn update_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateProduct>,
) -> ProductResult<Json<Product>> {
    let product = service.update_product(id, input).await?;
    Ok(Json(product))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Product deleted successfully"),
        (status = 400, response = BadRequestUuidResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn delete_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    AdminUser(admin): AdminUser,
    UuidPath(id): UuidPath,
) -> ProductResult<impl IntoResponse> {
    service.delete_product(id).await?;
    tracing::info!(product_id = %id, admin = %admin.id, "Product deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}

/// Search query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Search query string
    pub q: String,
    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Number of results to skip
    #[serde(default)]
    pub offset: u64,
}

/// Search products by text query
#[utoipa::path(
    get,
    path = "/search",
    tag = "Products",
    params(SearchQuery),
    responses(
        (status = 200, description = "Search results", body = Vec<Product>),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn search_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Query(query): Query<SearchQuery>,
) -> ProductResult<Json<Vec<Product>>> {
    let products = service
        .search_products(&query.q, query.limit, query.offset)
        .await?;
    Ok(Json(products))
}

/// Get a product by SKU
#[utoipa::path(
    get,
    path = "/sku/{sku}",
    tag = "Products",
    params(
        ("sku" = String, Path, description = "Product SKU")
    ),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_by_sku<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Path(sku): Path<String>,
) -> ProductResult<Json<Product>> {
    let product = service.get_by_sku(&sku).await?;
    Ok(Json(product))
}

/// Paging query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Number of results to skip
    #[serde(default)]
    pub offset: u64,
}

/// Get products by category
#[utoipa::path(
    get,
    path = "/category/{category}",
    tag = "Products",
    params(
        ("category" = ProductCategory, Path, description = "Product category"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Products in category", body = Vec<Product>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_by_category<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Path(category): Path<ProductCategory>,
    Query(query): Query<PageQuery>,
) -> ProductResult<Json<Vec<Product>>> {
    let products = service
        .get_by_category(category, query.limit, query.offset)
        .await?;
    Ok(Json(products))
}

/// Featured products for the storefront
#[utoipa::path(
    get,
    path = "/featured",
    tag = "Products",
    params(PageQuery),
    responses(
        (status = 200, description = "Featured products", body = Vec<Product>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_featured<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Query(query): Query<PageQuery>,
) -> ProductResult<Json<Vec<Product>>> {
    let products = service.get_featured(query.limit).await?;
    Ok(Json(products))
}

/// Count products matching a filter
#[utoipa::path(
    get,
    path = "/count",
    tag = "Products",
    params(ProductFilter),
    responses(
        (status = 200, description = "Product count", body = u64),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn count_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Query(filter): Query<ProductFilter>,
) -> ProductResult<Json<u64>> {
    let count = service.count_products(filter).await?;
    Ok(Json(count))
}

/// Adjust product stock
#[utoipa::path(
    post,
    path = "/{id}/stock",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = StockAdjustment,
    responses(
        (status = 200, description = "Stock adjusted successfully", body = Product),
        (status = 400, response = BadRequestValidationResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn adjust_stock<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
    ValidatedJson(adjustment): ValidatedJson<StockAdjustment>,
) -> ProductResult<Json<Product>> {
    let product = service.adjust_stock(id, adjustment).await?;
    Ok(Json(product))
}

/// Low stock query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct LowStockQuery {
    /// Stock level at or below which a product is reported
    #[serde(default = "default_threshold")]
    pub threshold: i32,
    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_threshold() -> i32 {
    10
}

/// Get products with low stock
#[utoipa::path(
    get,
    path = "/low-stock",
    tag = "Products",
    params(LowStockQuery),
    responses(
        (status = 200, description = "Low stock products", body = Vec<Product>),
        (status = 400, response = BadRequestResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn get_low_stock<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<LowStockQuery>,
) -> ProductResult<Json<Vec<Product>>> {
    let products = service.get_low_stock(query.threshold, query.limit).await?;
    Ok(Json(products))
}

/// Activate a product
#[utoipa::path(
    post,
    path = "/{id}/activate",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product activated", body = Product),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn activate_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
) -> ProductResult<Json<Product>> {
    let product = service.activate_product(id).await?;
    Ok(Json(product))
}

/// Deactivate a product
#[utoipa::path(
    post,
    path = "/{id}/deactivate",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deactivated", body = Product),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn deactivate_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
) -> ProductResult<Json<Product>> {
    let product = service.deactivate_product(id).await?;
    Ok(Json(product))
}

/// Discontinue a product
#[utoipa::path(
    post,
    path = "/{id}/discontinue",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product discontinued", body = Product),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn discontinue_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
) -> ProductResult<Json<Product>> {
    let product = service.discontinue_product(id).await?;
    Ok(Json(product))
}

/// Multipart form for attaching an image to a product
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    file: String,
    /// Alternative text
    alt: Option<String>,
    /// Make this the primary image
    primary: Option<bool>,
}

/// Upload an image and attach it to a product
#[utoipa::path(
    post,
    path = "/{id}/images",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image attached", body = Product),
        (status = 400, response = BadRequestResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 413, response = PayloadTooLargeResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn upload_image<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
    mut multipart: Multipart,
) -> Result<Json<Product>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut alt = None;
    let mut primary = false;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or("image").to_string();
                file = Some((name, field.bytes().await?.to_vec()));
            }
            Some("alt") => alt = Some(field.text().await?).filter(|s| !s.trim().is_empty()),
            Some("primary") => primary = parse_flag(&field.text().await?)?,
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_string()))?;
    let product = service
        .upload_image(id, &file_name, &bytes, alt, primary)
        .await?;
    Ok(Json(product))
}

/// Multipart form for the bulk product upload
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct BulkUploadForm {
    /// Spreadsheet: xlsx, xlsm, xls, ods, csv, tsv or txt
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    file: String,
    /// Zip archive of product images
    #[schema(format = Binary, content_media_type = "application/zip")]
    images: Option<String>,
    on_duplicate: Option<DuplicateMode>,
    /// Parse and match without writing anything
    dry_run: Option<bool>,
}

/// Create or update products from a spreadsheet and an image archive
#[utoipa::path(
    post,
    path = "/bulk",
    tag = "Products",
    request_body(content = BulkUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Import report", body = BulkImportReport),
        (status = 400, response = BadRequestResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 413, response = PayloadTooLargeResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn bulk_upload<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    AdminUser(admin): AdminUser,
    mut multipart: Multipart,
) -> Result<Json<BulkImportReport>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut images = None;
    let mut options = BulkImportOptions::default();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or("upload.csv").to_string();
                file = Some((name, field.bytes().await?.to_vec()));
            }
            Some("images") => {
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    images = Some(bytes.to_vec());
                }
            }
            Some("on_duplicate") => {
                let raw = field.text().await?;
                options.on_duplicate = raw.trim().to_lowercase().parse().map_err(|_| {
                    AppError::BadRequest(format!(
                        "Invalid on_duplicate '{}'; expected skip or update",
                        raw.trim()
                    ))
                })?;
            }
            Some("dry_run") => options.dry_run = parse_flag(&field.text().await?)?,
            _ => {}
        }
    }

    let (file_name, file) =
        file.ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_string()))?;
    tracing::info!(admin = %admin.id, file = %file_name, "Bulk upload received");

    let report = service
        .bulk_import(BulkUpload {
            file_name,
            file,
            images,
            options,
        })
        .await?;
    Ok(Json(report))
}

fn parse_flag(raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_lowercase().as_str() {
        "" | "false" | "0" | "no" | "off" => Ok(false),
        "true" | "1" | "yes" | "on" => Ok(true),
        other => Err(AppError::BadRequest(format!(
            "Invalid boolean '{}'",
            other
        ))),
    }
}
