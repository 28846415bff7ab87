use axum::{
    Json, Router,
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::{get, patch, post, put},
};
use axum_helpers::{
    AdminUser, AppError, CurrentUser, MaybeUser, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestResponse, BadRequestUuidResponse, BadRequestValidationResponse,
        ConflictResponse, ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse,
        PayloadTooLargeResponse, UnauthorizedResponse,
    },
};
use media_store::StoredMedia;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::error::PrintOrderResult;
use crate::models::{
    AddNoteRequest, Binding, CancelPrintOrderRequest, ColorMode, Contact, DeliveryAddress,
    Fulfillment, FulfillmentMethod, PageQuery, PaperSize, PaperType, PrintNote, PrintOrder,
    PrintOrderFilter, PrintOrderList, PrintSpecs, PrintStatus, SetFinalPriceRequest, Sides,
    StatusChange, SubmitPrintOrder, TrackQuery, Turnaround, UpdatePrintStatusRequest,
    UploadedFile,
};
use crate::pricing::PrintQuote;
use crate::repository::PrintOrderRepository;
use crate::service::PrintOrderService;

#[derive(OpenApi)]
#[openapi(
    paths(
        quote, submit, list_mine, track, get_print_order, cancel,
        admin_list, admin_update_status, admin_set_price, admin_add_note
    ),
    components(
        schemas(
            PrintOrder, PrintOrderList, PrintSpecs, PrintQuote, PrintStatus, PaperSize,
            PaperType, ColorMode, Sides, Binding, Turnaround, Fulfillment, FulfillmentMethod,
            DeliveryAddress, Contact, StatusChange, PrintNote, StoredMedia, SubmitPrintOrder,
            SubmitForm, CancelPrintOrderRequest, UpdatePrintStatusRequest,
            SetFinalPriceRequest, AddNoteRequest
        ),
        responses(
            BadRequestResponse,
            BadRequestUuidResponse,
            BadRequestValidationResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            NotFoundResponse,
            ConflictResponse,
            PayloadTooLargeResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Print Orders", description = "Print job quotes, submission and tracking"),
        (name = "Print Orders (admin)", description = "Print job review and production")
    )
)]
pub struct ApiDoc;

type SharedService<R> = Arc<PrintOrderService<R>>;

/// Create the `/print-orders` router. Quotes, submission and tracking are
/// open to guests.
pub fn router<R: PrintOrderRepository + 'static>(service: PrintOrderService<R>) -> Router {
    Router::new()
        .route("/quote", post(quote))
        .route("/", post(submit).get(list_mine))
        .route("/track", get(track))
        .route("/{id}", get(get_print_order))
        .route("/{id}/cancel", post(cancel))
        .route("/admin", get(admin_list))
        .route("/admin/{id}/status", patch(admin_update_status))
        .route("/admin/{id}/price", put(admin_set_price))
        .route("/admin/{id}/notes", post(admin_add_note))
        .with_state(Arc::new(service))
}

/// Price a print job
#[utoipa::path(
    post,
    path = "/quote",
    tag = "Print Orders",
    request_body = PrintSpecs,
    responses(
        (status = 200, description = "Price breakdown", body = PrintQuote),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
async fn quote<R: PrintOrderRepository>(
    State(service): State<SharedService<R>>,
    Json(specs): Json<PrintSpecs>,
) -> PrintOrderResult<Json<PrintQuote>> {
    Ok(Json(service.quote(&specs)?))
}

/// Multipart form for submitting a print job
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct SubmitForm {
    /// JSON encoded `SubmitPrintOrder`
    details: String,
    /// One to ten files; repeat the field for each file
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    files: Vec<String>,
}

/// Submit a print job with its files
#[utoipa::path(
    post,
    path = "",
    tag = "Print Orders",
    request_body(content = SubmitForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Print job submitted", body = PrintOrder),
        (status = 400, response = BadRequestResponse),
        (status = 413, response = PayloadTooLargeResponse),
        (status = 415, description = "Unsupported file type"),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn submit<R: PrintOrderRepository>(
    State(service): State<SharedService<R>>,
    MaybeUser(user): MaybeUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PrintOrder>), AppError> {
    let mut details: Option<SubmitPrintOrder> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("details") => {
                let raw = field.text().await?;
                details = Some(serde_json::from_str(&raw).map_err(|e| {
                    AppError::BadRequest(format!("Invalid 'details' JSON: {}", e))
                })?);
            }
            Some("files") | Some("file") => {
                let name = field.file_name().unwrap_or("upload").to_string();
                files.push(UploadedFile {
                    name,
                    bytes: field.bytes().await?.to_vec(),
                });
            }
            _ => {}
        }
    }

    let details =
        details.ok_or_else(|| AppError::BadRequest("Missing 'details' field".to_string()))?;
    let order = service.submit(user.as_ref(), details, files).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List the caller's print jobs
#[utoipa::path(
    get,
    path = "",
    tag = "Print Orders",
    params(PageQuery),
    responses(
        (status = 200, description = "Print jobs", body = PrintOrderList),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn list_mine<R: PrintOrderRepository>(
    State(service): State<SharedService<R>>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<PageQuery>,
) -> PrintOrderResult<Json<PrintOrderList>> {
    Ok(Json(
        service.list_mine(user.id, page.limit, page.offset).await?,
    ))
}

/// Track a print job by reference and contact email
#[utoipa::path(
    get,
    path = "/track",
    tag = "Print Orders",
    params(TrackQuery),
    responses(
        (status = 200, description = "Print job", body = PrintOrder),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn track<R: PrintOrderRepository>(
    State(service): State<SharedService<R>>,
    Query(query): Query<TrackQuery>,
) -> PrintOrderResult<Json<PrintOrder>> {
    Ok(Json(service.track(query).await?))
}

/// Get a print job (owner or admin)
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Print Orders",
    params(("id" = Uuid, Path, description = "Print order ID")),
    responses(
        (status = 200, description = "Print job", body = PrintOrder),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn get_print_order<R: PrintOrderRepository>(
    State(service): State<SharedService<R>>,
    CurrentUser(user): CurrentUser,
    UuidPath(id): UuidPath,
) -> PrintOrderResult<Json<PrintOrder>> {
    Ok(Json(service.get_for(&user, id).await?))
}

/// Cancel one of the caller's print jobs before it is approved
#[utoipa::path(
    post,
    path = "/{id}/cancel",
    tag = "Print Orders",
    params(("id" = Uuid, Path, description = "Print order ID")),
    request_body = CancelPrintOrderRequest,
    responses(
        (status = 200, description = "Print job cancelled", body = PrintOrder),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn cancel<R: PrintOrderRepository>(
    State(service): State<SharedService<R>>,
    CurrentUser(user): CurrentUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<CancelPrintOrderRequest>,
) -> PrintOrderResult<Json<PrintOrder>> {
    Ok(Json(service.cancel_mine(user.id, id, input).await?))
}

/// List print jobs with filters
#[utoipa::path(
    get,
    path = "/admin",
    tag = "Print Orders (admin)",
    params(PrintOrderFilter),
    responses(
        (status = 200, description = "Print jobs", body = PrintOrderList),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_list<R: PrintOrderRepository>(
    State(service): State<SharedService<R>>,
    AdminUser(_admin): AdminUser,
    Query(filter): Query<PrintOrderFilter>,
) -> PrintOrderResult<Json<PrintOrderList>> {
    Ok(Json(service.list(filter).await?))
}

/// Move a print job through production
#[utoipa::path(
    patch,
    path = "/admin/{id}/status",
    tag = "Print Orders (admin)",
    params(("id" = Uuid, Path, description = "Print order ID")),
    request_body = UpdatePrintStatusRequest,
    responses(
        (status = 200, description = "Print job updated", body = PrintOrder),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_update_status<R: PrintOrderRepository>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdatePrintStatusRequest>,
) -> PrintOrderResult<Json<PrintOrder>> {
    Ok(Json(service.update_status(admin.id, id, input).await?))
}

/// Set the final price of a print job
#[utoipa::path(
    put,
    path = "/admin/{id}/price",
    tag = "Print Orders (admin)",
    params(("id" = Uuid, Path, description = "Print order ID")),
    request_body = SetFinalPriceRequest,
    responses(
        (status = 200, description = "Print job updated", body = PrintOrder),
        (status = 400, response = BadRequestValidationResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_set_price<R: PrintOrderRepository>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<SetFinalPriceRequest>,
) -> PrintOrderResult<Json<PrintOrder>> {
    Ok(Json(service.set_final_price(&admin, id, input).await?))
}

/// Add an internal note to a print job
#[utoipa::path(
    post,
    path = "/admin/{id}/notes",
    tag = "Print Orders (admin)",
    params(("id" = Uuid, Path, description = "Print order ID")),
    request_body = AddNoteRequest,
    responses(
        (status = 200, description = "Print job updated", body = PrintOrder),
        (status = 400, response = BadRequestValidationResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_add_note<R: PrintOrderRepository>(
    State(service): State<SharedService<R>>,
    AdminUser(admin): AdminUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<AddNoteRequest>,
) -> PrintOrderResult<Json<PrintOrder>> {
    Ok(Json(service.add_note(&admin, id, input).await?))
}
