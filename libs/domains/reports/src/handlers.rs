use axum::{
    Json, Router,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_helpers::{
    AdminUser,
    errors::responses::{
        BadRequestResponse, ForbiddenResponse, InternalServerErrorResponse, UnauthorizedResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::ReportResult;
use crate::models::{
    Dashboard, DailyRevenue, Dataset, DateRange, ExportFormat, ExportQuery, Headline, KeyCount,
    LowStockItem, MethodRevenue, OrderSummary, PrintSummary, ReportQuery, SalesReport,
    TopProduct,
};
use crate::service::ReportService;
use crate::source::ReportSource;

#[derive(OpenApi)]
#[openapi(
    paths(sales, dashboard, export),
    components(
        schemas(
            SalesReport, Dashboard, Headline, DateRange, OrderSummary, KeyCount, MethodRevenue,
            DailyRevenue, TopProduct, PrintSummary, LowStockItem, ExportFormat, Dataset
        ),
        responses(
            BadRequestResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Reports", description = "Sales reporting and exports (admin)")
    )
)]
pub struct ApiDoc;

type SharedService<S> = Arc<ReportService<S>>;

/// Create the `/reports` router. Every route requires the admin role.
pub fn router<S: ReportSource + 'static>(service: ReportService<S>) -> Router {
    Router::new()
        .route("/sales", get(sales))
        .route("/dashboard", get(dashboard))
        .route("/export", get(export))
        .with_state(Arc::new(service))
}

/// Sales report over a date range
#[utoipa::path(
    get,
    path = "/sales",
    tag = "Reports",
    params(ReportQuery),
    responses(
        (status = 200, description = "Sales report", body = SalesReport),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn sales<S: ReportSource>(
    State(service): State<SharedService<S>>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ReportQuery>,
) -> ReportResult<Json<SalesReport>> {
    Ok(Json(service.sales_report(&query).await?))
}

/// Today and the last 30 days at a glance
#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Reports",
    responses(
        (status = 200, description = "Dashboard figures", body = Dashboard),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn dashboard<S: ReportSource>(
    State(service): State<SharedService<S>>,
    AdminUser(_admin): AdminUser,
) -> ReportResult<Json<Dashboard>> {
    Ok(Json(service.dashboard().await?))
}

/// Download a report as CSV or XLSX
#[utoipa::path(
    get,
    path = "/export",
    tag = "Reports",
    params(ExportQuery),
    responses(
        (status = 200, description = "Report file", content_type = "application/octet-stream"),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn export<S: ReportSource>(
    State(service): State<SharedService<S>>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ExportQuery>,
) -> ReportResult<Response> {
    let file = service.export(&query).await?;
    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}
