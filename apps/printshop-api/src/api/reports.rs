use axum::Router;
use domain_reports::{MongoReportSource, ReportService, handlers};

use crate::state::AppState;

/// Admin reporting reads the order, print order, product and user collections.
pub fn router(state: &AppState) -> Router {
    handlers::router(ReportService::new(MongoReportSource::new(&state.db)))
}
