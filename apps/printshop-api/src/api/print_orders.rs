use axum::Router;
use domain_print_orders::{MongoPrintOrderRepository, PrintOrderService, handlers};

use crate::state::AppState;

pub fn router(state: &AppState) -> Router {
    let service = PrintOrderService::new(
        MongoPrintOrderRepository::new(&state.db),
        state.media.clone(),
    );
    handlers::router(service)
}
