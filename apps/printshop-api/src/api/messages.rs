use axum::Router;
use domain_messages::{MessageService, MongoThreadRepository, handlers};

use crate::state::AppState;

pub fn router(state: &AppState) -> Router {
    handlers::router(MessageService::new(MongoThreadRepository::new(&state.db)))
}
