//! Readiness endpoint

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use serde_json::Value;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(readiness_check))
        .with_state(state)
}

/// Ready once MongoDB answers a ping and the upload directory is reachable.
async fn readiness_check(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let mongo: HealthCheckFuture<'_> = Box::pin(async {
        let status = database::check_health_detailed(&state.db).await;
        if status.healthy {
            Ok(())
        } else {
            Err(status.message.unwrap_or_else(|| "ping failed".to_string()))
        }
    });
    let media: HealthCheckFuture<'_> = Box::pin(async {
        tokio::fs::metadata(state.media.upload_dir())
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    });

    run_health_checks(vec![("database", mongo), ("media", media)]).await
}
