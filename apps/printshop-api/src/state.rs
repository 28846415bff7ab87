//! Shared application state.
//!
//! Built once at startup and handed to each `api` module, which builds its
//! domain repository and service from it.

use axum_helpers::JwtAuth;
use media_store::MediaStore;
use mongodb::Database;
use std::sync::Arc;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Handle to the application database (shares the client's pool)
    pub db: Database,
    /// Token issuer for the auth routes and verifier for the auth middleware
    pub jwt: JwtAuth,
    /// Uploaded product images and print files
    pub media: Arc<MediaStore>,
}

impl AppState {
    pub fn new(config: Config, db: Database, media: MediaStore) -> Self {
        let jwt = JwtAuth::new(&config.jwt);
        Self {
            config,
            db,
            jwt,
            media: Arc::new(media),
        }
    }
}
