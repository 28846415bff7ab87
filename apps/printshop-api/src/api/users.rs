//! Account routes: `/auth` for the signed-in user, `/users` for admins

use axum::Router;
use domain_users::{
    AuthState, MongoUserRepository, UserResult, UserService, auth_handlers, handlers,
};

use crate::config::AdminSeed;
use crate::state::AppState;

fn service(state: &AppState) -> UserService<MongoUserRepository> {
    UserService::new(MongoUserRepository::new(&state.db))
}

pub fn auth_router(state: &AppState) -> Router {
    let auth = AuthState::new(service(state), state.jwt.clone())
        .with_secure_cookies(state.config.environment.use_https());
    auth_handlers::router(auth)
}

pub fn router(state: &AppState) -> Router {
    handlers::router(service(state))
}

/// Create the bootstrap admin unless an account with that email exists.
pub async fn seed_admin(state: &AppState, seed: &AdminSeed) -> UserResult<bool> {
    service(state)
        .ensure_admin(&seed.email, &seed.password, &seed.name)
        .await
}
