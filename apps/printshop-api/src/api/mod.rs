//! API routes, nested under `/api` by `axum_helpers::create_router`

pub mod cart;
pub mod health;
pub mod messages;
pub mod orders;
pub mod print_orders;
pub mod products;
pub mod reports;
pub mod reviews;
pub mod users;

use axum::{Router, extract::DefaultBodyLimit, middleware};
use axum_helpers::optional_jwt_auth_middleware;

use crate::state::AppState;

/// Every domain router behind the optional JWT middleware. Handlers decide
/// for themselves whether a caller must be signed in or be an admin.
pub fn routes(state: &AppState) -> Router {
    Router::new()
        .nest("/auth", users::auth_router(state))
        .nest("/users", users::router(state))
        .nest("/products", products::router(state))
        .nest("/cart", cart::router(state))
        .nest("/orders", orders::router(state))
        .nest("/print-orders", print_orders::router(state))
        .nest("/reviews", reviews::router(state))
        .nest("/messages", messages::router(state))
        .nest("/reports", reports::router(state))
        .merge(health::router(state.clone()))
        .layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            optional_jwt_auth_middleware,
        ))
        // bulk uploads carry a spreadsheet and an image archive in one body
        .layer(DefaultBodyLimit::max(state.config.server.max_body_bytes))
}

/// Create the indexes of every collection. Safe to run on each start.
pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    let db = &state.db;
    domain_users::MongoUserRepository::new(db).init_indexes().await?;
    domain_products::MongoProductRepository::new(db)
        .init_indexes()
        .await?;
    domain_carts::MongoCartRepository::new(db).init_indexes().await?;
    domain_orders::MongoOrderRepository::new(db)
        .init_indexes()
        .await?;
    domain_print_orders::MongoPrintOrderRepository::new(db)
        .init_indexes()
        .await?;
    domain_reviews::MongoReviewRepository::new(db)
        .init_indexes()
        .await?;
    domain_messages::MongoThreadRepository::new(db)
        .init_indexes()
        .await?;
    tracing::info!("MongoDB indexes ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdminSeed, Config, Environment};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum_helpers::JwtConfig;
    use core_config::{app_info, server::ServerConfig};
    use database::MongoConfig;
    use domain_orders::PricingConfig;
    use http_body_util::BodyExt;
    use media_store::{MediaConfig, MediaStore};
    use serde_json::{Value, json};
    use test_utils::TestMongo;
    use tower::ServiceExt;

    async fn test_state(mongo: &TestMongo) -> AppState {
        let upload_dir =
            std::env::temp_dir().join(format!("printshop-api-test-{}", uuid::Uuid::new_v4()));
        let config = Config {
            app: app_info!(),
            mongodb: MongoConfig::new("mongodb://unused", "test"),
            server: ServerConfig::new("127.0.0.1".to_string(), 0),
            jwt: JwtConfig::new("an-integration-test-secret-of-32-chars+").unwrap(),
            media: MediaConfig::new(&upload_dir),
            pricing: PricingConfig::default(),
            admin: None,
            environment: Environment::Development,
        };
        let media = MediaStore::open(config.media.clone()).await.unwrap();
        let state = AppState::new(config, mongo.fresh_database(), media);
        init_indexes(&state).await.unwrap();
        state
    }

    async fn json_body(body: Body) -> Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn login(app: &Router, email: &str, password: &str) -> String {
        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/login",
                json!({ "email": email, "password": password }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response.into_body()).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_token_from_register_opens_customer_routes() {
        let mongo = TestMongo::new().await;
        let app = routes(&test_state(&mongo).await);

        let response = app
            .clone()
            .oneshot(Request::get("/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/register",
                json!({
                    "email": "ines@example.com",
                    "password": "paper-and-ink-42",
                    "name": "Ines"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let token = json_body(response.into_body()).await["access_token"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(get_with_token("/cart", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // a customer token does not open admin routes
        let response = app
            .oneshot(get_with_token("/reports/dashboard", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_seeded_admin_reaches_reports() {
        let mongo = TestMongo::new().await;
        let state = test_state(&mongo).await;
        let seed = AdminSeed {
            email: "owner@example.com".to_string(),
            password: "press-room-2024".to_string(),
            name: "Owner".to_string(),
        };
        assert!(users::seed_admin(&state, &seed).await.unwrap());
        assert!(!users::seed_admin(&state, &seed).await.unwrap());

        let app = routes(&state);
        let token = login(&app, &seed.email, &seed.password).await;
        let response = app
            .oneshot(get_with_token("/reports/dashboard", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_token_is_treated_as_anonymous() {
        let mongo = TestMongo::new().await;
        let app = routes(&test_state(&mongo).await);

        // public catalog stays readable with a stale token
        let response = app
            .clone()
            .oneshot(get_with_token("/products", "not-a-jwt"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get_with_token("/orders", "not-a-jwt"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_ready_reports_dependencies() {
        let mongo = TestMongo::new().await;
        let app = routes(&test_state(&mongo).await);

        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["database"], "connected");
        assert_eq!(body["media"], "connected");
    }
}
