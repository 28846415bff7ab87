//! Handler tests for Users domain against a MongoDB container

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::{Extension, Router};
use axum_helpers::{JwtAuth, JwtConfig};
use domain_users::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use test_utils::{TestDataBuilder, TestMongo, admin_claims, customer_claims};
use tower::ServiceExt; // For oneshot()

const SECRET: &str = "test-secret-test-secret-test-secret";

async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn service(mongo: &TestMongo) -> UserService<MongoUserRepository> {
    let repo = MongoUserRepository::new(&mongo.fresh_database());
    repo.init_indexes().await.unwrap();
    UserService::new(repo)
}

fn jwt() -> JwtAuth {
    JwtAuth::new(&JwtConfig::new(SECRET).unwrap())
}

fn auth_app(service: UserService<MongoUserRepository>) -> Router {
    auth_handlers::router(AuthState::new(service, jwt()))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_register_then_login() {
    let mongo = TestMongo::new().await;
    let app = auth_app(service(&mongo).await);
    let builder = TestDataBuilder::from_test_name("handler_register_login");
    let email = builder.email("Buyer");

    let response = app
        .clone()
        .oneshot(post_json(
            "/register",
            json!({ "email": email, "password": "secret123", "name": "Buyer" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("access_token="));

    let auth: AuthResponse = json_body(response.into_body()).await;
    assert_eq!(auth.token_type, "Bearer");
    assert_eq!(auth.user.email, email.to_lowercase());
    assert_eq!(auth.user.roles, vec![Role::Customer]);
    let claims = jwt().verify_token(&auth.access_token).unwrap();
    assert_eq!(claims.sub, auth.user.id.to_string());

    let response = app
        .clone()
        .oneshot(post_json(
            "/register",
            json!({ "email": email, "password": "secret123", "name": "Again" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            json!({ "email": email, "password": "wrong-pass1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(post_json(
            "/login",
            json!({ "email": email, "password": "secret123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = json_body(response.into_body()).await;
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["user"]["last_login_at"].is_string());
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let mongo = TestMongo::new().await;
    let app = auth_app(service(&mongo).await);

    let response = app
        .oneshot(post_json(
            "/register",
            json!({ "email": "weak@example.com", "password": "password", "name": "Weak" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me_and_profile_update() {
    let mongo = TestMongo::new().await;
    let service = service(&mongo).await;
    let user = service
        .register(RegisterRequest {
            email: "me@example.com".into(),
            password: "secret123".into(),
            name: "Me".into(),
            phone: None,
        })
        .await
        .unwrap();

    let anonymous = auth_app(service.clone());
    let response = anonymous
        .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let app = auth_app(service).layer(Extension(customer_claims(user.id, &user.email)));
    let request = Request::builder()
        .method("PUT")
        .uri("/me")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "phone": "+1 555 0100",
                "addresses": [{
                    "line1": "1 Main St",
                    "city": "Springfield",
                    "postal_code": "12345",
                    "country": "US"
                }]
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let me: UserResponse = json_body(response.into_body()).await;
    assert_eq!(me.phone.as_deref(), Some("+1 555 0100"));
    assert_eq!(me.addresses.len(), 1);
    assert!(me.addresses[0].is_default);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let mongo = TestMongo::new().await;
    let app = auth_app(service(&mongo).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_admin_user_management() {
    let mongo = TestMongo::new().await;
    let service = service(&mongo).await;
    let customer = service
        .register(RegisterRequest {
            email: "shopper@example.com".into(),
            password: "secret123".into(),
            name: "Shopper".into(),
            phone: None,
        })
        .await
        .unwrap();

    let as_customer = handlers::router(service.clone())
        .layer(Extension(customer_claims(customer.id, &customer.email)));
    let response = as_customer
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = handlers::router(service).layer(Extension(admin_claims(uuid::Uuid::now_v7())));
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/?search=SHOPPER")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let list: UserList = json_body(response.into_body()).await;
    assert_eq!(list.total, 1);

    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/{}", customer.id))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "is_active": false }).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let updated: UserResponse = json_body(response.into_body()).await;
    assert!(!updated.is_active);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/{}", customer.id))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let request = Request::builder()
        .uri(format!("/{}", customer.id))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_seeded_admin_can_log_in() {
    let mongo = TestMongo::new().await;
    let service = service(&mongo).await;
    assert!(service.ensure_admin("admin@shop.test", "bootstrap1", "Admin").await.unwrap());
    assert!(!service.ensure_admin("admin@shop.test", "bootstrap1", "Admin").await.unwrap());

    let response = auth_app(service)
        .oneshot(post_json(
            "/login",
            json!({ "email": "admin@shop.test", "password": "bootstrap1" }),
        ))
        .await
        .unwrap();
    let auth: AuthResponse = json_body(response.into_body()).await;
    assert_eq!(auth.user.roles, vec![Role::Admin]);
}
