//! Handler tests for the Reviews domain against a MongoDB container

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{Extension, Router};
use domain_products::{
    CreateProduct, MongoProductRepository, Product, ProductCategory, ProductRepository,
    ProductStatus,
};
use domain_reviews::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use test_utils::{TestMongo, admin_claims, customer_claims};
use tower::ServiceExt;
use uuid::Uuid;

async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

struct Fixture {
    service: ReviewService<MongoReviewRepository, MongoProductRepository>,
    products: MongoProductRepository,
    product: Product,
}

impl Fixture {
    fn as_customer(&self, email: &str) -> Router {
        handlers::router(self.service.clone())
            .layer(Extension(customer_claims(Uuid::now_v7(), email)))
    }

    fn as_admin(&self) -> Router {
        handlers::router(self.service.clone()).layer(Extension(admin_claims(Uuid::now_v7())))
    }

    fn anonymous(&self) -> Router {
        handlers::router(self.service.clone())
    }

    async fn stored_rating(&self) -> (f64, i64) {
        let product = self
            .products
            .get_by_id(self.product.id)
            .await
            .unwrap()
            .unwrap();
        (product.rating.average, product.rating.count)
    }
}

async fn fixture(mongo: &TestMongo) -> Fixture {
    let db = mongo.fresh_database();
    let reviews = MongoReviewRepository::new(&db);
    reviews.init_indexes().await.unwrap();
    let products = MongoProductRepository::new(&db);
    let product = products
        .create(Product::new(CreateProduct {
            name: "Matte business cards".into(),
            description: String::new(),
            price: 2900,
            compare_at_price: None,
            stock: 100,
            category: ProductCategory::BusinessCards,
            status: ProductStatus::Active,
            images: vec![],
            sku: None,
            brand: None,
            tags: vec![],
            attributes: Default::default(),
            featured: false,
            min_order_quantity: 1,
        }))
        .await
        .unwrap();

    Fixture {
        service: ReviewService::new(reviews, MongoProductRepository::new(&db)),
        products,
        product,
    }
}

async fn post_review(app: &Router, product_id: Uuid, rating: i32) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/",
            json!({ "product_id": product_id, "rating": rating, "comment": "Crisp print" }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_reviews_update_product_rating() {
    let mongo = TestMongo::new().await;
    let f = fixture(&mongo).await;
    let ann = f.as_customer("ann@example.com");
    let bob = f.as_customer("bob@example.com");

    assert_eq!(post_review(&ann, f.product.id, 5).await.status(), StatusCode::CREATED);
    assert_eq!(post_review(&bob, f.product.id, 2).await.status(), StatusCode::CREATED);
    assert_eq!(post_review(&ann, f.product.id, 4).await.status(), StatusCode::CONFLICT);
    assert_eq!(f.stored_rating().await, (3.5, 2));

    let response = f
        .anonymous()
        .oneshot(request(
            "GET",
            &format!("/product/{}?sort=lowest", f.product.id),
        ))
        .await
        .unwrap();
    let list: ReviewList = json_body(response.into_body()).await;
    assert_eq!(list.total, 2);
    assert_eq!(list.data[0].rating, 2);

    let response = f
        .anonymous()
        .oneshot(request("GET", &format!("/product/{}/summary", f.product.id)))
        .await
        .unwrap();
    let summary: RatingSummary = json_body(response.into_body()).await;
    assert_eq!(summary.distribution, vec![0, 1, 0, 0, 1]);
}

#[tokio::test]
async fn test_unknown_product_and_anonymous() {
    let mongo = TestMongo::new().await;
    let f = fixture(&mongo).await;

    let response = post_review(&f.as_customer("ann@example.com"), Uuid::now_v7(), 5).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_review(&f.anonymous(), f.product.id, 5).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_moderation_and_ownership() {
    let mongo = TestMongo::new().await;
    let f = fixture(&mongo).await;
    let ann = f.as_customer("ann@example.com");

    let review: Review = json_body(post_review(&ann, f.product.id, 1).await.into_body()).await;

    let response = f
        .as_customer("eve@example.com")
        .oneshot(json_request(
            "PATCH",
            &format!("/{}", review.id),
            json!({ "rating": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = f
        .as_admin()
        .oneshot(request("POST", &format!("/admin/{}/hide", review.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(f.stored_rating().await, (0.0, 0));

    let response = f
        .as_admin()
        .oneshot(request("GET", "/admin?status=hidden"))
        .await
        .unwrap();
    let hidden: ReviewList = json_body(response.into_body()).await;
    assert_eq!(hidden.total, 1);

    let response = ann.clone().oneshot(request("GET", "/mine")).await.unwrap();
    let mine: Vec<Review> = json_body(response.into_body()).await;
    assert_eq!(mine.len(), 1);

    let response = ann
        .oneshot(request("DELETE", &format!("/{}", review.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
