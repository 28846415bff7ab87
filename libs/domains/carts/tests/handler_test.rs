//! Handler tests for the Carts domain against a MongoDB container

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{Extension, Router};
use domain_carts::*;
use domain_products::{
    CreateProduct, MongoProductRepository, Product, ProductCategory, ProductRepository,
    ProductStatus,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use test_utils::{TestMongo, customer_claims};
use tower::ServiceExt; // For oneshot()
use uuid::Uuid;

async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

struct Fixture {
    app: Router,
    anonymous: Router,
    pens: Product,
    paper: Product,
}

async fn fixture(mongo: &TestMongo) -> Fixture {
    let db = mongo.fresh_database();
    let products = MongoProductRepository::new(&db);
    let carts = MongoCartRepository::new(&db);
    carts.init_indexes().await.unwrap();

    let pens = products.create(product("Gel pens", 350, 20)).await.unwrap();
    let paper = products.create(product("A4 paper ream", 899, 2)).await.unwrap();

    let service = CartService::new(carts, products);
    let user = Uuid::now_v7();
    Fixture {
        app: handlers::router(service.clone())
            .layer(Extension(customer_claims(user, "cart@example.com"))),
        anonymous: handlers::router(service),
        pens,
        paper,
    }
}

fn product(name: &str, price: i64, stock: i32) -> Product {
    Product::new(CreateProduct {
        name: name.to_string(),
        description: String::new(),
        price,
        compare_at_price: None,
        stock,
        category: ProductCategory::Stationery,
        status: ProductStatus::Active,
        images: vec![],
        sku: None,
        brand: None,
        tags: vec![],
        attributes: Default::default(),
        featured: false,
        min_order_quantity: 1,
    })
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_cart_requires_sign_in() {
    let mongo = TestMongo::new().await;
    let f = fixture(&mongo).await;

    let response = f.anonymous.oneshot(empty_request("GET", "/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_add_update_remove_items() {
    let mongo = TestMongo::new().await;
    let f = fixture(&mongo).await;

    let response = f
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/items",
            json!({ "product_id": f.pens.id, "quantity": 2 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = f
        .app
        .clone()
        .oneshot(json_request("POST", "/items", json!({ "product_id": f.pens.id })))
        .await
        .unwrap();
    let cart: PricedCart = json_body(response.into_body()).await;
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].quantity, 3);
    assert_eq!(cart.subtotal, 1050);

    // Only two reams in stock
    let response = f
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/items",
            json!({ "product_id": f.paper.id, "quantity": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = f
        .app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/items/{}", f.pens.id),
            json!({ "quantity": 0 }),
        ))
        .await
        .unwrap();
    let cart: PricedCart = json_body(response.into_body()).await;
    assert!(cart.lines.is_empty());

    let response = f
        .app
        .oneshot(empty_request("DELETE", &format!("/items/{}", f.pens.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_quote_is_public() {
    let mongo = TestMongo::new().await;
    let f = fixture(&mongo).await;
    let unknown = Uuid::now_v7();

    let response = f
        .anonymous
        .oneshot(json_request(
            "POST",
            "/quote",
            json!({ "items": [
                { "product_id": f.pens.id, "quantity": 4 },
                { "product_id": f.paper.id, "quantity": 5 },
                { "product_id": unknown, "quantity": 1 }
            ] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cart: PricedCart = json_body(response.into_body()).await;
    assert_eq!(cart.subtotal, 1400);
    assert_eq!(cart.unavailable, vec![f.paper.id, unknown]);
}

#[tokio::test]
async fn test_merge_reports_issues() {
    let mongo = TestMongo::new().await;
    let f = fixture(&mongo).await;
    let unknown = Uuid::now_v7();

    let response = f
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/merge",
            json!({ "items": [
                { "product_id": f.paper.id, "quantity": 5 },
                { "product_id": unknown, "quantity": 1 }
            ] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let merged: MergeResult = json_body(response.into_body()).await;
    assert_eq!(merged.cart.lines.len(), 1);
    assert_eq!(merged.cart.lines[0].quantity, 2);
    assert_eq!(merged.issues.len(), 2);

    let response = f.app.oneshot(empty_request("GET", "/")).await.unwrap();
    let cart: PricedCart = json_body(response.into_body()).await;
    assert_eq!(cart.subtotal, 1798);
}

#[tokio::test]
async fn test_wishlist_flow() {
    let mongo = TestMongo::new().await;
    let f = fixture(&mongo).await;

    let response = f
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/wishlist",
            json!({ "product_id": f.pens.id }),
        ))
        .await
        .unwrap();
    let wishlist: WishlistView = json_body(response.into_body()).await;
    assert_eq!(wishlist.items.len(), 1);
    assert_eq!(wishlist.items[0].name.as_deref(), Some("Gel pens"));

    let response = f
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/wishlist/{}/move", f.pens.id),
            json!({ "quantity": 2 }),
        ))
        .await
        .unwrap();
    let cart: PricedCart = json_body(response.into_body()).await;
    assert_eq!(cart.item_count, 2);

    let response = f
        .app
        .clone()
        .oneshot(empty_request("GET", "/wishlist"))
        .await
        .unwrap();
    let wishlist: WishlistView = json_body(response.into_body()).await;
    assert!(wishlist.items.is_empty());

    let response = f
        .app
        .clone()
        .oneshot(empty_request("DELETE", "/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = f
        .app
        .oneshot(empty_request("DELETE", &format!("/wishlist/{}", f.pens.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stale_cart_write_is_rejected() {
    let mongo = TestMongo::new().await;
    let carts = MongoCartRepository::new(&mongo.fresh_database());
    let user = Uuid::now_v7();
    let pens = Uuid::now_v7();

    let mut first = Cart::new(user);
    first.set_quantity(pens, 1);
    let first = carts.save(first, None).await.unwrap();

    // a second "first write" for the same user loses the insert race
    let result = carts.save(Cart::new(user), None).await;
    assert!(matches!(result, Err(CartError::ConcurrentUpdate)));

    let read = carts.get(user).await.unwrap().unwrap();
    let mut ours = read.clone();
    let mut theirs = read.clone();

    theirs.set_quantity(pens, 4);
    carts.save(theirs, Some(read.updated_at)).await.unwrap();

    ours.set_quantity(pens, 2);
    let result = carts.save(ours, Some(read.updated_at)).await;
    assert!(matches!(result, Err(CartError::ConcurrentUpdate)));

    let stored = carts.get(user).await.unwrap().unwrap();
    assert_eq!(stored.quantity_of(pens), 4);
    assert_ne!(stored.updated_at, first.updated_at);
}
