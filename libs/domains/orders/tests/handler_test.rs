//! Handler tests for the Orders domain against a MongoDB container

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{Extension, Router};
use domain_orders::*;
use domain_products::{
    CreateProduct, MongoProductRepository, Product, ProductCategory, ProductRepository,
    ProductStatus,
};
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

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn product(name: &str, price: i64, stock: i32) -> CreateProduct {
    CreateProduct {
        name: name.to_string(),
        description: String::new(),
        price,
        compare_at_price: None,
        stock,
        category: ProductCategory::Flyers,
        status: ProductStatus::Active,
        images: vec![],
        sku: None,
        brand: None,
        tags: vec![],
        attributes: Default::default(),
        featured: false,
        min_order_quantity: 1,
    }
}

struct Fixture {
    customer: Router,
    other_customer: Router,
    admin: Router,
    products: MongoProductRepository,
    flyers: Product,
}

async fn fixture(mongo: &TestMongo) -> Fixture {
    let db = mongo.fresh_database();
    let orders = MongoOrderRepository::new(&db);
    orders.init_indexes().await.unwrap();
    let products = MongoProductRepository::new(&db);
    let flyers = products
        .create(Product::new(product("A5 flyers", 1200, 10)))
        .await
        .unwrap();

    let service = OrderService::new(
        orders,
        MongoProductRepository::new(&db),
        PricingConfig::default(),
    );
    Fixture {
        customer: handlers::router(service.clone())
            .layer(Extension(customer_claims(Uuid::now_v7(), "buyer@example.com"))),
        other_customer: handlers::router(service.clone())
            .layer(Extension(customer_claims(Uuid::now_v7(), "other@example.com"))),
        admin: handlers::router(service).layer(Extension(admin_claims(Uuid::now_v7()))),
        products,
        flyers,
    }
}

fn delivery_order(product_id: Uuid, quantity: i32) -> Value {
    json!({
        "items": [{ "product_id": product_id, "quantity": quantity }],
        "shipping_method": "standard",
        "shipping_address": {
            "recipient": "Buyer",
            "line1": "1 Main St",
            "city": "Springfield",
            "postal_code": "12345",
            "country": "US"
        },
        "payment_method": "cash_on_delivery"
    })
}

async fn stock_of(f: &Fixture) -> i32 {
    f.products
        .get_by_id(f.flyers.id)
        .await
        .unwrap()
        .unwrap()
        .stock
}

#[tokio::test]
async fn test_place_order_takes_stock() {
    let mongo = TestMongo::new().await;
    let f = fixture(&mongo).await;

    let response = f
        .customer
        .clone()
        .oneshot(json_request("POST", "/", delivery_order(f.flyers.id, 3)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let order: Order = json_body(response.into_body()).await;
    assert_eq!(order.subtotal, 3600);
    assert_eq!(order.shipping_fee, 500);
    assert_eq!(order.total, 4100);
    assert_eq!(order.customer.email, "buyer@example.com");
    assert_eq!(order.status_history.len(), 1);
    assert_eq!(stock_of(&f).await, 7);

    // Only 7 left
    let response = f
        .customer
        .clone()
        .oneshot(json_request("POST", "/", delivery_order(f.flyers.id, 8)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&f).await, 7);

    let response = f.customer.clone().oneshot(get("/")).await.unwrap();
    let list: OrderList = json_body(response.into_body()).await;
    assert_eq!(list.total, 1);
    assert_eq!(list.data[0].id, order.id);
}

#[tokio::test]
async fn test_checkout_validation() {
    let mongo = TestMongo::new().await;
    let f = fixture(&mongo).await;

    let mut missing_address = delivery_order(f.flyers.id, 1);
    missing_address["shipping_address"] = Value::Null;
    let response = f
        .customer
        .clone()
        .oneshot(json_request("POST", "/", missing_address))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = f
        .customer
        .clone()
        .oneshot(json_request("POST", "/", delivery_order(Uuid::now_v7(), 1)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_orders_are_private_and_cancellable() {
    let mongo = TestMongo::new().await;
    let f = fixture(&mongo).await;

    let response = f
        .customer
        .clone()
        .oneshot(json_request("POST", "/", delivery_order(f.flyers.id, 4)))
        .await
        .unwrap();
    let order: Order = json_body(response.into_body()).await;

    let response = f
        .other_customer
        .clone()
        .oneshot(get(&format!("/{}", order.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = f
        .customer
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/{}/cancel", order.id),
            json!({ "reason": "Ordered the wrong size" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled: Order = json_body(response.into_body()).await;
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&f).await, 10);

    // Cancelled is terminal
    let response = f
        .customer
        .clone()
        .oneshot(json_request("POST", &format!("/{}/cancel", order.id), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_fulfilment_flow() {
    let mongo = TestMongo::new().await;
    let f = fixture(&mongo).await;

    let response = f
        .customer
        .clone()
        .oneshot(json_request("POST", "/", delivery_order(f.flyers.id, 1)))
        .await
        .unwrap();
    let order: Order = json_body(response.into_body()).await;

    let response = f.customer.clone().oneshot(get("/admin")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = f
        .admin
        .clone()
        .oneshot(get(&format!(
            "/admin/number/{}",
            order.order_number.to_lowercase()
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = f
        .admin
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/admin/{}/status", order.id),
            json!({ "status": "shipped" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    for status in ["confirmed", "processing", "shipped"] {
        let response = f
            .admin
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/admin/{}/status", order.id),
                json!({ "status": status, "note": format!("now {status}") }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = f
        .admin
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/admin/{}/payment", order.id),
            json!({ "payment_status": "paid" }),
        ))
        .await
        .unwrap();
    let updated: Order = json_body(response.into_body()).await;
    assert_eq!(updated.payment_status, PaymentStatus::Paid);
    assert_eq!(updated.status, OrderStatus::Shipped);
    assert_eq!(updated.status_history.len(), 4);

    let response = f
        .admin
        .clone()
        .oneshot(get("/admin?status=shipped&search=buyer@"))
        .await
        .unwrap();
    let list: OrderList = json_body(response.into_body()).await;
    assert_eq!(list.total, 1);
}
