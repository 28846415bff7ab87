//! Handler tests for the Reports domain against a MongoDB container

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::{Extension, Router};
use chrono::Utc;
use domain_orders::{
    CustomerInfo, MongoOrderRepository, OrderLineInput, OrderService, PaymentMethod,
    PlaceOrderRequest, PricingConfig, ShippingMethod,
};
use domain_products::{
    CreateProduct, MongoProductRepository, Product, ProductCategory, ProductRepository,
    ProductStatus,
};
use domain_reports::*;
use http_body_util::BodyExt;
use mongodb::bson::{Document, doc};
use test_utils::{TestMongo, admin_claims, customer_claims};
use tower::ServiceExt;
use uuid::Uuid;

async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// One pickup order of three folders, leaving nine in stock, and one
/// customer registered today
async fn seeded_router(mongo: &TestMongo) -> Router {
    let db = mongo.fresh_database();

    let products = MongoProductRepository::new(&db);
    let folder = products
        .create(Product::new(CreateProduct {
            name: "Presentation folder".into(),
            description: String::new(),
            price: 1500,
            compare_at_price: None,
            stock: 12,
            category: ProductCategory::Stationery,
            status: ProductStatus::Active,
            images: vec![],
            sku: Some("FOLDER-A4".into()),
            brand: None,
            tags: vec![],
            attributes: Default::default(),
            featured: false,
            min_order_quantity: 1,
        }))
        .await
        .unwrap();

    let orders = OrderService::new(
        MongoOrderRepository::new(&db),
        MongoProductRepository::new(&db),
        PricingConfig::default(),
    );
    orders
        .place_order(
            Uuid::now_v7(),
            CustomerInfo {
                name: "Noor".into(),
                email: "noor@example.com".into(),
                phone: None,
            },
            PlaceOrderRequest {
                items: vec![OrderLineInput {
                    product_id: folder.id,
                    quantity: 3,
                }],
                shipping_method: ShippingMethod::Pickup,
                shipping_address: None,
                payment_method: PaymentMethod::PayOnPickup,
                name: None,
                phone: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    db.collection::<Document>("users")
        .insert_one(doc! {
            "_id": Uuid::now_v7().to_string(),
            "email": "noor@example.com",
            "roles": ["customer"],
            "created_at": Utc::now().to_rfc3339(),
        })
        .await
        .unwrap();

    handlers::router(ReportService::new(MongoReportSource::new(&db)))
}

#[tokio::test]
async fn test_sales_report_and_dashboard() {
    let mongo = TestMongo::new().await;
    let app = seeded_router(&mongo)
        .await
        .layer(Extension(admin_claims(Uuid::now_v7())));

    let response = app.clone().oneshot(get("/sales")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report: SalesReport =
        serde_json::from_slice(&body_bytes(response.into_body()).await).unwrap();
    assert_eq!(report.range.days(), 30);
    assert_eq!(report.summary.order_count, 1);
    assert_eq!(report.summary.gross_revenue, 4500);
    assert_eq!(report.summary.items_sold, 3);
    assert_eq!(report.top_products[0].quantity, 3);
    assert_eq!(report.new_customers, 1);
    assert_eq!(report.low_stock.len(), 1);
    assert_eq!(report.low_stock[0].stock, 9);
    assert_eq!(report.daily.iter().map(|d| d.revenue).sum::<i64>(), 4500);

    let response = app.oneshot(get("/dashboard")).await.unwrap();
    let dashboard: Dashboard =
        serde_json::from_slice(&body_bytes(response.into_body()).await).unwrap();
    assert_eq!(dashboard.today.orders, 1);
    assert_eq!(dashboard.today.new_customers, 1);
    assert_eq!(dashboard.pending_orders, 1);
    assert_eq!(dashboard.open_print_jobs, 0);
    assert_eq!(dashboard.low_stock_products, 1);
}

#[tokio::test]
async fn test_exports_are_attachments() {
    let mongo = TestMongo::new().await;
    let app = seeded_router(&mongo)
        .await
        .layer(Extension(admin_claims(Uuid::now_v7())));

    let response = app
        .clone()
        .oneshot(get("/export?format=csv&dataset=top_products"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"sales-report-top-products-"));
    let text = String::from_utf8(body_bytes(response.into_body()).await).unwrap();
    assert!(text.contains("Presentation folder,3,45.00"));

    let response = app.oneshot(get("/export?format=xlsx")).await.unwrap();
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let bytes = body_bytes(response.into_body()).await;
    // XLSX files are zip archives
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn test_reports_are_admin_only() {
    let mongo = TestMongo::new().await;
    let app = seeded_router(&mongo).await;

    let response = app.clone().oneshot(get("/sales")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .layer(Extension(customer_claims(Uuid::now_v7(), "noor@example.com")))
        .oneshot(get("/dashboard"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = seeded_router(&mongo)
        .await
        .layer(Extension(admin_claims(Uuid::now_v7())))
        .oneshot(get("/sales?from=2024-01-10&to=2024-01-01"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
