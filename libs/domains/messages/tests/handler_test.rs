//! Handler tests for the Messages domain against a MongoDB container

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{Extension, Router};
use domain_messages::*;
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

async fn service(mongo: &TestMongo) -> MessageService<MongoThreadRepository> {
    let repo = MongoThreadRepository::new(&mongo.fresh_database());
    repo.init_indexes().await.unwrap();
    MessageService::new(repo)
}

fn as_customer(service: &MessageService<MongoThreadRepository>, id: Uuid) -> Router {
    handlers::router(service.clone()).layer(Extension(customer_claims(id, "jo@example.com")))
}

fn as_admin(service: &MessageService<MongoThreadRepository>) -> Router {
    handlers::router(service.clone()).layer(Extension(admin_claims(Uuid::now_v7())))
}

async fn unread(app: &Router, uri: &str) -> u64 {
    let response = app.clone().oneshot(request("GET", uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let count: UnreadCount = json_body(response.into_body()).await;
    count.threads
}

#[tokio::test]
async fn test_conversation_round_trip() {
    let mongo = TestMongo::new().await;
    let service = service(&mongo).await;
    let jo_id = Uuid::now_v7();
    let jo = as_customer(&service, jo_id);
    let admin = as_admin(&service);

    let response = jo
        .clone()
        .oneshot(json_request(
            "POST",
            "/",
            json!({ "subject": "Proof question", "body": "Can I see a proof first?" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let thread: Thread = json_body(response.into_body()).await;
    assert_eq!(thread.user_id, Some(jo_id));
    assert_eq!(thread.name, "jo");

    assert_eq!(unread(&admin, "/admin/unread").await, 1);

    let response = admin
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/{}/reply", thread.id),
            json!({ "body": "Yes, we email a PDF proof." }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let thread: Thread = json_body(response.into_body()).await;
    assert_eq!(thread.messages.len(), 2);
    assert_eq!(thread.messages[1].author, Side::Admin);

    assert_eq!(unread(&admin, "/admin/unread").await, 0);
    assert_eq!(unread(&jo, "/unread").await, 1);

    let response = jo
        .clone()
        .oneshot(request("GET", &format!("/{}", thread.id)))
        .await
        .unwrap();
    let read: Thread = json_body(response.into_body()).await;
    assert!(!read.unread_by_customer);
    assert_eq!(unread(&jo, "/unread").await, 0);

    let response = jo.oneshot(request("GET", "/")).await.unwrap();
    let mine: Vec<Thread> = json_body(response.into_body()).await;
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn test_guest_contact_and_privacy() {
    let mongo = TestMongo::new().await;
    let service = service(&mongo).await;
    let guest = handlers::router(service.clone());

    let response = guest
        .clone()
        .oneshot(json_request(
            "POST",
            "/",
            json!({ "subject": "Opening hours", "body": "Open on Saturday?" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = guest
        .oneshot(json_request(
            "POST",
            "/",
            json!({
                "name": "Lee",
                "email": "lee@example.com",
                "subject": "Opening hours",
                "body": "Open on Saturday?"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let thread: Thread = json_body(response.into_body()).await;
    assert_eq!(thread.user_id, None);

    let response = as_customer(&service, Uuid::now_v7())
        .oneshot(request("GET", &format!("/{}", thread.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = as_admin(&service)
        .oneshot(request("GET", "/admin?search=lee%40example&unread_only=true"))
        .await
        .unwrap();
    let inbox: ThreadList = json_body(response.into_body()).await;
    assert_eq!(inbox.total, 1);
}

#[tokio::test]
async fn test_closed_threads_reject_replies() {
    let mongo = TestMongo::new().await;
    let service = service(&mongo).await;
    let jo_id = Uuid::now_v7();
    let jo = as_customer(&service, jo_id);
    let admin = as_admin(&service);

    let response = jo
        .clone()
        .oneshot(json_request(
            "POST",
            "/",
            json!({ "subject": "Refund", "body": "Wrong colour" }),
        ))
        .await
        .unwrap();
    let thread: Thread = json_body(response.into_body()).await;

    let response = admin
        .clone()
        .oneshot(request("POST", &format!("/admin/{}/close", thread.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let reply = json!({ "body": "Any news?" });
    let response = jo
        .clone()
        .oneshot(json_request("POST", &format!("/{}/reply", thread.id), reply.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = admin
        .clone()
        .oneshot(request("POST", &format!("/admin/{}/reopen", thread.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = jo
        .clone()
        .oneshot(json_request("POST", &format!("/{}/reply", thread.id), reply))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = jo
        .oneshot(request("DELETE", &format!("/admin/{}", thread.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = admin
        .oneshot(request("DELETE", &format!("/admin/{}", thread.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
