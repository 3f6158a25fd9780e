mod support;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use medimart_orderservice::{
    middleware::{Claims, JwtVerifier},
    routes,
};
use serde_json::{Value, json};
use support::TestApp;
use tower::ServiceExt;
use uuid::Uuid;

const JWT_SECRET: &str = "test-jwt-secret";

fn router(app: &TestApp) -> Router {
    routes::app(app.state.clone(), JwtVerifier::new(JWT_SECRET))
}

fn token(user_id: Uuid) -> String {
    encode(
        &Header::default(),
        &Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        },
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(
    router: Router,
    method: Method,
    uri: &str,
    user_id: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(user_id)));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn user_routes_require_a_valid_token() {
    let app = TestApp::new();

    let (status, body) = send(router(&app), Method::GET, "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/api/orders")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = router(&app).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_is_public() {
    let app = TestApp::new();
    let pharmacy = app.pharmacy(200.0).await;
    let medicine = app.medicine(pharmacy.id, 50.0, 10).await;

    let (status, body) = send(router(&app), Method::GET, "/api/pharmacies", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], pharmacy.id.to_string());

    let uri = format!("/api/pharmacies/{}/medicines", pharmacy.id);
    let (status, body) = send(router(&app), Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], medicine.id.to_string());

    let uri = format!("/api/medicines/{}", Uuid::new_v4());
    let (status, body) = send(router(&app), Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn nearby_search_annotates_distance() {
    let app = TestApp::new();
    let pharmacy = app.pharmacy(0.0).await;

    let uri = format!(
        "/api/pharmacies?latitude={}&longitude={}",
        pharmacy.latitude.unwrap(),
        pharmacy.longitude.unwrap()
    );
    let (status, body) = send(router(&app), Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["distance"], 0.0);

    let (_, body) = send(
        router(&app),
        Method::GET,
        "/api/pharmacies?latitude=28.6139&longitude=77.2090",
        None,
        None,
    )
    .await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn checkout_flow_maps_business_errors() {
    let app = TestApp::new();
    let first = app.pharmacy(200.0).await;
    let second = app.pharmacy(0.0).await;
    let medicine = app.medicine(first.id, 50.0, 100).await;
    let elsewhere = app.medicine(second.id, 10.0, 100).await;
    let user_id = Uuid::new_v4();

    let (status, body) = send(
        router(&app),
        Method::POST,
        "/api/cart/items",
        Some(user_id),
        Some(json!({ "medicine_id": medicine.id, "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_amount"], 150.0);

    let (status, body) = send(
        router(&app),
        Method::POST,
        "/api/cart/items",
        Some(user_id),
        Some(json!({ "medicine_id": elsewhere.id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let checkout = json!({
        "delivery_address": "12 MG Road",
        "phone": "+91 98765 43210",
        "payment_method": "cod",
    });
    let (status, body) = send(
        router(&app),
        Method::POST,
        "/api/orders",
        Some(user_id),
        Some(checkout.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INVALID_STATE");

    let uri = format!("/api/cart/items/{}", medicine.id);
    let (status, _) = send(
        router(&app),
        Method::PATCH,
        &uri,
        Some(user_id),
        Some(json!({ "quantity": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        router(&app),
        Method::POST,
        "/api/orders",
        Some(user_id),
        Some(checkout),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment_status"], "completed");
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(router(&app), Method::GET, "/api/cart", Some(user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], Value::Null);

    let uri = format!("/api/orders/{order_id}/status");
    let (status, body) = send(
        router(&app),
        Method::PUT,
        &uri,
        Some(user_id),
        Some(json!({ "status": "teleported" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let (status, body) = send(
        router(&app),
        Method::PUT,
        &uri,
        Some(user_id),
        Some(json!({ "status": "delivered" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "delivered");

    let uri = format!("/api/orders/{order_id}");
    let (status, _) = send(router(&app), Method::GET, &uri, Some(Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn verify_accepts_provider_field_names() {
    let app = TestApp::new();
    let pharmacy = app.pharmacy(0.0).await;
    let medicine = app.medicine(pharmacy.id, 100.0, 10).await;
    let user_id = Uuid::new_v4();

    app.state.carts.add(user_id, medicine.id, 1).await.unwrap();
    let (_, body) = send(
        router(&app),
        Method::POST,
        "/api/orders",
        Some(user_id),
        Some(json!({
            "delivery_address": "12 MG Road",
            "phone": "+91 98765 43210",
            "payment_method": "online",
        })),
    )
    .await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        router(&app),
        Method::POST,
        "/api/payments/provider-orders",
        Some(user_id),
        Some(json!({ "order_id": order_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["amount"], 10_000);

    let (status, body) = send(
        router(&app),
        Method::POST,
        "/api/payments/verify",
        Some(user_id),
        Some(json!({
            "order_id": order_id,
            "razorpay_order_id": "o1",
            "razorpay_payment_id": "p1",
            "razorpay_signature": "0000",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VERIFICATION_FAILED");

    let uri = format!("/api/payments/transactions/{order_id}");
    let (status, body) = send(router(&app), Method::GET, &uri, Some(user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "failed");
}
