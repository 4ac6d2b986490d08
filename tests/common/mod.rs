//! Test utilities and fixtures for tollbooth integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tower::ServiceExt;

pub use tollbooth::catalog::ProductCatalog;
pub use tollbooth::config::GatewayConfig;
pub use tollbooth::db::{init_db, queries, AppState};
pub use tollbooth::gateway::{sign, GatewayClient};
pub use tollbooth::models::*;

pub const MERCHANT_ID: &str = "1000";
pub const GATEWAY_KEY: &str = "test-secret-key";

/// In-memory pooled state with the builtin catalog and a test gateway.
/// The query URL is unroutable on purpose: status queries in tests must
/// fail fast, never hang.
pub fn create_test_app_state() -> AppState {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(4).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    AppState {
        db: pool,
        catalog: Arc::new(ProductCatalog::builtin()),
        gateway: GatewayClient::new(GatewayConfig {
            merchant_id: MERCHANT_ID.into(),
            secret_key: GATEWAY_KEY.into(),
            submit_url: "https://gateway.test/submit".into(),
            query_url: "http://127.0.0.1:1/query".into(),
        }),
        base_url: "http://localhost:3000".to_string(),
        success_page_url: "http://localhost:3000/payment/success".to_string(),
    }
}

/// The full router, assembled the way `main` does it.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(tollbooth::handlers::public::router())
        .merge(tollbooth::handlers::webhooks::router())
        .with_state(state)
}

/// Record a session and return its bearer token.
pub fn create_test_session(conn: &Connection, user_id: &str) -> String {
    let token = format!("test-token-{}", user_id);
    queries::create_session(conn, user_id, &token, 3600).unwrap();
    token
}

/// Insert a pending one-time order.
pub fn create_pending_order(
    conn: &Connection,
    user_id: &str,
    out_trade_no: &str,
    amount_cents: i64,
) -> Transaction {
    queries::create_transaction(
        conn,
        &CreateTransaction {
            user_id: user_id.into(),
            out_trade_no: out_trade_no.into(),
            product_id: "basic-onetime".into(),
            product_name: "Basic (one-time)".into(),
            amount_cents,
            payment_method: PaymentMethod::Alipay,
            is_subscription: false,
            subscription_period: None,
            subscription_starts_at: None,
            subscription_ends_at: None,
            params: None,
        },
    )
    .unwrap()
}

/// Insert a pending monthly-subscription order with an explicit window.
pub fn create_pending_subscription_order(
    conn: &Connection,
    user_id: &str,
    out_trade_no: &str,
    starts_at: i64,
    ends_at: i64,
) -> Transaction {
    queries::create_transaction(
        conn,
        &CreateTransaction {
            user_id: user_id.into(),
            out_trade_no: out_trade_no.into(),
            product_id: "pro-monthly".into(),
            product_name: "Pro (monthly)".into(),
            amount_cents: 10,
            payment_method: PaymentMethod::Alipay,
            is_subscription: true,
            subscription_period: Some(SubscriptionPeriod::Monthly),
            subscription_starts_at: Some(starts_at),
            subscription_ends_at: Some(ends_at),
            params: None,
        },
    )
    .unwrap()
}

/// Notification parameters the way the gateway would send them.
pub fn webhook_params<'a>(
    out_trade_no: &'a str,
    money: &'a str,
    trade_status: &'a str,
) -> Vec<(&'a str, &'a str)> {
    vec![
        ("pid", MERCHANT_ID),
        ("name", "Basic (one-time)"),
        ("money", money),
        ("out_trade_no", out_trade_no),
        ("trade_no", "GW-TRADE-001"),
        ("trade_status", trade_status),
        ("type", "alipay"),
    ]
}

/// Sign parameters with the test gateway key and render the query string.
pub fn signed_query(pairs: &[(&str, &str)]) -> String {
    let signature = sign::sign(pairs, GATEWAY_KEY);
    let mut query: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect();
    query.push(format!("sign={}", signature));
    query.push("sign_type=MD5".to_string());
    query.join("&")
}

/// Drive the webhook endpoint with a raw query string.
pub async fn deliver_webhook(app: &Router, query: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/webhook/gateway?{}", query))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    split_response(response).await
}

/// POST a JSON body, optionally with a bearer token.
pub async fn post_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let (status, text) = split_response(response).await;
    let json = if text.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

/// GET a JSON endpoint, optionally with a bearer token.
pub async fn get_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let (status, text) = split_response(response).await;
    let json = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn split_response(response: Response<Body>) -> (StatusCode, String) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}
