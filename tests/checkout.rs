//! Checkout tests: order creation, signed redirect URLs, subscription
//! stacking, and the repay flow.

mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Months, Utc};
use common::*;
use serde_json::json;
use tollbooth::gateway::sign::verify;

fn decode_query(url: &str) -> Vec<(String, String)> {
    url.split_once('?')
        .unwrap()
        .1
        .split('&')
        .filter_map(|p| p.split_once('='))
        .map(|(k, v)| {
            (
                k.to_string(),
                urlencoding::decode(v).unwrap().into_owned(),
            )
        })
        .collect()
}

fn param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[tokio::test]
async fn checkout_creates_pending_order_with_signed_url() {
    let state = create_test_app_state();
    let token = {
        let conn = state.db.get().unwrap();
        create_test_session(&conn, "user-1")
    };
    let app = app(state.clone());

    let (status, body) = post_json(
        &app,
        "/checkout",
        Some(&token),
        json!({"product_id": "basic-onetime", "payment_method": "alipay"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let out_trade_no = body["out_trade_no"].as_str().unwrap().to_string();
    assert_eq!(out_trade_no.len(), 17);
    assert!(out_trade_no.bytes().all(|b| b.is_ascii_digit()));

    let payment_url = body["payment_url"].as_str().unwrap();
    assert!(payment_url.starts_with("https://gateway.test/submit?"));

    let pairs = decode_query(payment_url);
    assert_eq!(param(&pairs, "pid"), Some(MERCHANT_ID));
    assert_eq!(param(&pairs, "money"), Some("0.10"));
    assert_eq!(param(&pairs, "out_trade_no"), Some(out_trade_no.as_str()));
    assert_eq!(param(&pairs, "type"), Some("alipay"));
    assert_eq!(
        param(&pairs, "notify_url"),
        Some("http://localhost:3000/webhook/gateway")
    );
    assert_eq!(
        param(&pairs, "return_url"),
        Some("http://localhost:3000/payment/success")
    );
    assert_eq!(param(&pairs, "sign_type"), Some("MD5"));

    // The URL's own signature must verify under the shared key.
    let provided = param(&pairs, "sign").unwrap().to_string();
    let borrowed: Vec<(&str, &str)> = pairs
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    assert!(verify(&borrowed, GATEWAY_KEY, &provided));

    // And the stored row is pending with the catalog amount.
    let conn = state.db.get().unwrap();
    let tx = queries::get_transaction_by_order_no(&conn, &out_trade_no)
        .unwrap()
        .unwrap();
    assert_eq!(tx.status, PaymentStatus::Pending);
    assert_eq!(tx.amount_cents, 10);
    assert_eq!(tx.user_id, "user-1");
    assert!(!tx.is_subscription);
}

#[tokio::test]
async fn checkout_requires_a_session() {
    let state = create_test_app_state();
    let app = app(state);

    let (status, _) = post_json(
        &app,
        "/checkout",
        None,
        json!({"product_id": "basic-onetime"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_json(
        &app,
        "/checkout",
        Some("not-a-real-token"),
        json!({"product_id": "basic-onetime"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_rejects_unknown_product_and_method() {
    let state = create_test_app_state();
    let token = {
        let conn = state.db.get().unwrap();
        create_test_session(&conn, "user-1")
    };
    let app = app(state);

    let (status, _) = post_json(
        &app,
        "/checkout",
        Some(&token),
        json!({"product_id": "enterprise"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post_json(
        &app,
        "/checkout",
        Some(&token),
        json!({"product_id": "basic-onetime", "payment_method": "paypal"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn first_subscription_starts_now() {
    let state = create_test_app_state();
    let token = {
        let conn = state.db.get().unwrap();
        create_test_session(&conn, "user-1")
    };
    let app = app(state.clone());

    let before = Utc::now().timestamp();
    let (status, body) = post_json(
        &app,
        "/checkout",
        Some(&token),
        json!({"product_id": "pro-monthly"}),
    )
    .await;
    let after = Utc::now().timestamp();
    assert_eq!(status, StatusCode::OK);

    let tx = &body["transaction"];
    let starts_at = tx["subscription_starts_at"].as_i64().unwrap();
    let ends_at = tx["subscription_ends_at"].as_i64().unwrap();

    assert!(starts_at >= before && starts_at <= after);

    let start = DateTime::from_timestamp(starts_at, 0).unwrap();
    let end = DateTime::from_timestamp(ends_at, 0).unwrap();
    assert_eq!(end, start + Months::new(1));
}

#[tokio::test]
async fn renewal_stacks_on_active_subscription() {
    let state = create_test_app_state();
    let current_end = (Utc::now() + Months::new(1)).timestamp();
    let token = {
        let conn = state.db.get().unwrap();
        let token = create_test_session(&conn, "user-1");

        // An already-paid subscription that is still running.
        let starts = Utc::now().timestamp();
        create_pending_subscription_order(&conn, "user-1", "20240101000000111", starts, current_end);
        assert!(queries::mark_transaction_paid(
            &conn,
            "20240101000000111",
            Some("GW-OLD"),
            starts
        )
        .unwrap());
        token
    };
    let app = app(state.clone());

    let (status, body) = post_json(
        &app,
        "/checkout",
        Some(&token),
        json!({"product_id": "pro-monthly"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The new period begins exactly where the active one ends.
    let tx = &body["transaction"];
    assert_eq!(tx["subscription_starts_at"].as_i64(), Some(current_end));

    let start = DateTime::from_timestamp(current_end, 0).unwrap();
    let expected_end = (start + Months::new(1)).timestamp();
    assert_eq!(tx["subscription_ends_at"].as_i64(), Some(expected_end));
}

#[tokio::test]
async fn pending_subscriptions_do_not_stack() {
    let state = create_test_app_state();
    let token = {
        let conn = state.db.get().unwrap();
        let token = create_test_session(&conn, "user-1");

        // A pending (unpaid) order must not influence the next window.
        let far_future = (Utc::now() + Months::new(12)).timestamp();
        create_pending_subscription_order(
            &conn,
            "user-1",
            "20240101000000222",
            Utc::now().timestamp(),
            far_future,
        );
        token
    };
    let app = app(state);

    let before = Utc::now().timestamp();
    let (_, body) = post_json(
        &app,
        "/checkout",
        Some(&token),
        json!({"product_id": "pro-monthly"}),
    )
    .await;

    let starts_at = body["transaction"]["subscription_starts_at"].as_i64().unwrap();
    assert!(starts_at >= before && starts_at <= Utc::now().timestamp());
}

#[tokio::test]
async fn repay_rebuilds_the_same_payment_url() {
    let state = create_test_app_state();
    let token = {
        let conn = state.db.get().unwrap();
        create_test_session(&conn, "user-1")
    };
    let app = app(state);

    let (_, body) = post_json(
        &app,
        "/checkout",
        Some(&token),
        json!({"product_id": "basic-onetime"}),
    )
    .await;
    let out_trade_no = body["out_trade_no"].as_str().unwrap().to_string();
    let original_url = body["payment_url"].as_str().unwrap().to_string();

    let (status, body) = post_json(
        &app,
        "/checkout/repay",
        Some(&token),
        json!({"out_trade_no": out_trade_no}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_url"].as_str(), Some(original_url.as_str()));
}

#[tokio::test]
async fn repay_refuses_settled_and_foreign_orders() {
    let state = create_test_app_state();
    let (token, other_token) = {
        let conn = state.db.get().unwrap();
        let token = create_test_session(&conn, "user-1");
        let other = create_test_session(&conn, "user-2");

        create_pending_order(&conn, "user-1", "20240101000000333", 10);
        assert!(queries::mark_transaction_paid(
            &conn,
            "20240101000000333",
            Some("GW-1"),
            Utc::now().timestamp()
        )
        .unwrap());

        create_pending_order(&conn, "user-1", "20240101000000444", 10);
        (token, other)
    };
    let app = app(state);

    // Already paid: not repayable.
    let (status, _) = post_json(
        &app,
        "/checkout/repay",
        Some(&token),
        json!({"out_trade_no": "20240101000000333"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Someone else's order: invisible.
    let (status, _) = post_json(
        &app,
        "/checkout/repay",
        Some(&other_token),
        json!({"out_trade_no": "20240101000000444"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
