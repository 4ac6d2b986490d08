//! Gateway payment notification handling.
//!
//! The gateway calls this endpoint server-to-server after a payment
//! attempt, and retries delivery until it reads the literal body
//! `success`. Any other body (we use `fail`) means "try again later", so
//! every rejection here is deliberate about which side should retry.

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::db::{queries, AppState};
use crate::gateway::{sign, TRADE_SUCCESS};
use crate::models::PaymentStatus;
use crate::util::{amounts_match, parse_money_cents};

/// Response per the gateway's webhook convention: status code plus a
/// literal `success`/`fail` text body.
pub type WebhookResult = (StatusCode, &'static str);

const ACK: WebhookResult = (StatusCode::OK, "success");
const BAD: WebhookResult = (StatusCode::BAD_REQUEST, "fail");
const UNKNOWN_ORDER: WebhookResult = (StatusCode::NOT_FOUND, "fail");
const STORE_ERROR: WebhookResult = (StatusCode::INTERNAL_SERVER_ERROR, "fail");

/// Decode a form-urlencoded query string into pairs, preserving every
/// parameter for signature verification.
fn parse_query(raw: &str) -> Option<Vec<(String, String)>> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            // '+' means space in form encoding; literal plus arrives as %2B.
            let k = k.replace('+', "%20");
            let v = v.replace('+', "%20");
            Some((
                urlencoding::decode(&k).ok()?.into_owned(),
                urlencoding::decode(&v).ok()?.into_owned(),
            ))
        })
        .collect()
}

pub async fn handle_gateway_webhook(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> WebhookResult {
    let Some(params) = raw.as_deref().and_then(parse_query) else {
        tracing::warn!("Webhook rejected: unparseable query string");
        return BAD;
    };

    let get = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    };

    let (
        Some(pid),
        Some(money),
        Some(out_trade_no),
        Some(trade_no),
        Some(trade_status),
        Some(provided_sign),
    ) = (
        get("pid"),
        get("money"),
        get("out_trade_no"),
        get("trade_no"),
        get("trade_status"),
        get("sign"),
    )
    else {
        tracing::warn!("Webhook rejected: missing required parameters");
        return BAD;
    };

    let borrowed: Vec<(&str, &str)> = params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    if !sign::verify(&borrowed, state.gateway.secret_key(), provided_sign) {
        tracing::warn!("Webhook rejected: signature mismatch for order {}", out_trade_no);
        return BAD;
    }

    if pid != state.gateway.merchant_id() {
        tracing::warn!("Webhook rejected: merchant id mismatch for order {}", out_trade_no);
        return BAD;
    }

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("DB connection error: {}", e);
            return STORE_ERROR;
        }
    };

    let transaction = match queries::get_transaction_by_order_no(&conn, out_trade_no) {
        Ok(Some(t)) => t,
        Ok(None) => {
            tracing::warn!("Webhook for unknown order {}", out_trade_no);
            return UNKNOWN_ORDER;
        }
        Err(e) => {
            tracing::error!("DB error looking up order {}: {}", out_trade_no, e);
            return STORE_ERROR;
        }
    };

    // Idempotency: a settled order acknowledges immediately so the gateway
    // stops retrying. Nothing is mutated twice.
    if transaction.status == PaymentStatus::Success {
        return ACK;
    }

    let Some(notified_cents) = parse_money_cents(money) else {
        tracing::warn!("Webhook rejected: unparseable amount for order {}", out_trade_no);
        return BAD;
    };
    if !amounts_match(transaction.amount_cents, notified_cents) {
        tracing::warn!(
            "Webhook rejected: amount mismatch for order {} (stored {}, notified {})",
            out_trade_no,
            transaction.amount_cents,
            notified_cents
        );
        return BAD;
    }

    if trade_status == TRADE_SUCCESS {
        // The pending guard inside makes this the sole writer of the
        // terminal state, whatever the delivery count.
        match queries::mark_transaction_paid(
            &conn,
            out_trade_no,
            Some(trade_no),
            Utc::now().timestamp(),
        ) {
            Ok(true) => {
                if transaction.is_subscription {
                    tracing::info!(
                        "Order {} paid, subscription {:?} -> {:?}",
                        out_trade_no,
                        transaction.subscription_starts_at,
                        transaction.subscription_ends_at
                    );
                } else {
                    tracing::info!("Order {} paid", out_trade_no);
                }
            }
            Ok(false) => {
                // Lost the settlement race; the winner already wrote the
                // terminal state, so this delivery still acknowledges.
                tracing::debug!("Order {} already settled concurrently", out_trade_no);
            }
            Err(e) => {
                tracing::error!("Failed to settle order {}: {}", out_trade_no, e);
                return STORE_ERROR;
            }
        }
        ACK
    } else {
        match queries::mark_transaction_failed(&conn, out_trade_no, trade_no) {
            Ok(_) => {
                tracing::info!(
                    "Order {} failed with gateway status {}",
                    out_trade_no,
                    trade_status
                );
            }
            Err(e) => {
                tracing::error!("Failed to record failure for order {}: {}", out_trade_no, e);
            }
        }
        // Failure outcomes acknowledge too; a retry would not change anything.
        ACK
    }
}
