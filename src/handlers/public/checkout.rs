use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, OptionExt, Result};
use crate::extractors::Json;
use crate::gateway::PaymentRequest;
use crate::models::{CreateTransaction, PaymentMethod, PaymentStatus, Transaction};
use crate::order_no::generate_order_no;
use crate::session::SessionUser;
use crate::subscription::subscription_window;
use crate::util::format_money;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub product_id: String,
    /// Gateway payment channel; defaults to alipay.
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub payment_url: String,
    pub out_trade_no: String,
    pub transaction: Transaction,
}

/// Start a checkout: create the pending order and return the signed
/// gateway redirect URL.
pub async fn initiate_checkout(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let method: PaymentMethod = match request.payment_method.as_deref() {
        None | Some("") => PaymentMethod::Alipay,
        Some(s) => s
            .parse()
            .map_err(|_| AppError::BadRequest(msg::INVALID_PAYMENT_METHOD.into()))?,
    };

    let product = state
        .catalog
        .get(&request.product_id)
        .ok_or_else(|| AppError::NotFound(msg::PRODUCT_NOT_FOUND.into()))?
        .clone();

    let conn = state.db.get()?;
    let out_trade_no = generate_order_no();

    // Subscription windows are computed up front and stored with the
    // pending order; the webhook only flips the status later.
    let (starts_at, ends_at) = if product.is_subscription {
        let period = product.subscription_period.ok_or_else(|| {
            AppError::Internal(format!("Subscription product {} has no period", product.id))
        })?;

        let now = Utc::now();
        let current_end = queries::latest_subscription_end(&conn, &user.user_id)?
            .and_then(|ts| DateTime::from_timestamp(ts, 0));
        let window = subscription_window(now, current_end, period);

        tracing::info!(
            "Order {}: {} subscription window {} -> {}",
            out_trade_no,
            period,
            window.starts_at,
            window.ends_at
        );
        (
            Some(window.starts_at.timestamp()),
            Some(window.ends_at.timestamp()),
        )
    } else {
        (None, None)
    };

    let params = serde_json::json!({
        "user_id": user.user_id,
        "product_id": product.id,
    })
    .to_string();

    let transaction = queries::create_transaction(
        &conn,
        &CreateTransaction {
            user_id: user.user_id.clone(),
            out_trade_no: out_trade_no.clone(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            amount_cents: product.price_cents,
            payment_method: method,
            is_subscription: product.is_subscription,
            subscription_period: product.subscription_period,
            subscription_starts_at: starts_at,
            subscription_ends_at: ends_at,
            params: Some(params),
        },
    )?;

    let payment_url = state.gateway.payment_url(
        &PaymentRequest {
            money: format_money(product.price_cents),
            name: product.name.clone(),
            out_trade_no: out_trade_no.clone(),
            method,
        },
        &state.notify_url(),
        &state.success_page_url,
    );

    tracing::info!(
        "Checkout started: order={}, user={}, product={}",
        out_trade_no,
        user.user_id,
        product.id
    );

    Ok(Json(CheckoutResponse {
        payment_url,
        out_trade_no,
        transaction,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RepayRequest {
    pub out_trade_no: String,
}

#[derive(Debug, Serialize)]
pub struct RepayResponse {
    pub payment_url: String,
    pub out_trade_no: String,
}

/// Rebuild the payment URL for an existing pending order (the buyer closed
/// the gateway page and wants to try again). No new row, no new order
/// number.
pub async fn repay(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<RepayRequest>,
) -> Result<Json<RepayResponse>> {
    let conn = state.db.get()?;

    let transaction =
        queries::get_transaction_for_user(&conn, &request.out_trade_no, &user.user_id)
            .or_not_found(msg::ORDER_NOT_FOUND)?;

    if transaction.status != PaymentStatus::Pending {
        return Err(AppError::BadRequest(msg::ORDER_NOT_PENDING.into()));
    }

    let payment_url = state.gateway.payment_url(
        &PaymentRequest {
            money: format_money(transaction.amount_cents),
            name: transaction.product_name.clone(),
            out_trade_no: transaction.out_trade_no.clone(),
            method: transaction.payment_method,
        },
        &state.notify_url(),
        &state.success_page_url,
    );

    Ok(Json(RepayResponse {
        payment_url,
        out_trade_no: transaction.out_trade_no,
    }))
}
