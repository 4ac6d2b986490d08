use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, OptionExt, Result};
use crate::extractors::Json;
use crate::models::PaymentStatus;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub out_trade_no: String,
    #[serde(default)]
    pub trade_no: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
}

/// Re-check an order's status after the buyer is redirected back.
///
/// The webhook is the primary settlement path; this is the fallback for a
/// missed delivery. A pending order triggers a direct status query against
/// the gateway, and a confirmed payment goes through the same guarded
/// conditional update the webhook uses.
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let conn = state.db.get()?;

    let transaction = queries::get_transaction_by_order_no(&conn, &request.out_trade_no)
        .or_not_found(msg::ORDER_NOT_FOUND)?;

    if transaction.status == PaymentStatus::Success {
        return Ok(Json(VerifyResponse {
            status: transaction.status,
            paid_at: transaction.paid_at,
        }));
    }

    if transaction.status == PaymentStatus::Pending {
        match state.gateway.query_order(&transaction.out_trade_no).await {
            Ok(Some(order)) if order.is_paid() => {
                let trade_no = order.trade_no.as_deref().or(request.trade_no.as_deref());
                let updated = queries::mark_transaction_paid(
                    &conn,
                    &transaction.out_trade_no,
                    trade_no,
                    Utc::now().timestamp(),
                )?;
                if updated {
                    tracing::info!(
                        "Order {} confirmed via status query",
                        transaction.out_trade_no
                    );
                }

                // Re-read so the response reflects whoever won the race.
                let settled = queries::get_transaction_by_order_no(&conn, &request.out_trade_no)
                    .or_not_found(msg::ORDER_NOT_FOUND)?;
                return Ok(Json(VerifyResponse {
                    status: settled.status,
                    paid_at: settled.paid_at,
                }));
            }
            Ok(_) => {
                // Gateway has no confirmation yet; leave the order pending.
            }
            Err(e) => {
                // Query failures never change stored state; the webhook or a
                // later poll will settle the order.
                tracing::warn!(
                    "Gateway status query for {} failed: {}",
                    transaction.out_trade_no,
                    e
                );
            }
        }
    }

    Ok(Json(VerifyResponse {
        status: transaction.status,
        paid_at: transaction.paid_at,
    }))
}
