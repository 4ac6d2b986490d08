use axum::extract::State;
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::Transaction;
use crate::session::SessionUser;

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    /// The most recent successful subscription purchase, if any. The
    /// storefront derives entitlement from its end date.
    pub subscription: Option<Transaction>,
}

pub async fn current_subscription(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Json<SubscriptionResponse>> {
    let conn = state.db.get()?;
    let subscription = queries::current_subscription(&conn, &user.user_id)?;
    Ok(Json(SubscriptionResponse { subscription }))
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Json<TransactionsResponse>> {
    let conn = state.db.get()?;
    let transactions = queries::list_transactions_for_user(&conn, &user.user_id)?;
    Ok(Json(TransactionsResponse { transactions }))
}
