mod account;
mod checkout;
mod verify;

pub use account::*;
pub use checkout::*;
pub use verify::*;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/checkout", post(initiate_checkout))
        .route("/checkout/repay", post(repay))
        // Poll fallback the success page calls after redirect-back
        .route("/payment/verify", post(verify_payment))
        .route("/subscription", get(current_subscription))
        .route("/transactions", get(list_transactions))
}
