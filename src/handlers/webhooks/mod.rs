mod gateway;

pub use gateway::handle_gateway_webhook;

use axum::{routing::get, Router};

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    // The gateway notifies via GET query parameters but some deployments
    // deliver the same parameters with POST; both map to one handler.
    Router::new().route(
        "/webhook/gateway",
        get(handle_gateway_webhook).post(handle_gateway_webhook),
    )
}
