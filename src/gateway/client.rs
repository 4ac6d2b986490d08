use reqwest::Client;
use serde::Deserialize;

use crate::config::GatewayConfig;
use crate::error::{AppError, Result};
use crate::gateway::sign;
use crate::models::PaymentMethod;

/// The fields a redirect-style payment needs, straight from the order row.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Formatted 2-decimal money string (what gets signed).
    pub money: String,
    pub name: String,
    pub out_trade_no: String,
    pub method: PaymentMethod,
}

/// Client for the payment gateway: builds signed redirect URLs and performs
/// the direct order-status query. Constructed once in `main` and carried in
/// `AppState`; handlers never reach for globals.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn merchant_id(&self) -> &str {
        &self.config.merchant_id
    }

    pub fn secret_key(&self) -> &str {
        &self.config.secret_key
    }

    /// Build the signed URL the buyer is redirected to.
    ///
    /// The signature covers the raw parameter values; the URL itself carries
    /// them percent-encoded, with `sign`/`sign_type` appended last.
    pub fn payment_url(
        &self,
        request: &PaymentRequest,
        notify_url: &str,
        return_url: &str,
    ) -> String {
        let params = [
            ("pid", self.config.merchant_id.as_str()),
            ("money", request.money.as_str()),
            ("name", request.name.as_str()),
            ("notify_url", notify_url),
            ("out_trade_no", request.out_trade_no.as_str()),
            ("return_url", return_url),
            ("type", request.method.as_str()),
        ];
        let signature = sign::sign(&params, &self.config.secret_key);

        let mut sorted = params;
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let query: String = sorted
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!(
            "{}?{}&sign={}&sign_type={}",
            self.config.submit_url,
            query,
            signature,
            sign::SIGN_TYPE
        )
    }

    /// Ask the gateway for an order's current status.
    ///
    /// Returns `Ok(None)` when the gateway answers but has nothing useful
    /// (unknown order, non-200 application code). Transport and decode
    /// failures surface as `Upstream` errors for the caller to decide on.
    pub async fn query_order(&self, out_trade_no: &str) -> Result<Option<OrderStatus>> {
        let url = crate::util::append_query_params(
            &self.config.query_url,
            &[
                ("pid", self.config.merchant_id.as_str()),
                ("out_trade_no", out_trade_no),
            ],
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Status query failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Status query returned {}",
                response.status()
            )));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Bad status query response: {}", e)))?;

        if body.code != 200 {
            return Ok(None);
        }
        Ok(body.data)
    }
}

/// Order state as reported by the gateway's query endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatus {
    pub trade_status: Option<String>,
    pub trade_no: Option<String>,
}

impl OrderStatus {
    pub fn is_paid(&self) -> bool {
        self.trade_status.as_deref() == Some(super::TRADE_SUCCESS)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    code: i64,
    #[serde(default)]
    data: Option<OrderStatus>,
}
