use std::env;
use std::path::PathBuf;

/// Credentials and endpoints for the payment gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Merchant id (`pid` on the wire).
    pub merchant_id: String,
    /// Shared signing secret.
    pub secret_key: String,
    /// Redirect endpoint the buyer is sent to.
    pub submit_url: String,
    /// Server-to-server order-status query endpoint.
    pub query_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Public base URL of this service, used for notify/return URLs.
    pub base_url: String,
    /// Where the buyer lands after paying (the storefront's success page).
    pub success_page_url: String,
    /// Optional JSON file overriding the built-in product catalog.
    pub products_path: Option<PathBuf>,
    pub gateway: GatewayConfig,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("TOLLBOOTH_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));
        let success_page_url = env::var("SUCCESS_PAGE_URL")
            .unwrap_or_else(|_| format!("{}/payment/success", base_url));

        let gateway = GatewayConfig {
            merchant_id: env::var("GATEWAY_MERCHANT_ID")
                .expect("GATEWAY_MERCHANT_ID must be set"),
            secret_key: env::var("GATEWAY_KEY").expect("GATEWAY_KEY must be set"),
            submit_url: env::var("GATEWAY_SUBMIT_URL").expect("GATEWAY_SUBMIT_URL must be set"),
            query_url: env::var("GATEWAY_QUERY_URL").expect("GATEWAY_QUERY_URL must be set"),
        };

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "tollbooth.db".to_string()),
            base_url,
            success_page_url,
            products_path: env::var("PRODUCTS_PATH").ok().map(PathBuf::from),
            gateway,
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
