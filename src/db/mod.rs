mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::catalog::ProductCatalog;
use crate::gateway::GatewayClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state: everything a handler needs, constructed once in
/// `main` and cloned into the router. No process-wide singletons.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// The single source of truth for products.
    pub catalog: Arc<ProductCatalog>,
    pub gateway: GatewayClient,
    /// Public base URL of this service (for notify/return URLs).
    pub base_url: String,
    /// Storefront page the buyer returns to after paying.
    pub success_page_url: String,
}

impl AppState {
    pub fn notify_url(&self) -> String {
        format!("{}/webhook/gateway", self.base_url)
    }
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
