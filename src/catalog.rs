//! Product catalog.
//!
//! The one source of truth for purchasable products. Every handler resolves
//! products through the catalog held in `AppState`; nothing re-declares
//! product data inline or fetches it over the network.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::SubscriptionPeriod;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Price in minor units of the gateway currency.
    pub price_cents: i64,
    #[serde(default)]
    pub is_subscription: bool,
    #[serde(default)]
    pub subscription_period: Option<SubscriptionPeriod>,
}

#[derive(Debug, Clone)]
pub struct ProductCatalog {
    products: HashMap<String, Product>,
}

impl ProductCatalog {
    /// The default storefront lineup.
    pub fn builtin() -> Self {
        Self::from_products(vec![
            Product {
                id: "basic-onetime".into(),
                name: "Basic (one-time)".into(),
                price_cents: 10,
                is_subscription: false,
                subscription_period: None,
            },
            Product {
                id: "pro-monthly".into(),
                name: "Pro (monthly)".into(),
                price_cents: 10,
                is_subscription: true,
                subscription_period: Some(SubscriptionPeriod::Monthly),
            },
            Product {
                id: "pro-yearly".into(),
                name: "Pro (yearly)".into(),
                price_cents: 100,
                is_subscription: true,
                subscription_period: Some(SubscriptionPeriod::Yearly),
            },
        ])
    }

    /// Load the catalog from a JSON array of products.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Internal(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let products: Vec<Product> = serde_json::from_str(&raw)?;
        if products.is_empty() {
            return Err(AppError::Internal(format!(
                "Catalog {} contains no products",
                path.display()
            )));
        }
        Ok(Self::from_products(products))
    }

    pub fn from_products(products: Vec<Product>) -> Self {
        let products = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self { products }
    }

    pub fn get(&self, product_id: &str) -> Option<&Product> {
        self.products.get(product_id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
