//! Order-number generation.
//!
//! Order numbers are the merchant-side key for a payment: a UTC timestamp
//! (`YYYYMMDDHHMMSS`) plus a zero-padded 3-digit random suffix, 17 digits
//! total. The random tail keeps concurrent checkouts in the same second
//! apart; true uniqueness is enforced by the UNIQUE column in the store.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Generate a fresh order number from the current clock.
pub fn generate_order_no() -> String {
    order_no_at(Utc::now())
}

/// Generate an order number for a given instant. Split out for tests.
fn order_no_at(at: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format!("{}{:03}", at.format("%Y%m%d%H%M%S"), suffix)
}

/// Cheap shape check to reject garbage before hitting the database.
pub fn is_valid_order_no(s: &str) -> bool {
    s.len() == 17 && s.bytes().all(|b| b.is_ascii_digit())
}
