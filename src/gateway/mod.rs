//! Payment-gateway protocol: parameter signing and the outbound client.

pub mod sign;

mod client;

pub use client::*;

/// Trade status the gateway reports for a completed payment, both in
/// webhook notifications and in status-query responses.
pub const TRADE_SUCCESS: &str = "TRADE_SUCCESS";
