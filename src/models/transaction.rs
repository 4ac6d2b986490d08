use serde::{Deserialize, Serialize};

/// A payment order: one row per checkout attempt.
///
/// Identified externally by `out_trade_no` (ours) and, once the gateway has
/// confirmed payment, by `trade_no` (theirs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,

    /// Order number generated at checkout time. Unique.
    pub out_trade_no: String,
    /// Gateway-assigned trade number, set when the outcome is known.
    pub trade_no: Option<String>,

    pub product_id: String,
    pub product_name: String,

    /// Amount in minor units (1 cent = 0.01 of the gateway currency).
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,

    pub is_subscription: bool,
    pub subscription_period: Option<SubscriptionPeriod>,
    pub subscription_starts_at: Option<i64>,
    pub subscription_ends_at: Option<i64>,

    /// Free-form JSON blob echoed through the gateway's `param` field.
    pub params: Option<String>,

    pub created_at: i64,
    pub paid_at: Option<i64>,
}

/// Data required to create a new pending transaction.
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub user_id: String,
    pub out_trade_no: String,
    pub product_id: String,
    pub product_name: String,
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub is_subscription: bool,
    pub subscription_period: Option<SubscriptionPeriod>,
    pub subscription_starts_at: Option<i64>,
    pub subscription_ends_at: Option<i64>,
    pub params: Option<String>,
}

/// Payment outcome of a transaction.
///
/// The only legal transitions are pending -> success and pending -> failed,
/// enforced by the store's conditional updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Billing cadence of a subscription product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPeriod {
    Monthly,
    Yearly,
}

impl SubscriptionPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for SubscriptionPeriod {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for SubscriptionPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment channel offered at checkout, in the gateway's `type` vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Alipay,
    Wxpay,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alipay => "alipay",
            Self::Wxpay => "wxpay",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "alipay" => Ok(Self::Alipay),
            "wxpay" => Ok(Self::Wxpay),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
