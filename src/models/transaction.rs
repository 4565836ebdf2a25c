use serde::{Deserialize, Serialize};

/// Immutable audit entry for a processed payment event.
///
/// Created once per processed event; never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_email: String,
    /// Checkout session id for purchases. Unique where present - this is
    /// the idempotency key against at-least-once webhook delivery.
    pub session_id: Option<String>,
    pub subscription_id: Option<String>,
    /// Amount charged, in cents.
    pub amount_cents: i64,
    /// Credits granted by this event (purchases only).
    pub credits_added: Option<i64>,
    pub transaction_type: TransactionType,
    pub status: String,
    pub created_at: i64,
}

/// Data required to record a new transaction.
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub user_email: String,
    pub session_id: Option<String>,
    pub subscription_id: Option<String>,
    pub amount_cents: i64,
    pub credits_added: Option<i64>,
    pub transaction_type: TransactionType,
}

/// Kind of payment event a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    CreditPurchase,
    SubscriptionPayment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditPurchase => "credit_purchase",
            Self::SubscriptionPayment => "subscription_payment",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_purchase" => Ok(Self::CreditPurchase),
            "subscription_payment" => Ok(Self::SubscriptionPayment),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
