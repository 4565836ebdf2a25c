use serde::{Deserialize, Serialize};

/// Persisted record of a user's credit balance and subscription status.
///
/// Identified by email (the payment provider's customer reference).
/// All monetary amounts are in cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    /// Credit balance. Never decreases as a result of a purchase event.
    pub credits: i64,
    pub subscription_tier: SubscriptionTier,
    pub subscription_id: Option<String>,
    pub subscription_active: bool,
    pub created_at: i64,
    pub last_purchase: Option<i64>,
    pub last_payment: Option<i64>,
    /// Cumulative spend in cents across all purchases.
    pub total_spent_cents: i64,
    /// Timestamp of the most recent subscription cancellation, if any.
    pub subscription_cancelled: Option<i64>,
}

/// Subscription level granting feature access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Premium,
    Enterprise,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }
}

impl std::str::FromStr for SubscriptionTier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
