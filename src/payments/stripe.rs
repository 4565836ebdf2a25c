use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{msg, AppError, Result};

use super::ProductKind;

type HmacSha256 = Hmac<Sha256>;

// Checkout sessions use ad-hoc price_data rather than pre-configured
// dashboard prices: the credit packs are parameterized by amount.

#[derive(Debug, Deserialize)]
struct CreateCheckoutSessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: String,
}

impl StripeClient {
    pub fn new(secret_key: &str, webhook_secret: &str) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.to_string(),
            webhook_secret: webhook_secret.to_string(),
        }
    }

    /// Create a Stripe checkout session for a purchase.
    ///
    /// `amount_cents` prices one-time purchases (credits, enterprise) and the
    /// monthly charge for subscriptions. Credits convert at 10 cents = 1 credit.
    pub async fn create_checkout_session(
        &self,
        kind: ProductKind,
        amount_cents: i64,
        customer_email: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<(String, String)> {
        let amount = amount_cents.to_string();
        let credits_desc = format!("{} simulation credits", amount_cents / 10);

        let mut form: Vec<(&str, &str)> = vec![
            ("success_url", success_url),
            ("cancel_url", cancel_url),
            ("customer_email", customer_email),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", "usd"),
            ("line_items[0][price_data][unit_amount]", &amount),
        ];

        match kind {
            ProductKind::Credits => {
                form.push(("mode", "payment"));
                form.push(("line_items[0][price_data][product_data][name]", "Simulation Credits"));
                form.push(("line_items[0][price_data][product_data][description]", &credits_desc));
            }
            ProductKind::Subscription => {
                form.push(("mode", "subscription"));
                form.push(("line_items[0][price_data][recurring][interval]", "month"));
                form.push(("line_items[0][price_data][product_data][name]", "Premium Subscription"));
                form.push((
                    "line_items[0][price_data][product_data][description]",
                    "Unlimited simulations and priority support",
                ));
            }
            ProductKind::Enterprise => {
                form.push(("mode", "payment"));
                form.push(("line_items[0][price_data][product_data][name]", "Enterprise Package"));
                form.push((
                    "line_items[0][price_data][product_data][description]",
                    "Custom enterprise solution",
                ));
            }
        }

        let response = self
            .client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let session: CreateCheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Stripe response: {}", e)))?;

        Ok((session.id, session.url))
    }

    /// Fetch the product behind a subscription (name plus any explicit tier
    /// metadata) for tier classification.
    pub async fn get_subscription_product(&self, subscription_id: &str) -> Result<StripeProduct> {
        let subscription: StripeSubscriptionDetail = self
            .get_json(&format!(
                "https://api.stripe.com/v1/subscriptions/{}",
                subscription_id
            ))
            .await?;

        let product_id = subscription
            .items
            .data
            .first()
            .map(|item| item.price.product.clone())
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Subscription {} has no line items",
                    subscription_id
                ))
            })?;

        self.get_json(&format!("https://api.stripe.com/v1/products/{}", product_id))
            .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Stripe response: {}", e)))
    }

    /// Maximum age of a webhook timestamp before it's rejected (in seconds).
    /// Stripe recommends 300 seconds (5 minutes).
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        // Stripe signature format: t=timestamp,v1=signature
        let parts: Vec<&str> = signature.split(',').collect();

        let mut timestamp = None;
        let mut sig_v1 = None;

        for part in parts {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                sig_v1 = Some(s);
            }
        }

        let timestamp_str =
            timestamp.ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?;
        let sig_v1 =
            sig_v1.ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?;

        // Parse and validate timestamp to prevent replay attacks.
        // Reject webhooks older than WEBHOOK_TIMESTAMP_TOLERANCE_SECS.
        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| AppError::BadRequest(msg::INVALID_TIMESTAMP_IN_SIGNATURE.into()))?;

        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "Stripe webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }

        // Also reject timestamps from the future (clock skew tolerance: 60 seconds)
        if age < -60 {
            tracing::warn!(
                "Stripe webhook rejected: timestamp in the future (age={}s)",
                age
            );
            return Ok(false);
        }

        // Construct signed payload
        let signed_payload = format!("{}.{}", timestamp_str, String::from_utf8_lossy(payload));

        // Compute expected signature
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Use constant-time comparison to prevent timing attacks.
        let expected_bytes = expected.as_bytes();
        let provided_bytes = sig_v1.as_bytes();

        // Length check is not constant-time, but that's fine - signature length
        // is not secret (it's always 64 hex chars for SHA-256)
        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}

/// Generic Stripe webhook event - object is parsed based on event_type
#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

// ============ checkout.session.completed ============

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub payment_status: String,
    pub amount_total: Option<i64>,
    pub customer_details: Option<StripeCustomerDetails>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
}

impl StripeCheckoutSession {
    /// Email entered during checkout, falling back to the customer record.
    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
    }
}

// ============ invoice.payment_succeeded / invoice.paid ============

#[derive(Debug, Deserialize)]
pub struct StripeInvoice {
    pub id: String,
    pub subscription: Option<String>,
    pub customer_email: Option<String>,
    pub amount_paid: Option<i64>,
    pub status: String,
}

// ============ customer.subscription.deleted ============

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer_email: Option<String>,
    pub status: Option<String>,
}

// ============ Subscription product lookup ============

#[derive(Debug, Deserialize)]
struct StripeSubscriptionDetail {
    items: StripeSubscriptionItems,
}

#[derive(Debug, Deserialize)]
struct StripeSubscriptionItems {
    data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscriptionItem {
    price: StripePrice,
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    product: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: StripeProductMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeProductMetadata {
    /// Explicit tier override set on the product in the Stripe dashboard.
    /// Preferred over name matching when present.
    pub tier: Option<String>,
}
