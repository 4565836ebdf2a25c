//! Stripe webhook receiver.
//!
//! Verifies event authenticity before any business logic runs, decodes the
//! event kind, and routes to the ledger. Errors map to HTTP status codes
//! here: 4xx for signature/payload failures (terminal), 5xx for storage
//! failures so Stripe's redelivery governs retries. Unknown event kinds are
//! acknowledged as a no-op success.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::db::AppState;
use crate::ledger::{
    self, CheckoutData, CheckoutOutcome, LedgerError, SubscriptionOutcome,
    SubscriptionPaymentData,
};
use crate::payments::{
    StripeCheckoutSession, StripeInvoice, StripeSubscription, StripeWebhookEvent,
};

/// Result type for webhook processing steps: HTTP status plus a generic
/// message. Failure responses deliberately carry no internal detail.
pub type WebhookResult = (StatusCode, &'static str);

/// Data extracted from a paid subscription invoice. Tier classification
/// needs a product lookup, so it happens in the handler, not during parsing.
#[derive(Debug)]
pub struct InvoiceData {
    pub email: String,
    pub subscription_id: String,
    pub amount_cents: i64,
    pub event_id: String,
}

/// Parsed webhook event.
#[derive(Debug)]
pub enum WebhookEvent {
    /// Checkout completed - grants credits
    CheckoutCompleted(CheckoutData),
    /// Subscription invoice paid - sets tier and activates
    InvoicePaid(InvoiceData),
    /// Subscription cancelled - deactivates only
    SubscriptionCancelled { email: String },
    /// Event type not relevant to the ledger
    Ignored,
}

/// Parse the webhook payload into a ledger-facing event.
pub fn parse_event(body: &[u8]) -> Result<WebhookEvent, WebhookResult> {
    let event: StripeWebhookEvent = serde_json::from_slice(body).map_err(|e| {
        tracing::error!("Failed to parse Stripe webhook: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid JSON")
    })?;

    match event.event_type.as_str() {
        "checkout.session.completed" => parse_checkout_completed(&event),
        "invoice.payment_succeeded" | "invoice.paid" => parse_invoice_paid(&event),
        "customer.subscription.deleted" => parse_subscription_deleted(&event),
        other => {
            tracing::debug!("Unhandled event type: {}", other);
            Ok(WebhookEvent::Ignored)
        }
    }
}

fn parse_checkout_completed(event: &StripeWebhookEvent) -> Result<WebhookEvent, WebhookResult> {
    let session: StripeCheckoutSession = serde_json::from_value(event.data.object.clone())
        .map_err(|e| {
            tracing::error!("Failed to parse checkout session: {}", e);
            (StatusCode::BAD_REQUEST, "Invalid checkout session")
        })?;

    if session.payment_status != "paid" {
        return Ok(WebhookEvent::Ignored);
    }

    // A missing email cannot be fixed by redelivery - acknowledge and move on.
    let email = match session.email() {
        Some(e) => e.to_string(),
        None => {
            tracing::warn!("No customer email in checkout session {}", session.id);
            return Err((StatusCode::OK, "No customer email"));
        }
    };

    Ok(WebhookEvent::CheckoutCompleted(CheckoutData {
        email,
        amount_cents: session.amount_total.unwrap_or(0),
        session_id: session.id,
    }))
}

fn parse_invoice_paid(event: &StripeWebhookEvent) -> Result<WebhookEvent, WebhookResult> {
    let invoice: StripeInvoice = serde_json::from_value(event.data.object.clone()).map_err(|e| {
        tracing::error!("Failed to parse invoice: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid invoice")
    })?;

    // One-off invoices without a subscription are not ledger events
    let subscription_id = match invoice.subscription {
        Some(id) => id,
        None => return Ok(WebhookEvent::Ignored),
    };

    let email = match invoice.customer_email {
        Some(e) => e,
        None => {
            tracing::warn!("No customer email in invoice {}", invoice.id);
            return Err((StatusCode::OK, "No customer email"));
        }
    };

    Ok(WebhookEvent::InvoicePaid(InvoiceData {
        email,
        subscription_id,
        amount_cents: invoice.amount_paid.unwrap_or(0),
        event_id: invoice.id,
    }))
}

fn parse_subscription_deleted(event: &StripeWebhookEvent) -> Result<WebhookEvent, WebhookResult> {
    let subscription: StripeSubscription = serde_json::from_value(event.data.object.clone())
        .map_err(|e| {
            tracing::error!("Failed to parse subscription: {}", e);
            (StatusCode::BAD_REQUEST, "Invalid subscription")
        })?;

    let email = match subscription.customer_email {
        Some(e) => e,
        None => {
            tracing::warn!("No customer email in subscription {}", subscription.id);
            return Err((StatusCode::OK, "No customer email"));
        }
    };

    Ok(WebhookEvent::SubscriptionCancelled { email })
}

fn map_ledger_error(e: LedgerError, event_kind: &str, email: &str) -> WebhookResult {
    match e {
        LedgerError::AccountNotFound(_) => {
            tracing::error!("{}: no account found for {}", event_kind, email);
            (StatusCode::INTERNAL_SERVER_ERROR, "Account not found")
        }
        LedgerError::Storage(err) => {
            tracing::error!("{}: storage error for {}: {}", event_kind, email, err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

async fn process(state: &AppState, headers: &HeaderMap, body: &Bytes) -> Result<(), WebhookResult> {
    // Signature verification short-circuits before any business logic.
    let signature = headers
        .get("stripe-signature")
        .ok_or((StatusCode::BAD_REQUEST, "Missing stripe-signature header"))?
        .to_str()
        .map_err(|e| {
            tracing::debug!("Invalid UTF-8 in Stripe signature header: {}", e);
            (StatusCode::BAD_REQUEST, "Invalid signature header")
        })?;

    match state.stripe.verify_webhook_signature(body, signature) {
        Ok(true) => {}
        Ok(false) => return Err((StatusCode::UNAUTHORIZED, "Invalid signature")),
        Err(e) => {
            tracing::debug!("Malformed Stripe signature header: {}", e);
            return Err((StatusCode::BAD_REQUEST, "Invalid signature header"));
        }
    }

    match parse_event(body)? {
        WebhookEvent::CheckoutCompleted(data) => {
            let mut conn = state.db.get().map_err(|e| {
                tracing::error!("DB connection error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            })?;

            match ledger::apply_checkout_completed(&mut conn, &data)
                .map_err(|e| map_ledger_error(e, "checkout.session.completed", &data.email))?
            {
                CheckoutOutcome::Credited { .. } | CheckoutOutcome::AlreadyProcessed => Ok(()),
            }
        }
        WebhookEvent::InvoicePaid(data) => {
            // Tier lives on the subscription's product; fetch it before
            // touching the ledger.
            let product = state
                .stripe
                .get_subscription_product(&data.subscription_id)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to fetch product for subscription {}: {}",
                        data.subscription_id,
                        e
                    );
                    (StatusCode::INTERNAL_SERVER_ERROR, "Product lookup failed")
                })?;

            let tier = ledger::classify_tier(
                product.metadata.tier.as_deref(),
                &product.name,
                &state.premium_product_marker,
            );

            let mut conn = state.db.get().map_err(|e| {
                tracing::error!("DB connection error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            })?;

            let payment = SubscriptionPaymentData {
                email: data.email.clone(),
                subscription_id: data.subscription_id,
                amount_cents: data.amount_cents,
                tier,
                event_id: Some(data.event_id),
            };

            match ledger::apply_subscription_payment(&mut conn, &payment)
                .map_err(|e| map_ledger_error(e, "invoice.payment_succeeded", &data.email))?
            {
                SubscriptionOutcome::Applied { .. } | SubscriptionOutcome::AlreadyProcessed => {
                    Ok(())
                }
            }
        }
        WebhookEvent::SubscriptionCancelled { email } => {
            let conn = state.db.get().map_err(|e| {
                tracing::error!("DB connection error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            })?;

            ledger::apply_subscription_cancelled(&conn, &email)
                .map_err(|e| map_ledger_error(e, "customer.subscription.deleted", &email))
        }
        WebhookEvent::Ignored => Ok(()),
    }
}

/// Axum handler for Stripe webhooks.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match process(&state, &headers, &body).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err((status, message)) => (status, message).into_response(),
    }
}
