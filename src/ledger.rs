//! Credit ledger reconciliation.
//!
//! Given validated payment-event data, these functions compute the resulting
//! account state and persist it together with an audit transaction record.
//! Each operation runs in a single database transaction; idempotency guards
//! come first so at-least-once delivery from the payment provider cannot
//! double-apply an event.

use rusqlite::Connection;
use thiserror::Error;

use crate::db::queries;
use crate::error::AppError;
use crate::models::{CreateTransaction, SubscriptionTier, TransactionType};

/// Fixed exchange rate: 10 minor units of currency = 1 credit.
pub const MINOR_UNITS_PER_CREDIT: i64 = 10;

/// Credits granted for a charge of `amount_cents`.
pub fn credits_for_amount(amount_cents: i64) -> i64 {
    amount_cents / MINOR_UNITS_PER_CREDIT
}

/// Classify the subscription tier for a paid subscription.
///
/// An explicit tier carried on the product metadata wins. Otherwise the
/// product name is matched against the configured premium marker; anything
/// else is treated as an enterprise/custom plan.
pub fn classify_tier(
    explicit_tier: Option<&str>,
    product_name: &str,
    premium_marker: &str,
) -> SubscriptionTier {
    if let Some(tier) = explicit_tier.and_then(|t| t.parse::<SubscriptionTier>().ok()) {
        return tier;
    }
    if product_name.contains(premium_marker) {
        SubscriptionTier::Premium
    } else {
        SubscriptionTier::Enterprise
    }
}

/// Reconciliation failure. Translated to an HTTP status at the webhook
/// boundary; never propagated as a panic or opaque error.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no account found for {0}")]
    AccountNotFound(String),

    #[error(transparent)]
    Storage(#[from] AppError),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::Storage(AppError::Database(e))
    }
}

/// Data extracted from a completed checkout event.
#[derive(Debug)]
pub struct CheckoutData {
    pub email: String,
    pub amount_cents: i64,
    /// Checkout session id - the idempotency key for this purchase.
    pub session_id: String,
}

/// Data extracted from a successful subscription payment.
#[derive(Debug)]
pub struct SubscriptionPaymentData {
    pub email: String,
    pub subscription_id: String,
    pub amount_cents: i64,
    pub tier: SubscriptionTier,
    /// Invoice id for replay prevention, when the provider supplies one.
    pub event_id: Option<String>,
}

/// Outcome of processing a checkout event.
#[derive(Debug, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Credits granted and balance updated.
    Credited {
        credits_added: i64,
        new_balance: i64,
    },
    /// This session id was already processed (idempotent no-op).
    AlreadyProcessed,
}

/// Outcome of processing a subscription payment.
#[derive(Debug, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    Applied { tier: SubscriptionTier },
    /// This invoice id was already processed (idempotent no-op).
    AlreadyProcessed,
}

/// Apply a completed checkout: grant credits and record the purchase.
///
/// The transaction row is inserted first with INSERT OR IGNORE on the unique
/// session id. If it was already recorded the whole operation is a no-op -
/// re-processing the same session never double-credits. The balance update
/// itself is a single atomic upsert (creates the account with tier 'free'
/// when absent, increments when present).
pub fn apply_checkout_completed(
    conn: &mut Connection,
    data: &CheckoutData,
) -> Result<CheckoutOutcome, LedgerError> {
    let credits_added = credits_for_amount(data.amount_cents);

    let tx = conn.transaction()?;

    let inserted = queries::insert_transaction(
        &tx,
        &CreateTransaction {
            user_email: data.email.clone(),
            session_id: Some(data.session_id.clone()),
            subscription_id: None,
            amount_cents: data.amount_cents,
            credits_added: Some(credits_added),
            transaction_type: TransactionType::CreditPurchase,
        },
    )?;

    if !inserted {
        // Redelivery of an already-processed session. Nothing was written;
        // dropping the transaction rolls back cleanly.
        tracing::info!(
            "Checkout session {} already processed, skipping",
            data.session_id
        );
        return Ok(CheckoutOutcome::AlreadyProcessed);
    }

    let new_balance = queries::credit_account(&tx, &data.email, credits_added, data.amount_cents)?;

    tx.commit()?;

    tracing::info!(
        "Credited {} with {} credits (session={}, balance={})",
        data.email,
        credits_added,
        data.session_id,
        new_balance
    );

    Ok(CheckoutOutcome::Credited {
        credits_added,
        new_balance,
    })
}

/// Apply a successful subscription payment: set the tier, mark the
/// subscription active, and record the payment.
///
/// Fails with `AccountNotFound` when the account update affects zero rows -
/// the transaction rolls back so the provider's redelivery can retry once
/// the account exists.
pub fn apply_subscription_payment(
    conn: &mut Connection,
    data: &SubscriptionPaymentData,
) -> Result<SubscriptionOutcome, LedgerError> {
    let tx = conn.transaction()?;

    if let Some(event_id) = &data.event_id {
        if !queries::try_record_webhook_event(&tx, event_id)? {
            tracing::info!("Invoice {} already processed, skipping", event_id);
            return Ok(SubscriptionOutcome::AlreadyProcessed);
        }
    }

    if !queries::activate_subscription(&tx, &data.email, data.tier, &data.subscription_id)? {
        return Err(LedgerError::AccountNotFound(data.email.clone()));
    }

    queries::insert_transaction(
        &tx,
        &CreateTransaction {
            user_email: data.email.clone(),
            session_id: None,
            subscription_id: Some(data.subscription_id.clone()),
            amount_cents: data.amount_cents,
            credits_added: None,
            transaction_type: TransactionType::SubscriptionPayment,
        },
    )?;

    tx.commit()?;

    tracing::info!(
        "Updated subscription for {}: {} (subscription={})",
        data.email,
        data.tier,
        data.subscription_id
    );

    Ok(SubscriptionOutcome::Applied { tier: data.tier })
}

/// Apply a subscription cancellation: deactivate only. Tier and credit
/// balance are left untouched.
pub fn apply_subscription_cancelled(
    conn: &Connection,
    email: &str,
) -> Result<(), LedgerError> {
    if !queries::deactivate_subscription(conn, email)? {
        return Err(LedgerError::AccountNotFound(email.to_string()));
    }

    tracing::info!("Cancelled subscription for {}", email);
    Ok(())
}
