use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::from_row::{query_all, query_one, ACCOUNT_COLS, TRANSACTION_COLS};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Accounts ============

pub fn get_account(conn: &Connection, email: &str) -> Result<Option<Account>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", ACCOUNT_COLS),
        &[&email],
    )
}

pub fn count_accounts(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count)
}

/// Atomically credit an account, creating it with tier 'free' if absent.
///
/// A single upsert statement: no read-then-write, so concurrent deliveries
/// for the same account cannot lose an increment. Returns the new balance.
pub fn credit_account(
    conn: &Connection,
    email: &str,
    credits: i64,
    amount_cents: i64,
) -> Result<i64> {
    let ts = now();
    let new_balance = conn.query_row(
        "INSERT INTO users (email, credits, subscription_tier, created_at, last_purchase, total_spent_cents)
         VALUES (?1, ?2, 'free', ?3, ?3, ?4)
         ON CONFLICT(email) DO UPDATE SET
             credits = credits + excluded.credits,
             last_purchase = excluded.last_purchase,
             total_spent_cents = total_spent_cents + excluded.total_spent_cents
         RETURNING credits",
        params![email, credits, ts, amount_cents],
        |row| row.get(0),
    )?;
    Ok(new_balance)
}

/// Set subscription tier and mark the subscription active.
/// Returns false if no account matched the email.
pub fn activate_subscription(
    conn: &Connection,
    email: &str,
    tier: SubscriptionTier,
    subscription_id: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET subscription_tier = ?1, subscription_id = ?2,
             subscription_active = 1, last_payment = ?3
         WHERE email = ?4",
        params![tier.as_str(), subscription_id, now(), email],
    )?;
    Ok(affected > 0)
}

/// Deactivate a subscription. Tier and credit balance are left untouched.
/// Returns false if no account matched the email.
pub fn deactivate_subscription(conn: &Connection, email: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET subscription_active = 0, subscription_cancelled = ?1
         WHERE email = ?2",
        params![now(), email],
    )?;
    Ok(affected > 0)
}

// ============ Transactions ============

/// Record a transaction, returning false if a row with the same session_id
/// already exists (idempotency guard - the unique index on session_id makes
/// INSERT OR IGNORE atomic).
pub fn insert_transaction(conn: &Connection, input: &CreateTransaction) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO transactions
             (id, user_email, session_id, subscription_id, amount_cents, credits_added, type, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            gen_id(),
            input.user_email,
            input.session_id,
            input.subscription_id,
            input.amount_cents,
            input.credits_added,
            input.transaction_type.as_str(),
            now(),
        ],
    )?;
    Ok(affected > 0)
}

pub fn get_transaction_by_session(
    conn: &Connection,
    session_id: &str,
) -> Result<Option<Transaction>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM transactions WHERE session_id = ?1",
            TRANSACTION_COLS
        ),
        &[&session_id],
    )
}

/// List an account's transactions, newest first.
pub fn list_transactions(conn: &Connection, email: &str, limit: i64) -> Result<Vec<Transaction>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM transactions WHERE user_email = ?1
             ORDER BY created_at DESC, id LIMIT ?2",
            TRANSACTION_COLS
        ),
        &[&email, &limit],
    )
}

// ============ Webhook Event Deduplication ============

/// Atomically record a webhook event, returning true if this is a new event.
/// Returns false if the event was already processed (replay prevention).
pub fn try_record_webhook_event(conn: &Connection, event_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO webhook_events (id, event_id, created_at) VALUES (?1, ?2, ?3)",
        params![gen_id(), event_id, now()],
    )?;
    Ok(affected > 0)
}

/// Purge webhook events beyond the retention period. These exist only for
/// replay prevention (Stripe retries for ~3 days max).
/// Returns the number of deleted records.
pub fn purge_old_webhook_events(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = now() - (retention_days * 86400);
    let deleted = conn.execute(
        "DELETE FROM webhook_events WHERE created_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}
