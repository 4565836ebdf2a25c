use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Accounts (credit balances and subscription status, keyed by email)
        CREATE TABLE IF NOT EXISTS users (
            email TEXT PRIMARY KEY,
            credits INTEGER NOT NULL DEFAULT 0 CHECK (credits >= 0),
            subscription_tier TEXT NOT NULL DEFAULT 'free'
                CHECK (subscription_tier IN ('free', 'premium', 'enterprise')),
            subscription_id TEXT,
            subscription_active INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            last_purchase INTEGER,
            last_payment INTEGER,
            total_spent_cents INTEGER NOT NULL DEFAULT 0 CHECK (total_spent_cents >= 0),
            subscription_cancelled INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_users_subscription ON users(subscription_id)
            WHERE subscription_id IS NOT NULL;

        -- Transactions (append-only audit trail, one row per processed event)
        -- session_id is unique where present: INSERT OR IGNORE on it is the
        -- idempotency guard against at-least-once webhook delivery.
        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            user_email TEXT NOT NULL,
            session_id TEXT,
            subscription_id TEXT,
            amount_cents INTEGER NOT NULL,
            credits_added INTEGER,
            type TEXT NOT NULL CHECK (type IN ('credit_purchase', 'subscription_payment')),
            status TEXT NOT NULL DEFAULT 'completed',
            created_at INTEGER NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_session ON transactions(session_id)
            WHERE session_id IS NOT NULL;
        CREATE INDEX IF NOT EXISTS idx_transactions_user_email ON transactions(user_email);
        CREATE INDEX IF NOT EXISTS idx_transactions_created ON transactions(created_at);

        -- Webhook events (replay prevention for subscription invoices)
        CREATE TABLE IF NOT EXISTS webhook_events (
            id TEXT PRIMARY KEY,
            event_id TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_webhook_events_created ON webhook_events(created_at);
        "#,
    )?;
    Ok(())
}
