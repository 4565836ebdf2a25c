//! Test utilities and fixtures for Ledgerhook integration tests

#![allow(dead_code)]

use rusqlite::Connection;

// Re-export the main library crate
pub use ledgerhook::db::{init_db, queries};
pub use ledgerhook::ledger;
pub use ledgerhook::models::*;
pub use ledgerhook::payments::StripeClient;

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create a Stripe client with a fixed test webhook secret
pub fn test_stripe_client() -> StripeClient {
    StripeClient::new("sk_test_xxx", TEST_WEBHOOK_SECRET)
}

/// Create a test account with an initial credit balance (tier starts free)
pub fn create_test_account(conn: &Connection, email: &str, credits: i64) -> Account {
    queries::credit_account(conn, email, credits, credits * 10)
        .expect("Failed to create test account");
    queries::get_account(conn, email)
        .expect("Failed to fetch test account")
        .expect("Test account should exist")
}

/// Compute a valid Stripe webhook signature over `payload`
pub fn compute_stripe_signature(payload: &[u8], secret: &str, timestamp: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Current Unix timestamp as a string (for webhook signature tests)
pub fn current_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}
