//! Query-layer tests: account upserts, transaction listing, and webhook
//! event retention.

mod common;

use common::*;
use rusqlite::params;

#[test]
fn test_get_account_missing_returns_none() {
    let conn = setup_test_db();

    let account = queries::get_account(&conn, "nobody@example.com").expect("Query should succeed");

    assert!(account.is_none());
}

#[test]
fn test_credit_account_creates_then_increments() {
    let conn = setup_test_db();

    let balance = queries::credit_account(&conn, "buyer@example.com", 10, 100)
        .expect("First credit should succeed");
    assert_eq!(balance, 10);

    let balance = queries::credit_account(&conn, "buyer@example.com", 5, 50)
        .expect("Second credit should succeed");
    assert_eq!(balance, 15);

    let account = queries::get_account(&conn, "buyer@example.com")
        .expect("Query should succeed")
        .expect("Account should exist");
    assert_eq!(account.credits, 15);
    assert_eq!(account.total_spent_cents, 150);
    assert_eq!(account.subscription_tier, SubscriptionTier::Free);
}

#[test]
fn test_activate_subscription_unknown_account() {
    let conn = setup_test_db();

    let updated = queries::activate_subscription(
        &conn,
        "ghost@example.com",
        SubscriptionTier::Premium,
        "sub_x",
    )
    .expect("Query should succeed");

    assert!(!updated);
}

#[test]
fn test_insert_transaction_duplicate_session_ignored() {
    let conn = setup_test_db();

    let input = CreateTransaction {
        user_email: "buyer@example.com".to_string(),
        session_id: Some("cs_once".to_string()),
        subscription_id: None,
        amount_cents: 1000,
        credits_added: Some(100),
        transaction_type: TransactionType::CreditPurchase,
    };

    assert!(queries::insert_transaction(&conn, &input).expect("First insert should succeed"));
    assert!(
        !queries::insert_transaction(&conn, &input).expect("Duplicate insert should not error"),
        "Duplicate session_id must be ignored"
    );
}

#[test]
fn test_insert_transaction_null_sessions_not_deduped() {
    let conn = setup_test_db();

    // Subscription payments carry no session id; the uniqueness guard only
    // applies where session_id is present.
    let input = CreateTransaction {
        user_email: "subscriber@example.com".to_string(),
        session_id: None,
        subscription_id: Some("sub_1".to_string()),
        amount_cents: 2900,
        credits_added: None,
        transaction_type: TransactionType::SubscriptionPayment,
    };

    assert!(queries::insert_transaction(&conn, &input).expect("First insert should succeed"));
    assert!(queries::insert_transaction(&conn, &input).expect("Second insert should succeed"));

    let transactions = queries::list_transactions(&conn, "subscriber@example.com", 50)
        .expect("Query should succeed");
    assert_eq!(transactions.len(), 2);
}

#[test]
fn test_list_transactions_newest_first() {
    let conn = setup_test_db();

    for (i, session) in ["cs_1", "cs_2", "cs_3"].iter().enumerate() {
        conn.execute(
            "INSERT INTO transactions
                 (id, user_email, session_id, amount_cents, credits_added, type, created_at)
             VALUES (?1, ?2, ?3, 100, 10, 'credit_purchase', ?4)",
            params![format!("tx_{}", i), "buyer@example.com", session, 1000 + i as i64],
        )
        .expect("Insert should succeed");
    }

    let transactions = queries::list_transactions(&conn, "buyer@example.com", 50)
        .expect("Query should succeed");

    assert_eq!(transactions.len(), 3);
    assert_eq!(transactions[0].session_id.as_deref(), Some("cs_3"));
    assert_eq!(transactions[2].session_id.as_deref(), Some("cs_1"));
}

#[test]
fn test_list_transactions_respects_limit() {
    let conn = setup_test_db();

    for i in 0..10 {
        conn.execute(
            "INSERT INTO transactions
                 (id, user_email, amount_cents, type, created_at)
             VALUES (?1, ?2, 100, 'credit_purchase', ?3)",
            params![format!("tx_{}", i), "buyer@example.com", 1000 + i],
        )
        .expect("Insert should succeed");
    }

    let transactions =
        queries::list_transactions(&conn, "buyer@example.com", 3).expect("Query should succeed");

    assert_eq!(transactions.len(), 3);
}

#[test]
fn test_list_transactions_scoped_to_account() {
    let mut conn = setup_test_db();

    ledger::apply_checkout_completed(
        &mut conn,
        &ledger::CheckoutData {
            email: "a@example.com".to_string(),
            amount_cents: 1000,
            session_id: "cs_a".to_string(),
        },
    )
    .expect("Checkout should apply");
    ledger::apply_checkout_completed(
        &mut conn,
        &ledger::CheckoutData {
            email: "b@example.com".to_string(),
            amount_cents: 500,
            session_id: "cs_b".to_string(),
        },
    )
    .expect("Checkout should apply");

    let transactions =
        queries::list_transactions(&conn, "a@example.com", 50).expect("Query should succeed");

    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].user_email, "a@example.com");
}

#[test]
fn test_webhook_event_dedup() {
    let conn = setup_test_db();

    assert!(queries::try_record_webhook_event(&conn, "evt_1").expect("First record should succeed"));
    assert!(
        !queries::try_record_webhook_event(&conn, "evt_1").expect("Replay should not error"),
        "Same event id must not record twice"
    );
    assert!(
        queries::try_record_webhook_event(&conn, "evt_2").expect("New event should record")
    );
}

#[test]
fn test_purge_old_webhook_events() {
    let conn = setup_test_db();

    queries::try_record_webhook_event(&conn, "evt_fresh").expect("Record should succeed");

    // Backdate one event past the retention window
    let old = chrono::Utc::now().timestamp() - 40 * 86400;
    conn.execute(
        "INSERT INTO webhook_events (id, event_id, created_at) VALUES ('wh_old', 'evt_old', ?1)",
        params![old],
    )
    .expect("Insert should succeed");

    let deleted = queries::purge_old_webhook_events(&conn, 30).expect("Purge should succeed");
    assert_eq!(deleted, 1);

    // The fresh event still blocks replays
    assert!(
        !queries::try_record_webhook_event(&conn, "evt_fresh").expect("Replay should not error")
    );
}

#[test]
fn test_count_accounts() {
    let conn = setup_test_db();

    assert_eq!(queries::count_accounts(&conn).expect("Count should succeed"), 0);

    create_test_account(&conn, "a@example.com", 1);
    create_test_account(&conn, "b@example.com", 1);

    assert_eq!(queries::count_accounts(&conn).expect("Count should succeed"), 2);
}
