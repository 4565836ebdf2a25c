//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to rusqlite errors.
///
/// This provides graceful error handling instead of panicking when the database
/// contains invalid enum values (from corruption, migration errors, etc.).
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const ACCOUNT_COLS: &str = "email, credits, subscription_tier, subscription_id, subscription_active, created_at, last_purchase, last_payment, total_spent_cents, subscription_cancelled";

pub const TRANSACTION_COLS: &str =
    "id, user_email, session_id, subscription_id, amount_cents, credits_added, type, status, created_at";

// ============ FromRow Implementations ============

impl FromRow for Account {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Account {
            email: row.get(0)?,
            credits: row.get(1)?,
            subscription_tier: parse_enum(row, 2, "subscription_tier")?,
            subscription_id: row.get(3)?,
            subscription_active: row.get::<_, i64>(4)? != 0,
            created_at: row.get(5)?,
            last_purchase: row.get(6)?,
            last_payment: row.get(7)?,
            total_spent_cents: row.get(8)?,
            subscription_cancelled: row.get(9)?,
        })
    }
}

impl FromRow for Transaction {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Transaction {
            id: row.get(0)?,
            user_email: row.get(1)?,
            session_id: row.get(2)?,
            subscription_id: row.get(3)?,
            amount_cents: row.get(4)?,
            credits_added: row.get(5)?,
            transaction_type: parse_enum(row, 6, "type")?,
            status: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}
