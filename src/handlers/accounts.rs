use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::db::{queries, AppState};
use crate::error::{msg, OptionExt, Result};
use crate::models::{Account, Transaction};

pub async fn get_account(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Account>> {
    let conn = state.db.get()?;
    let account = queries::get_account(&conn, &email)?.or_not_found(msg::ACCOUNT_NOT_FOUND)?;
    Ok(Json(account))
}

#[derive(Debug, Deserialize)]
pub struct TransactionListQuery {
    pub limit: Option<i64>,
}

pub async fn list_account_transactions(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<Vec<Transaction>>> {
    let conn = state.db.get()?;
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let transactions = queries::list_transactions(&conn, &email, limit)?;
    Ok(Json(transactions))
}
