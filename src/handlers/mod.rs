pub mod accounts;
pub mod checkout;
pub mod webhooks;

use axum::{
    routing::{get, post},
    Router,
};

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/buy", post(checkout::initiate_buy))
        .route("/accounts/:email", get(accounts::get_account))
        .route(
            "/accounts/:email/transactions",
            get(accounts::list_account_transactions),
        )
        .merge(webhooks::router())
}
