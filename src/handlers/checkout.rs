use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{msg, AppError, Result};
use crate::payments::ProductKind;

#[derive(Debug, Deserialize)]
pub struct BuyRequest {
    pub customer_email: String,
    /// Charge amount in cents. For credit purchases, 10 cents = 1 credit.
    pub amount_cents: i64,
    /// One of "credits", "subscription", "enterprise"
    pub product: String,
}

#[derive(Debug, Serialize)]
pub struct BuyResponse {
    pub checkout_url: String,
    pub session_id: String,
}

pub async fn initiate_buy(
    State(state): State<AppState>,
    Json(request): Json<BuyRequest>,
) -> Result<Json<BuyResponse>> {
    let kind = request
        .product
        .parse::<ProductKind>()
        .map_err(|_| AppError::BadRequest(msg::INVALID_PRODUCT_KIND.into()))?;

    if request.amount_cents <= 0 {
        return Err(AppError::BadRequest("Amount must be positive".into()));
    }

    if request.customer_email.is_empty() {
        return Err(AppError::BadRequest("Customer email is required".into()));
    }

    // The payment provider redirects here after checkout; the resulting
    // webhook event is what actually credits the account.
    let success_url = format!("{}/success", state.base_url);
    let cancel_url = format!("{}/cancel", state.base_url);

    let (session_id, checkout_url) = state
        .stripe
        .create_checkout_session(
            kind,
            request.amount_cents,
            &request.customer_email,
            &success_url,
            &cancel_url,
        )
        .await?;

    Ok(Json(BuyResponse {
        checkout_url,
        session_id,
    }))
}
