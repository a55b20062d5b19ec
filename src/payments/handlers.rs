use axum::{extract::State, Json};
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::payments::client::ChargeReceipt;
use crate::payments::dto::ChargeRequest;
use crate::state::AppState;

/// Forward one charge to the processor. Exactly one terminal response per
/// request: a processor fault returns 400 and nothing else.
#[instrument(skip(state, payload))]
pub async fn create_charge(
    State(state): State<AppState>,
    Json(payload): Json<ChargeRequest>,
) -> Result<Json<ChargeReceipt>, ApiError> {
    let data = payload.require()?;
    let description = data.description();

    let receipt = state
        .payments
        .charge(data.amount, &description, &data.payment_token)
        .await
        .map_err(|e| {
            warn!(payer_id = %data.payer_id, amount = data.amount, error = %e, "charge failed");
            ApiError::bad_request(e)
        })?;

    info!(charge_id = %receipt.id, amount = receipt.amount, "charge completed");
    Ok(Json(receipt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn charge_goes_through_the_injected_client() {
        let state = AppState::fake();
        let payload = ChargeRequest {
            payer_id: Some("u-1".into()),
            payer_username: Some("buyer".into()),
            item_name: Some("Blue Shirt".into()),
            amount: Some(2550),
            payment_token: Some("tok_visa".into()),
        };
        let Json(receipt) = create_charge(State(state), Json(payload)).await.unwrap();
        assert_eq!(receipt.amount, 2550);
        assert_eq!(receipt.status, "succeeded");
    }

    #[tokio::test]
    async fn invalid_payload_never_reaches_the_processor() {
        let state = AppState::fake();
        let err = create_charge(State(state), Json(ChargeRequest::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
