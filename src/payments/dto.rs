use serde::Deserialize;

use crate::error::ApiError;

/// Body of `POST /payment`. The payment token is the payload-level
/// credential; the route itself is unauthenticated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    #[serde(default)]
    pub payer_id: Option<String>,
    #[serde(default)]
    pub payer_username: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub payment_token: Option<String>,
}

#[derive(Debug)]
pub struct ChargeData {
    pub payer_id: String,
    pub payer_username: String,
    pub item_name: String,
    pub amount: i64,
    pub payment_token: String,
}

impl ChargeRequest {
    pub fn require(self) -> Result<ChargeData, ApiError> {
        let payer_id = self.payer_id.filter(|v| !v.is_empty());
        let payer_username = self.payer_username.filter(|v| !v.is_empty());
        let item_name = self.item_name.filter(|v| !v.is_empty());
        let payment_token = self.payment_token.filter(|v| !v.is_empty());
        let (Some(payer_id), Some(payer_username), Some(item_name), Some(payment_token)) =
            (payer_id, payer_username, item_name, payment_token)
        else {
            return Err(ApiError::bad_request("Missing parameters"));
        };
        let amount = match self.amount {
            Some(amount) if amount > 0 => amount,
            _ => return Err(ApiError::bad_request("amount must be a positive integer")),
        };
        Ok(ChargeData {
            payer_id,
            payer_username,
            item_name,
            amount,
            payment_token,
        })
    }
}

impl ChargeData {
    /// Charge description combining the item and the payer identity.
    pub fn description(&self) -> String {
        format!(
            "{}, purchased by {} ({})",
            self.item_name, self.payer_username, self.payer_id
        )
    }
}
