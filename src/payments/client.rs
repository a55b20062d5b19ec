use std::time::Duration;

use anyhow::Context;
use axum::async_trait;
use serde::{Deserialize, Serialize};

/// Charges are denominated in a single fixed currency, in minor units.
pub const CURRENCY: &str = "eur";

/// Processor's answer to a successful charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Forward one charge to the processor. `amount` is in minor currency
    /// units; `source` is the client-supplied payment token.
    async fn charge(
        &self,
        amount: i64,
        description: &str,
        source: &str,
    ) -> anyhow::Result<ChargeReceipt>;
}

/// Stripe charges API client. The secret key doubles as the basic-auth user,
/// per Stripe's convention; the request body is form-encoded.
pub struct StripeCharges {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

#[derive(Debug, Default, Deserialize)]
struct StripeError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct StripeErrorEnvelope {
    #[serde(default)]
    error: StripeError,
}

impl StripeCharges {
    pub fn new(secret_key: &str, api_base: &str) -> anyhow::Result<Self> {
        // A client-level timeout bounds how long an unresponsive processor
        // can hold a request open.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build payment http client")?;
        Ok(Self {
            http,
            secret_key: secret_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PaymentClient for StripeCharges {
    async fn charge(
        &self,
        amount: i64,
        description: &str,
        source: &str,
    ) -> anyhow::Result<ChargeReceipt> {
        let params = [
            ("amount", amount.to_string()),
            ("currency", CURRENCY.to_string()),
            ("description", description.to_string()),
            ("source", source.to_string()),
        ];

        let response = self
            .http
            .post(format!("{}/v1/charges", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .context("payment processor request")?;

        let status = response.status();
        if !status.is_success() {
            let envelope: StripeErrorEnvelope = response.json().await.unwrap_or_default();
            let message = if envelope.error.message.is_empty() {
                status.to_string()
            } else {
                envelope.error.message
            };
            anyhow::bail!("charge failed: {}", message);
        }

        let receipt = response
            .json::<ChargeReceipt>()
            .await
            .context("decode charge response")?;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_round_trips_through_json() {
        let body = r#"{"id": "ch_123", "status": "succeeded", "amount": 2550, "currency": "eur", "livemode": false}"#;
        let receipt: ChargeReceipt = serde_json::from_str(body).unwrap();
        assert_eq!(receipt.id, "ch_123");
        assert_eq!(receipt.amount, 2550);
        assert_eq!(receipt.currency, CURRENCY);
    }

    #[test]
    fn error_envelope_tolerates_missing_fields() {
        let envelope: StripeErrorEnvelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.error.message.is_empty());

        let envelope: StripeErrorEnvelope =
            serde_json::from_str(r#"{"error": {"message": "Your card was declined."}}"#).unwrap();
        assert_eq!(envelope.error.message, "Your card was declined.");
    }
}
