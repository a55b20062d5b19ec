use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::offers::repo::{Offer, OfferWithOwner};
use crate::storage::ImageRef;
use crate::users::dto::Identity;

/// Query string of `GET /offers`. Every parameter is optional.
#[derive(Debug, Default, Deserialize)]
pub struct OfferSearchParams {
    pub title: Option<String>,
    #[serde(rename = "priceMin")]
    pub price_min: Option<f64>,
    #[serde(rename = "priceMax")]
    pub price_max: Option<f64>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Owner resolved to its reduced profile.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerProfile {
    pub id: Uuid,
    pub username: String,
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<ImageRef>,
}

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub id: Uuid,
    pub product_name: String,
    pub product_description: String,
    pub product_price: f64,
    pub product_details: Value,
    pub product_image: Option<ImageRef>,
    pub owner: Option<OwnerProfile>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct OfferListResponse {
    pub count: i64,
    pub offers: Vec<OfferResponse>,
}

impl From<OfferWithOwner> for OfferResponse {
    fn from(row: OfferWithOwner) -> Self {
        // The owner is a weak reference; a dangling one resolves to null
        // rather than dropping or failing the offer.
        let owner = row.owner_username.map(|username| OwnerProfile {
            id: row.owner_id,
            username,
            phone: row.owner_phone,
            avatar: row.owner_avatar.map(|a| a.0),
        });
        Self {
            id: row.id,
            product_name: row.product_name,
            product_description: row.product_description,
            product_price: row.product_price,
            product_details: row.product_details.0,
            product_image: row.product_image.map(|i| i.0),
            owner,
            created_at: row.created_at,
        }
    }
}

impl OfferResponse {
    /// Response for a freshly published offer, with the owner taken from the
    /// already-authenticated identity instead of a second lookup.
    pub fn published(offer: Offer, identity: &Identity) -> Self {
        Self {
            id: offer.id,
            product_name: offer.product_name,
            product_description: offer.product_description,
            product_price: offer.product_price,
            product_details: offer.product_details.0,
            product_image: offer.product_image.map(|i| i.0),
            owner: Some(OwnerProfile {
                id: identity.id,
                username: identity.account.username.clone(),
                phone: identity.account.phone.clone(),
                avatar: identity.account.avatar.clone(),
            }),
            created_at: offer.created_at,
        }
    }
}

/// Text fields collected from the publish multipart body.
#[derive(Debug, Default)]
pub struct PublishForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub condition: Option<String>,
    pub color: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug)]
pub struct PublishData {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub condition: Option<String>,
    pub color: Option<String>,
    pub city: Option<String>,
}

impl PublishForm {
    /// Title and a numeric price are required; the detail attributes stay
    /// optional.
    pub fn require(self) -> Result<PublishData, ApiError> {
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Missing parameters"))?;
        let price = self
            .price
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Missing parameters"))?;
        let price = price
            .trim()
            .parse::<f64>()
            .map_err(|_| ApiError::bad_request("price must be a number"))?;
        Ok(PublishData {
            title,
            description: self.description.unwrap_or_default(),
            price,
            brand: self.brand,
            size: self.size,
            condition: self.condition,
            color: self.color,
            city: self.city,
        })
    }
}

impl PublishData {
    /// Ordered detail attributes, one labeled entry per slot.
    pub fn details_json(&self) -> Value {
        json!([
            { "BRAND": self.brand },
            { "SIZE": self.size },
            { "CONDITION": self.condition },
            { "COLOR": self.color },
            { "LOCATION": self.city },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> PublishForm {
        PublishForm {
            title: Some("Blue Shirt".into()),
            description: Some("barely worn".into()),
            price: Some("25.50".into()),
            brand: Some("Acme".into()),
            size: Some("M".into()),
            condition: Some("good".into()),
            color: Some("blue".into()),
            city: Some("Lyon".into()),
        }
    }

    #[test]
    fn require_accepts_complete_form() {
        let data = form().require().unwrap();
        assert_eq!(data.title, "Blue Shirt");
        assert_eq!(data.price, 25.50);
    }

    #[test]
    fn require_rejects_missing_title_or_price() {
        let mut f = form();
        f.title = None;
        assert_eq!(f.require().unwrap_err().to_string(), "Missing parameters");

        let mut f = form();
        f.price = Some(" ".into());
        assert_eq!(f.require().unwrap_err().to_string(), "Missing parameters");
    }

    #[test]
    fn require_rejects_non_numeric_price() {
        let mut f = form();
        f.price = Some("cheap".into());
        assert_eq!(
            f.require().unwrap_err().to_string(),
            "price must be a number"
        );
    }

    #[test]
    fn details_keep_label_order() {
        let data = form().require().unwrap();
        let details = data.details_json();
        let labels: Vec<&str> = details
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry.as_object().unwrap().keys().next().unwrap().as_str())
            .collect();
        assert_eq!(labels, ["BRAND", "SIZE", "CONDITION", "COLOR", "LOCATION"]);
        assert_eq!(details[4]["LOCATION"], "Lyon");
    }

    #[test]
    fn absent_detail_fields_serialize_as_null() {
        let mut f = form();
        f.brand = None;
        let details = f.require().unwrap().details_json();
        assert_eq!(details[0]["BRAND"], Value::Null);
    }

    #[test]
    fn search_params_use_camel_case_price_bounds() {
        let params: OfferSearchParams =
            serde_json::from_str(r#"{"title": "shirt", "priceMin": 5, "priceMax": 30}"#).unwrap();
        assert_eq!(params.title.as_deref(), Some("shirt"));
        assert_eq!(params.price_min, Some(5.0));
        assert_eq!(params.price_max, Some(30.0));
    }
}
