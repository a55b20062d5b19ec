use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::offers::dto::{
    OfferListResponse, OfferResponse, OfferSearchParams, PublishForm,
};
use crate::offers::query::SearchPlan;
use crate::offers::repo::{NewOffer, Offer, OfferWithOwner};
use crate::state::AppState;
use crate::storage::{store_image, ImageUpload};
use crate::users::extractors::AuthUser;

#[instrument(skip(state))]
pub async fn list_offers(
    State(state): State<AppState>,
    Query(params): Query<OfferSearchParams>,
) -> Result<Json<OfferListResponse>, ApiError> {
    let plan = SearchPlan::from_params(&params);

    let rows = OfferWithOwner::search(&state.db, &plan)
        .await
        .map_err(|e| ApiError::bad_request(e))?;
    let count = OfferWithOwner::count(&state.db, &plan)
        .await
        .map_err(|e| ApiError::bad_request(e))?;

    Ok(Json(OfferListResponse {
        count,
        offers: rows.into_iter().map(OfferResponse::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_offer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|e| ApiError::bad_request(e))?;
    let offer = OfferWithOwner::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::bad_request(e))?;

    // An unknown id is an empty result, not an error.
    let body = match offer {
        Some(offer) => serde_json::to_value(OfferResponse::from(offer))
            .map_err(|e| ApiError::bad_request(e))?,
        None => Value::Null,
    };
    Ok(Json(body))
}

#[instrument(skip(state, identity, multipart))]
pub async fn publish_offer(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<OfferResponse>, ApiError> {
    let mut form = PublishForm::default();
    let mut picture: Option<ImageUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => form.title = Some(field.text().await.map_err(|e| ApiError::bad_request(e))?),
            "description" => {
                form.description = Some(field.text().await.map_err(|e| ApiError::bad_request(e))?)
            }
            "price" => form.price = Some(field.text().await.map_err(|e| ApiError::bad_request(e))?),
            "brand" => form.brand = Some(field.text().await.map_err(|e| ApiError::bad_request(e))?),
            "size" => form.size = Some(field.text().await.map_err(|e| ApiError::bad_request(e))?),
            "condition" => {
                form.condition = Some(field.text().await.map_err(|e| ApiError::bad_request(e))?)
            }
            "color" => form.color = Some(field.text().await.map_err(|e| ApiError::bad_request(e))?),
            "city" => form.city = Some(field.text().await.map_err(|e| ApiError::bad_request(e))?),
            "picture" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field.bytes().await.map_err(|e| ApiError::bad_request(e))?;
                picture = Some(ImageUpload { body, content_type });
            }
            _ => {}
        }
    }

    let data = form.require()?;
    let picture = picture.ok_or_else(|| ApiError::bad_request("Missing parameters"))?;

    // The offer is fully built in memory before the single store write; the
    // image goes to the media host first, scoped under the new offer's id.
    let offer_id = Uuid::new_v4();
    let image = store_image(
        state.storage.as_ref(),
        &format!("offers/{}", offer_id),
        picture,
    )
    .await
    .map_err(|e| ApiError::bad_request(e))?;

    let new_offer = NewOffer {
        id: offer_id,
        product_name: data.title.clone(),
        product_description: data.description.clone(),
        product_price: data.price,
        product_details: data.details_json(),
        product_image: Some(image.clone()),
        owner_id: identity.id,
    };

    let offer = match Offer::insert(&state.db, &new_offer).await {
        Ok(offer) => offer,
        Err(e) => {
            // The upload already happened; best-effort compensating delete so
            // the failed publish leaves no orphaned asset behind.
            if let Err(del) = state.storage.delete_object(&image.key).await {
                warn!(key = %image.key, error = %del, "orphaned image left on media host");
            }
            return Err(ApiError::bad_request(e));
        }
    };

    info!(offer_id = %offer.id, owner_id = %identity.id, price = offer.product_price, "offer published");
    Ok(Json(OfferResponse::published(offer, &identity)))
}
