use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{store_image, ImageRef, ImageUpload};
use crate::users::credentials::{generate_key, hash_password, verify_password};
use crate::users::dto::{
    AuthResponse, LoginRequest, ProfileQuery, ProfileResponse, SignupForm, UpdatePasswordRequest,
};
use crate::users::extractors::AuthUser;
use crate::users::repo::{NewUser, User};

/// Sentinel value of `GET /user?id=` that lists every profile.
const ADMIN_QUERY: &str = "admin";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, multipart))]
pub async fn signup(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AuthResponse>, ApiError> {
    let mut form = SignupForm::default();
    let mut avatar_file: Option<ImageUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "email" => form.email = Some(field.text().await.map_err(|e| ApiError::bad_request(e))?),
            "username" => {
                form.username = Some(field.text().await.map_err(|e| ApiError::bad_request(e))?)
            }
            "phone" => form.phone = Some(field.text().await.map_err(|e| ApiError::bad_request(e))?),
            "password" => {
                form.password = Some(field.text().await.map_err(|e| ApiError::bad_request(e))?)
            }
            "avatar" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field.bytes().await.map_err(|e| ApiError::bad_request(e))?;
                avatar_file = Some(ImageUpload { body, content_type });
            }
            _ => {}
        }
    }

    let data = form.require()?;
    if !is_valid_email(&data.email) {
        warn!(email = %data.email, "signup with invalid email");
        return Err(ApiError::bad_request("Invalid email"));
    }

    // Duplicate email short-circuits before anything is written or uploaded;
    // the unique index on users.email backstops concurrent signups.
    let existing = User::find_by_email(&state.db, &data.email)
        .await
        .map_err(|e| ApiError::bad_request(e))?;
    if existing.is_some() {
        warn!(email = %data.email, "signup with already-registered email");
        return Err(ApiError::conflict("This email already has an account"));
    }

    let user_id = Uuid::new_v4();

    let avatar: Option<ImageRef> = match avatar_file {
        Some(file) => Some(
            store_image(state.storage.as_ref(), &format!("users/{}", user_id), file)
                .await
                .map_err(|e| ApiError::bad_request(e))?,
        ),
        None => None,
    };

    let salt = generate_key();
    let new_user = NewUser {
        id: user_id,
        email: data.email,
        username: data.username,
        phone: data.phone,
        avatar: avatar.clone(),
        password_hash: hash_password(&data.password, &salt),
        password_salt: salt,
        token: generate_key(),
    };

    let user = match User::create(&state.db, &new_user).await {
        Ok(user) => user,
        Err(e) => {
            // The avatar may already live on the media host; best-effort
            // compensating delete so the failed signup leaves nothing behind.
            if let Some(img) = &avatar {
                if let Err(del) = state.storage.delete_object(&img.key).await {
                    warn!(key = %img.key, error = %del, "orphaned avatar left on media host");
                }
            }
            return Err(ApiError::bad_request(e));
        }
    };

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok(Json(AuthResponse::from(&user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = payload.email.filter(|v| !v.trim().is_empty());
    let password = payload.password.filter(|v| !v.is_empty());
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::bad_request("Missing parameters"));
    };
    let email = email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &email)
        .await
        .map_err(|e| ApiError::bad_request(e))?;

    let Some(user) = user else {
        warn!(email = %email, "login with unknown email");
        return Err(ApiError::Unauthorized("email not known".into()));
    };

    if !verify_password(&password, &user.password_salt, &user.password_hash) {
        warn!(email = %email, user_id = %user.id, "login with wrong password");
        return Err(ApiError::Unauthorized("wrong email/password".into()));
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse::from(&user)))
}

#[instrument(skip(state, identity, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let previous = payload.previous_password.filter(|p| !p.is_empty());
    let new = payload.new_password.filter(|p| !p.is_empty());
    let (Some(previous), Some(new)) = (previous, new) else {
        return Err(ApiError::bad_request("Missing parameters"));
    };

    let user = User::find_by_id(&state.db, identity.id)
        .await
        .map_err(|e| ApiError::bad_request(e))?
        .ok_or_else(ApiError::unauthorized)?;

    if !verify_password(&previous, &user.password_salt, &user.password_hash) {
        warn!(user_id = %user.id, "password rotation with wrong previous password");
        return Err(ApiError::bad_request("wrong previous password"));
    }

    // Compared under the stored salt, so an unchanged password is caught
    // before any new credentials are cut.
    if hash_password(&new, &user.password_salt) == user.password_hash {
        return Err(ApiError::bad_request("must be different"));
    }

    let salt = generate_key();
    let updated = User::rotate_credentials(
        &state.db,
        user.id,
        &hash_password(&new, &salt),
        &salt,
        &generate_key(),
    )
    .await
    .map_err(|e| ApiError::bad_request(e))?;

    info!(user_id = %updated.id, "credentials rotated, previous token revoked");
    Ok(Json(AuthResponse::from(&updated)))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|e| ApiError::bad_request(e))?;
    let user = User::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::bad_request(e))?;

    // An unknown id is an empty result, not an error.
    let body = match user {
        Some(user) => serde_json::to_value(ProfileResponse::from(&user))
            .map_err(|e| ApiError::bad_request(e))?,
        None => Value::Null,
    };
    Ok(Json(body))
}

#[instrument(skip(state))]
pub async fn list_profiles(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<Value>, ApiError> {
    let id = query
        .id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing id parameter"))?;

    if id == ADMIN_QUERY {
        let profiles: Vec<ProfileResponse> = User::list_all(&state.db)
            .await
            .map_err(|e| ApiError::bad_request(e))?
            .iter()
            .map(ProfileResponse::from)
            .collect();
        let body = serde_json::to_value(profiles).map_err(|e| ApiError::bad_request(e))?;
        return Ok(Json(body));
    }

    let id = Uuid::parse_str(&id).map_err(|e| ApiError::bad_request(e))?;
    let user = User::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::bad_request(e))?;
    let body = match user {
        Some(user) => serde_json::to_value(ProfileResponse::from(&user))
            .map_err(|e| ApiError::bad_request(e))?,
        None => Value::Null,
    };
    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("buyer@example.com"));
        assert!(is_valid_email("a.b+tag@sub.domain.fr"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("missing@tld"));
    }
}
