use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::storage::ImageRef;
use crate::users::repo::User;

/// Public account sub-record, embedded in auth responses and offer owners.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub username: String,
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<ImageRef>,
}

impl From<&User> for Account {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            phone: user.phone.clone(),
            avatar: user.avatar.as_ref().map(|a| a.0.clone()),
        }
    }
}

/// Identity attached to a request once the bearer token checked out.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub account: Account,
}

/// Response returned after signup, login or a password rotation.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub id: Uuid,
    pub token: String,
    pub account: Account,
}

impl From<&User> for AuthResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            token: user.token.clone(),
            account: Account::from(user),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub previous_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// Query string of `GET /user`: `id` is a user id or the literal `admin`.
#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub id: Option<String>,
}

/// Reduced profile for the public read routes.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<ImageRef>,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            avatar: user.avatar.as_ref().map(|a| a.0.clone()),
        }
    }
}

/// Text fields collected from the signup multipart body.
#[derive(Debug, Default)]
pub struct SignupForm {
    pub email: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct SignupData {
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub password: String,
}

impl SignupForm {
    /// Email, username and password are required; phone stays optional.
    pub fn require(self) -> Result<SignupData, ApiError> {
        let email = self.email.filter(|v| !v.trim().is_empty());
        let username = self.username.filter(|v| !v.trim().is_empty());
        let password = self.password.filter(|v| !v.is_empty());
        match (email, username, password) {
            (Some(email), Some(username), Some(password)) => Ok(SignupData {
                email: email.trim().to_lowercase(),
                username,
                phone: self.phone.filter(|v| !v.trim().is_empty()),
                password,
            }),
            _ => Err(ApiError::bad_request("Missing parameters")),
        }
    }
}
