use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;
use crate::users::dto::{Account, Identity};
use crate::users::repo::User;

/// Bearer-token gate: resolves `Authorization: Bearer <token>` against the
/// credential store and hands the matching identity to the handler.
pub struct AuthUser(pub Identity);

/// `Bearer <token>` -> `<token>`; anything else is rejected.
fn parse_bearer(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(ApiError::unauthorized)?;

        let token = parse_bearer(header).ok_or_else(ApiError::unauthorized)?;

        let user = User::find_by_token(&state.db, token)
            .await
            .map_err(|e| ApiError::bad_request(e))?;

        let Some(user) = user else {
            warn!("bearer token matched no user");
            return Err(ApiError::unauthorized());
        };

        Ok(AuthUser(Identity {
            id: user.id,
            account: Account::from(&user),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bearer_extracts_token() {
        assert_eq!(parse_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(parse_bearer("bearer abc123"), Some("abc123"));
    }

    #[test]
    fn parse_bearer_rejects_other_schemes() {
        assert_eq!(parse_bearer("Basic abc123"), None);
        assert_eq!(parse_bearer("abc123"), None);
        assert_eq!(parse_bearer("Bearer"), None);
        assert_eq!(parse_bearer("Bearer "), None);
    }
}
