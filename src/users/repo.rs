use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::storage::ImageRef;

/// Persisted user record. The raw password is never stored, only
/// `password_hash` under `password_salt`; `token` is the opaque bearer
/// credential for protected routes.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub avatar: Option<Json<ImageRef>>,
    pub password_hash: String,
    pub password_salt: String,
    pub token: String,
    pub created_at: OffsetDateTime,
}

pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub avatar: Option<ImageRef>,
    pub password_hash: String,
    pub password_salt: String,
    pub token: String,
}

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, phone, avatar,
                   password_hash, password_salt, token, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find the user holding a bearer token.
    pub async fn find_by_token(db: &PgPool, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, phone, avatar,
                   password_hash, password_salt, token, created_at
            FROM users
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, phone, avatar,
                   password_hash, password_salt, token, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, phone, avatar,
                   password_hash, password_salt, token, created_at
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Insert a new user in a single write.
    pub async fn create(db: &PgPool, new: &NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, username, phone, avatar,
                               password_hash, password_salt, token)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, email, username, phone, avatar,
                      password_hash, password_salt, token, created_at
            "#,
        )
        .bind(new.id)
        .bind(&new.email)
        .bind(&new.username)
        .bind(&new.phone)
        .bind(new.avatar.clone().map(Json))
        .bind(&new.password_hash)
        .bind(&new.password_salt)
        .bind(&new.token)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Replace hash, salt and token in one update. The previous token stops
    /// authenticating as soon as this commits.
    pub async fn rotate_credentials(
        db: &PgPool,
        id: Uuid,
        password_hash: &str,
        password_salt: &str,
        token: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2, password_salt = $3, token = $4
            WHERE id = $1
            RETURNING id, email, username, phone, avatar,
                      password_hash, password_salt, token, created_at
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(password_salt)
        .bind(token)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}
