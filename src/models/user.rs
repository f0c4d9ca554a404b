use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::errors::AppError;
use crate::models::role::{Role, Status};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub role: Role,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbUser {
    pub async fn find(pool: &sqlx::SqlitePool, id: Uuid) -> Result<Option<DbUser>, sqlx::Error> {
        sqlx::query_as::<_, DbUser>(
            "SELECT id, name, email, password_hash, role, status, created_at, updated_at \
             FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_email(
        pool: &sqlx::SqlitePool,
        email: &str,
    ) -> Result<Option<DbUser>, sqlx::Error> {
        sqlx::query_as::<_, DbUser>(
            "SELECT id, name, email, password_hash, role, status, created_at, updated_at \
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(value: DbUser) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|_| AppError::internal(format!("malformed user id: {}", value.id)))?;
        let role = Role::parse(&value.role)
            .ok_or_else(|| AppError::internal(format!("malformed role: {}", value.role)))?;
        let status = Status::parse(&value.status)
            .ok_or_else(|| AppError::internal(format!("malformed status: {}", value.status)))?;

        Ok(User {
            id,
            name: value.name,
            email: value.email,
            role,
            status,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 2, max = 255, message = "name must be between 2 and 255 characters"))]
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[validate(email(message = "invalid email format"))]
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[validate(
        length(min = 8, max = 255, message = "password must be between 8 and 255 characters"),
        must_match(other = password_confirmation, message = "password confirmation does not match")
    )]
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password_confirmation: String,
    #[validate(custom(function = validate_role_value, message = "invalid role"))]
    #[schema(example = "user")]
    pub role: String,
    #[validate(custom(function = validate_status_value, message = "invalid status"))]
    #[schema(example = "enabled")]
    pub status: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 2, max = 255, message = "name must be between 2 and 255 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
    #[validate(
        length(min = 8, max = 255, message = "password must be between 8 and 255 characters"),
        must_match(other = password_confirmation, message = "password confirmation does not match")
    )]
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    #[validate(custom(function = validate_role_value, message = "invalid role"))]
    pub role: Option<String>,
    #[validate(custom(function = validate_status_value, message = "invalid status"))]
    pub status: Option<String>,
}

/// Listing filters. Empty strings are treated as absent, matching the
/// scope pipeline's "no-op when missing" rule.
#[derive(Debug, Default, Deserialize, Validate, utoipa::IntoParams)]
pub struct UserListQuery {
    pub id: Option<String>,
    #[validate(length(min = 2, max = 255, message = "name must be between 2 and 255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 255, message = "email must be between 2 and 255 characters"))]
    pub email: Option<String>,
    #[validate(custom(function = validate_role_value, message = "invalid role"))]
    pub role: Option<String>,
    #[validate(custom(function = validate_status_value, message = "invalid status"))]
    pub status: Option<String>,
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: Option<i64>,
}

pub fn validate_role_value(value: &str) -> Result<(), ValidationError> {
    if Role::is_valid(value) {
        Ok(())
    } else {
        Err(ValidationError::new("role"))
    }
}

pub fn validate_status_value(value: &str) -> Result<(), ValidationError> {
    if Status::is_valid(value) {
        Ok(())
    } else {
        Err(ValidationError::new("status"))
    }
}
