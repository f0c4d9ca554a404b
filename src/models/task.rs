use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::errors::AppError;
use crate::models::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    #[schema(example = "Prepare quarterly report")]
    pub title: String,
    pub description: String,
    #[schema(format = DateTime, example = "2025-10-10T10:00:00Z")]
    pub due_date: DateTime<Utc>,
    pub completed: bool,
    pub user_id: Uuid,
    /// Snapshot of the owner's role, kept in sync with the owner row so
    /// role-scoped listings never need a join against users.
    pub user_role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
    pub user_id: String,
    pub user_role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbTask {
    pub async fn find(pool: &sqlx::SqlitePool, id: Uuid) -> Result<Option<DbTask>, sqlx::Error> {
        sqlx::query_as::<_, DbTask>(
            "SELECT id, title, description, due_date, completed, user_id, user_role, created_at, updated_at \
             FROM tasks WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(pool)
        .await
    }
}

impl TryFrom<DbTask> for Task {
    type Error = AppError;

    fn try_from(value: DbTask) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|_| AppError::internal(format!("malformed task id: {}", value.id)))?;
        let user_id = Uuid::parse_str(&value.user_id)
            .map_err(|_| AppError::internal(format!("malformed task owner id: {}", value.user_id)))?;
        let user_role = Role::parse(&value.user_role)
            .ok_or_else(|| AppError::internal(format!("malformed owner role: {}", value.user_role)))?;

        Ok(Task {
            id,
            title: value.title,
            description: value.description,
            due_date: value.due_date,
            completed: value.completed,
            user_id,
            user_role,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TaskCreateRequest {
    #[validate(length(min = 2, max = 1020, message = "title must be between 2 and 1020 characters"))]
    #[schema(example = "Prepare quarterly report")]
    pub title: String,
    #[validate(length(min = 2, max = 1020, message = "description must be between 2 and 1020 characters"))]
    #[schema(example = "Collect the team numbers and draft the slides.")]
    pub description: String,
    #[schema(format = DateTime, example = "2025-10-10T10:00:00Z")]
    pub due_date: DateTime<Utc>,
    pub completed: Option<bool>,
    /// Owner of the task. Required by policy: a task cannot be created
    /// without an owner, and assigning someone else requires dominating them.
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TaskUpdateRequest {
    #[validate(length(min = 2, max = 1020, message = "title must be between 2 and 1020 characters"))]
    pub title: String,
    #[validate(length(min = 2, max = 1020, message = "description must be between 2 and 1020 characters"))]
    pub description: String,
    #[schema(format = DateTime, example = "2025-11-01T10:00:00Z")]
    pub due_date: DateTime<Utc>,
    pub completed: Option<bool>,
    /// New owner. Only admins and superadmins may reassign away from themselves.
    pub user_id: Option<Uuid>,
}

/// Listing filters; every field is optional and absent fields compose to
/// no-op predicates. Range bound ordering is a validation concern here,
/// not re-checked by the query pipeline.
#[derive(Debug, Default, Deserialize, Validate, utoipa::IntoParams)]
#[validate(schema(function = validate_date_ranges))]
pub struct TaskListQuery {
    pub user_id: Option<String>,
    #[validate(length(min = 2, max = 1020, message = "title must be between 2 and 1020 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 2, max = 1020, message = "description must be between 2 and 1020 characters"))]
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub due_date_from: Option<DateTime<Utc>>,
    pub due_date_to: Option<DateTime<Utc>>,
    pub created_at_from: Option<DateTime<Utc>>,
    pub created_at_to: Option<DateTime<Utc>>,
    pub updated_at_from: Option<DateTime<Utc>>,
    pub updated_at_to: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: Option<i64>,
}

fn validate_date_ranges(query: &TaskListQuery) -> Result<(), ValidationError> {
    let ranges = [
        (query.due_date_from, query.due_date_to),
        (query.created_at_from, query.created_at_to),
        (query.updated_at_from, query.updated_at_to),
    ];

    for (from, to) in ranges {
        if let (Some(from), Some(to)) = (from, to) {
            if to < from {
                let mut err = ValidationError::new("date_range");
                err.message = Some("range end must not precede range start".into());
                return Err(err);
            }
        }
    }

    Ok(())
}
