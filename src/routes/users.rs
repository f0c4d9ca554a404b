use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::cache::TASK_LIST_TAG;
use crate::errors::{AppError, AppResult};
use crate::jwt::Actor;
use crate::models::role::{Role, Status};
use crate::models::user::{CreateUserRequest, DbUser, UpdateUserRequest, User, UserListQuery};
use crate::policies::user::{self as user_policy, UserAction};
use crate::scope::{normalized, run_user_list, UserFilter, UserPage};
use crate::utils::{hash_password, utc_now, validate_payload};

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Paginated users within the actor's scope", body = UserPage),
        (status = 403, description = "Listing denied")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
    Actor(actor): Actor,
) -> AppResult<Json<UserPage>> {
    let role_param = normalized(query.role.clone());
    user_policy::authorize(&actor, &UserAction::List { role: role_param.as_deref() })?;

    validate_payload(&query)?;

    let filter = UserFilter::from_query(&actor, &query);
    let page = query.page.unwrap_or(1);
    let result = run_user_list(&state.pool, &filter, page).await?;

    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Creation denied"),
        (status = 409, description = "Email already in use")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let role_param = normalized(Some(payload.role.clone()));
    user_policy::authorize(
        &actor,
        &UserAction::Store { requested_role: role_param.as_deref() },
    )?;

    validate_payload(&payload)?;
    ensure_email_available(&state.pool, &payload.email, None).await?;

    let user_id = Uuid::new_v4();
    let now = utc_now();
    let password_hash = hash_password(&payload.password)?;

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id.to_string())
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(password_hash)
    .bind(&payload.role)
    .bind(&payload.status)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let user = fetch_user(&state.pool, user_id).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User detail", body = User),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Unknown user")
    ),
    security(("bearerAuth" = []))
)]
pub async fn view_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
) -> AppResult<Json<User>> {
    let target = fetch_user(&state.pool, id).await?;

    user_policy::authorize(&actor, &UserAction::View { target: &target })?;

    Ok(Json(target))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Update denied"),
        (status = 404, description = "Unknown user")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    let db_target = DbUser::find(&state.pool, id)
        .await?
        .ok_or_else(AppError::not_found)?;
    let current_hash = db_target.password_hash.clone();
    let target: User = db_target.try_into()?;

    let new_role = normalized(payload.role.clone());
    user_policy::authorize(
        &actor,
        &UserAction::Update { target: &target, new_role: new_role.as_deref() },
    )?;

    validate_payload(&payload)?;

    let email = normalized(payload.email.clone()).unwrap_or_else(|| target.email.clone());
    if email != target.email {
        ensure_email_available(&state.pool, &email, Some(target.id)).await?;
    }

    let name = normalized(payload.name.clone()).unwrap_or_else(|| target.name.clone());
    let role = new_role
        .as_deref()
        .and_then(Role::parse)
        .unwrap_or(target.role);
    let status = normalized(payload.status.clone())
        .as_deref()
        .and_then(Status::parse)
        .unwrap_or(target.status);
    let password_hash = match normalized(payload.password.clone()) {
        Some(password) => hash_password(&password)?,
        None => current_hash,
    };
    let now = utc_now();

    // The denormalized owner-role snapshot on tasks must follow a role
    // change in the same transaction, or role-scoped listings go stale.
    let mut tx = state.pool.begin().await?;

    sqlx::query(
        "UPDATE users SET name = ?, email = ?, password_hash = ?, role = ?, status = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(&name)
    .bind(&email)
    .bind(&password_hash)
    .bind(role.as_str())
    .bind(status.as_str())
    .bind(now)
    .bind(target.id.to_string())
    .execute(&mut *tx)
    .await?;

    let role_changed = role != target.role;
    if role_changed {
        sqlx::query("UPDATE tasks SET user_role = ?, updated_at = ? WHERE user_id = ?")
            .bind(role.as_str())
            .bind(now)
            .bind(target.id.to_string())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    if role_changed {
        state.list_cache.flush(TASK_LIST_TAG);
    }

    let user = fetch_user(&state.pool, target.id).await?;

    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Deletion denied"),
        (status = 404, description = "Unknown user")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
) -> AppResult<StatusCode> {
    let target = fetch_user(&state.pool, id).await?;

    user_policy::authorize(&actor, &UserAction::Delete { target: &target })?;

    // Tasks cascade with the account, so cached task listings are stale too.
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(target.id.to_string())
        .execute(&state.pool)
        .await?;

    state.list_cache.flush(TASK_LIST_TAG);

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_user(pool: &SqlitePool, id: Uuid) -> AppResult<User> {
    DbUser::find(pool, id)
        .await?
        .ok_or_else(AppError::not_found)?
        .try_into()
}

async fn ensure_email_available(
    pool: &SqlitePool,
    email: &str,
    ignore_user: Option<Uuid>,
) -> AppResult<()> {
    let count: i64 = match ignore_user {
        Some(id) => {
            sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ? AND id != ?")
                .bind(email)
                .bind(id.to_string())
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
                .bind(email)
                .fetch_one(pool)
                .await?
        }
    };

    if count > 0 {
        return Err(AppError::conflict("email already in use"));
    }

    Ok(())
}
