use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::cache::TASK_LIST_TAG;
use crate::errors::{AppError, AppResult};
use crate::jwt::Actor;
use crate::models::role::Role;
use crate::models::task::{DbTask, Task, TaskCreateRequest, TaskListQuery, TaskUpdateRequest};
use crate::models::user::{DbUser, User};
use crate::policies::task::{self as task_policy, TaskAction};
use crate::scope::{
    normalized, run_task_list, task_list_cache_key, OwnershipScope, TaskFilter, TaskPage,
};
use crate::utils::{utc_now, validate_payload};

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "Tasks",
    params(TaskListQuery),
    responses(
        (status = 200, description = "Paginated tasks within the actor's scope", body = TaskPage),
        (status = 403, description = "Requested scope denied")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
    Actor(actor): Actor,
) -> AppResult<Json<TaskPage>> {
    let requested_raw = normalized(query.user_id.clone());
    let requested_owner = match &requested_raw {
        None => None,
        Some(raw) => resolve_user(&state.pool, raw).await?,
    };

    task_policy::authorize(
        &actor,
        &TaskAction::List {
            requested: requested_raw.is_some(),
            owner: requested_owner.as_ref(),
        },
    )?;

    validate_payload(&query)?;

    let scope = OwnershipScope::resolve(&actor, requested_owner.as_ref().map(|owner| owner.id));
    let filter = TaskFilter::from_query(&query);
    let page = query.page.unwrap_or(1);

    let cache_key = task_list_cache_key(&scope, &filter, page);
    if let Some(cached) = state.list_cache.get(TASK_LIST_TAG, &cache_key) {
        if let Ok(result) = serde_json::from_value::<TaskPage>(cached) {
            return Ok(Json(result));
        }
    }

    let result = run_task_list(&state.pool, &scope, &filter, page).await?;

    match serde_json::to_value(&result) {
        Ok(value) => state.list_cache.insert(TASK_LIST_TAG, cache_key, value),
        Err(err) => tracing::warn!(%err, "task page not cacheable"),
    }

    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = "Tasks",
    request_body = TaskCreateRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 403, description = "Creation denied")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_task(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let owner = match payload.user_id {
        Some(owner_id) if owner_id == actor.id => Some(actor.clone()),
        Some(owner_id) => DbUser::find(&state.pool, owner_id)
            .await?
            .map(User::try_from)
            .transpose()?,
        None => None,
    };

    task_policy::authorize(
        &actor,
        &TaskAction::Store {
            requested_owner_id: payload.user_id,
            owner: owner.as_ref(),
        },
    )?;

    validate_payload(&payload)?;

    // Only a superadmin reaches this point without a resolved owner: the
    // scope defaults to the actor itself, and a dangling id is a miss.
    let owner = match owner {
        Some(owner) => owner,
        None if payload.user_id.is_none() => actor.clone(),
        None => return Err(AppError::not_found()),
    };

    let task_id = Uuid::new_v4();
    let now = utc_now();

    // The owner-role snapshot is resolved synchronously before the insert.
    sqlx::query(
        "INSERT INTO tasks (id, title, description, due_date, completed, user_id, user_role, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(task_id.to_string())
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.due_date)
    .bind(payload.completed.unwrap_or(false))
    .bind(owner.id.to_string())
    .bind(owner.role.as_str())
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    state.list_cache.flush(TASK_LIST_TAG);

    let task = fetch_task(&state.pool, task_id).await?;

    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task detail", body = Task),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Unknown task")
    ),
    security(("bearerAuth" = []))
)]
pub async fn view_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
) -> AppResult<Json<Task>> {
    let task = fetch_task(&state.pool, id).await?;

    task_policy::authorize(&actor, &TaskAction::View { task: &task })?;

    Ok(Json(task))
}

#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskUpdateRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 403, description = "Update denied"),
        (status = 404, description = "Unknown task")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
    Json(payload): Json<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    let task = fetch_task(&state.pool, id).await?;

    task_policy::authorize(
        &actor,
        &TaskAction::Update { task: &task, new_owner_id: payload.user_id },
    )?;

    validate_payload(&payload)?;

    // Ownership reassignment is an elevated-rank operation; the owner-role
    // snapshot is re-derived from the new owner in the same write.
    let (owner_id, owner_role) = match payload.user_id {
        Some(new_owner_id)
            if new_owner_id != task.user_id
                && matches!(actor.role, Role::Admin | Role::Superadmin) =>
        {
            let new_owner: User = DbUser::find(&state.pool, new_owner_id)
                .await?
                .ok_or_else(AppError::not_found)?
                .try_into()?;
            (new_owner.id, new_owner.role)
        }
        _ => (task.user_id, task.user_role),
    };

    let now = utc_now();

    sqlx::query(
        "UPDATE tasks SET title = ?, description = ?, due_date = ?, completed = ?, user_id = ?, user_role = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.due_date)
    .bind(payload.completed.unwrap_or(task.completed))
    .bind(owner_id.to_string())
    .bind(owner_role.as_str())
    .bind(now)
    .bind(task.id.to_string())
    .execute(&state.pool)
    .await?;

    state.list_cache.flush(TASK_LIST_TAG);

    let task = fetch_task(&state.pool, task.id).await?;

    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Deletion denied"),
        (status = 404, description = "Unknown task")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
) -> AppResult<StatusCode> {
    let task = fetch_task(&state.pool, id).await?;

    task_policy::authorize(&actor, &TaskAction::Delete { task: &task })?;

    sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(task.id.to_string())
        .execute(&state.pool)
        .await?;

    state.list_cache.flush(TASK_LIST_TAG);

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_task(pool: &SqlitePool, id: Uuid) -> AppResult<Task> {
    DbTask::find(pool, id)
        .await?
        .ok_or_else(AppError::not_found)?
        .try_into()
}

/// Resolve a raw `user_id` parameter to a user row. Malformed ids and
/// unknown users both come back as `None`; the policy turns that into a
/// denial for scoped listings.
async fn resolve_user(pool: &SqlitePool, raw: &str) -> AppResult<Option<User>> {
    let Ok(id) = Uuid::parse_str(raw) else {
        return Ok(None);
    };

    DbUser::find(pool, id).await?.map(User::try_from).transpose()
}
