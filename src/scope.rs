//! Role-aware query scoping, filter composition and pagination.
//!
//! List endpoints must enforce exactly the same ownership semantics as the
//! point policies, expressed as query predicates. The effective scope is
//! resolved first, then optional filters compose onto it; every filter is a
//! no-op when its input is absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::fmt::Write as _;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::role::Role;
use crate::models::task::{DbTask, Task, TaskListQuery};
use crate::models::user::{DbUser, User, UserListQuery};

pub const PER_PAGE: i64 = 5;

const TASK_COLUMNS: &str =
    "id, title, description, due_date, completed, user_id, user_role, created_at, updated_at";
const USER_COLUMNS: &str = "id, name, email, password_hash, role, status, created_at, updated_at";

/// Effective ownership scope for task listings, resolved from the actor's
/// role before any filter composition. A plain user is always pinned to
/// itself, whatever parameters were supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipScope {
    /// Exactly one owner's tasks.
    Owner(Uuid),
    /// The actor's own tasks plus every task owned by a dominated role;
    /// expressed through the denormalized owner-role column to avoid a join.
    Subordinates {
        actor_id: Uuid,
        roles: &'static [Role],
    },
    /// No ownership restriction at all.
    Unrestricted,
}

impl OwnershipScope {
    pub fn resolve(actor: &User, requested_owner: Option<Uuid>) -> Self {
        if actor.role == Role::User {
            return OwnershipScope::Owner(actor.id);
        }

        match requested_owner {
            Some(owner_id) => OwnershipScope::Owner(owner_id),
            None if actor.role == Role::Superadmin => OwnershipScope::Unrestricted,
            None => OwnershipScope::Subordinates {
                actor_id: actor.id,
                roles: actor.role.lower_roles(),
            },
        }
    }

    fn push_predicate(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            OwnershipScope::Owner(owner_id) => {
                builder.push(" AND user_id = ").push_bind(owner_id.to_string());
            }
            OwnershipScope::Subordinates { actor_id, roles } => {
                builder.push(" AND (user_id = ").push_bind(actor_id.to_string());
                builder.push(" OR user_role IN (");
                let mut separated = builder.separated(", ");
                for role in *roles {
                    separated.push_bind(role.as_str());
                }
                builder.push("))");
            }
            OwnershipScope::Unrestricted => {}
        }
    }

    fn cache_fragment(&self) -> String {
        match self {
            OwnershipScope::Owner(owner_id) => format!("owner={owner_id}"),
            OwnershipScope::Subordinates { actor_id, roles } => {
                let roles: Vec<&str> = roles.iter().map(|role| role.as_str()).collect();
                format!("subordinates={actor_id}:{}", roles.join(","))
            }
            OwnershipScope::Unrestricted => "unrestricted".to_string(),
        }
    }
}

/// Normalized task listing filters. Blank strings have already been
/// collapsed to `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub due_date_from: Option<DateTime<Utc>>,
    pub due_date_to: Option<DateTime<Utc>>,
    pub created_at_from: Option<DateTime<Utc>>,
    pub created_at_to: Option<DateTime<Utc>>,
    pub updated_at_from: Option<DateTime<Utc>>,
    pub updated_at_to: Option<DateTime<Utc>>,
}

impl TaskFilter {
    pub fn from_query(query: &TaskListQuery) -> Self {
        TaskFilter {
            title: normalized(query.title.clone()),
            description: normalized(query.description.clone()),
            completed: query.completed,
            due_date_from: query.due_date_from,
            due_date_to: query.due_date_to,
            created_at_from: query.created_at_from,
            created_at_to: query.created_at_to,
            updated_at_from: query.updated_at_from,
            updated_at_to: query.updated_at_to,
        }
    }

    fn push_predicates(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        if let Some(title) = &self.title {
            builder.push(" AND title LIKE ").push_bind(like_pattern(title));
        }
        if let Some(description) = &self.description {
            builder
                .push(" AND description LIKE ")
                .push_bind(like_pattern(description));
        }
        if let Some(completed) = self.completed {
            builder.push(" AND completed = ").push_bind(completed);
        }

        push_range(builder, "due_date", self.due_date_from, self.due_date_to);
        push_range(builder, "created_at", self.created_at_from, self.created_at_to);
        push_range(builder, "updated_at", self.updated_at_from, self.updated_at_to);
    }

    fn cache_fragment(&self) -> String {
        let mut fragment = String::new();
        push_field(&mut fragment, "title", self.title.as_deref());
        push_field(&mut fragment, "description", self.description.as_deref());
        push_field(
            &mut fragment,
            "completed",
            self.completed.map(|value| value.to_string()).as_deref(),
        );
        push_datetime(&mut fragment, "due_from", self.due_date_from);
        push_datetime(&mut fragment, "due_to", self.due_date_to);
        push_datetime(&mut fragment, "created_from", self.created_at_from);
        push_datetime(&mut fragment, "created_to", self.created_at_to);
        push_datetime(&mut fragment, "updated_from", self.updated_at_from);
        push_datetime(&mut fragment, "updated_to", self.updated_at_to);
        fragment
    }
}

/// Normalized user listing filters. The role set is never empty: it is
/// either the explicitly requested role or the actor's lower roles.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFilter {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<Role>,
    pub status: Option<String>,
}

impl UserFilter {
    pub fn from_query(actor: &User, query: &UserListQuery) -> Self {
        let requested_role = normalized(query.role.clone()).and_then(|raw| Role::parse(&raw));
        let roles = match requested_role {
            Some(role) => vec![role],
            None => actor.role.lower_roles().to_vec(),
        };

        UserFilter {
            id: normalized(query.id.clone()),
            name: normalized(query.name.clone()),
            email: normalized(query.email.clone()),
            roles,
            status: normalized(query.status.clone()),
        }
    }

    fn push_predicates(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        if let Some(id) = &self.id {
            builder.push(" AND id = ").push_bind(id.clone());
        }
        if let Some(name) = &self.name {
            builder.push(" AND name LIKE ").push_bind(like_pattern(name));
        }
        if let Some(email) = &self.email {
            builder.push(" AND email LIKE ").push_bind(like_pattern(email));
        }

        builder.push(" AND role IN (");
        let mut separated = builder.separated(", ");
        for role in &self.roles {
            separated.push_bind(role.as_str());
        }
        builder.push(")");

        if let Some(status) = &self.status {
            builder.push(" AND status = ").push_bind(status.clone());
        }
    }
}

/// Offset-paginated result envelope. The field set and null semantics are
/// part of the API contract.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[aliases(TaskPage = Page<Task>, UserPage = Page<User>)]
pub struct Page<T> {
    pub current_page: i64,
    pub data: Vec<T>,
    pub from: Option<i64>,
    pub last_page: i64,
    pub next_page_url: Option<String>,
    pub path: String,
    pub per_page: i64,
    pub prev_page_url: Option<String>,
    pub to: Option<i64>,
    pub total: i64,
}

pub fn paginate<T>(data: Vec<T>, total: i64, page: i64, path: &str) -> Page<T> {
    let last_page = if total == 0 {
        0
    } else {
        (total + PER_PAGE - 1) / PER_PAGE
    };

    let from = if data.is_empty() {
        None
    } else {
        Some((page - 1) * PER_PAGE + 1)
    };
    let to = from.map(|from| from + data.len() as i64 - 1);

    let next_page_url = (page < last_page).then(|| format!("{path}?page={}", page + 1));
    let prev_page_url = (page > 1).then(|| format!("{path}?page={}", page - 1));

    Page {
        current_page: page,
        data,
        from,
        last_page,
        next_page_url,
        path: path.to_string(),
        per_page: PER_PAGE,
        prev_page_url,
        to,
        total,
    }
}

/// Run the task listing pipeline: count the scoped set, fetch one page in
/// the mandated order, and wrap it in the envelope.
pub async fn run_task_list(
    pool: &SqlitePool,
    scope: &OwnershipScope,
    filter: &TaskFilter,
    page: i64,
) -> AppResult<Page<Task>> {
    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM tasks WHERE 1=1");
    scope.push_predicate(&mut count_builder);
    filter.push_predicates(&mut count_builder);
    let total: i64 = count_builder.build_query_scalar().fetch_one(pool).await?;

    let mut builder = QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE 1=1"));
    scope.push_predicate(&mut builder);
    filter.push_predicates(&mut builder);
    builder.push(" ORDER BY due_date ASC, created_at ASC, updated_at ASC");
    builder.push(" LIMIT ").push_bind(PER_PAGE);
    builder.push(" OFFSET ").push_bind((page - 1) * PER_PAGE);

    let rows: Vec<DbTask> = builder.build_query_as().fetch_all(pool).await?;
    let tasks: Vec<Task> = rows.into_iter().map(Task::try_from).collect::<Result<_, _>>()?;

    Ok(paginate(tasks, total, page, "/tasks"))
}

/// Run the user listing pipeline. Users keep insertion order; only the
/// page window is applied.
pub async fn run_user_list(
    pool: &SqlitePool,
    filter: &UserFilter,
    page: i64,
) -> AppResult<Page<User>> {
    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM users WHERE 1=1");
    filter.push_predicates(&mut count_builder);
    let total: i64 = count_builder.build_query_scalar().fetch_one(pool).await?;

    let mut builder = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1=1"));
    filter.push_predicates(&mut builder);
    builder.push(" LIMIT ").push_bind(PER_PAGE);
    builder.push(" OFFSET ").push_bind((page - 1) * PER_PAGE);

    let rows: Vec<DbUser> = builder.build_query_as().fetch_all(pool).await?;
    let users: Vec<User> = rows.into_iter().map(User::try_from).collect::<Result<_, _>>()?;

    Ok(paginate(users, total, page, "/users"))
}

/// Content-derived cache key for a task listing: effective ownership scope,
/// effective role scope and the normalized parameters, hashed together.
pub fn task_list_cache_key(scope: &OwnershipScope, filter: &TaskFilter, page: i64) -> String {
    let mut canonical = scope.cache_fragment();
    canonical.push(';');
    canonical.push_str(&filter.cache_fragment());
    let _ = write!(canonical, "page={page}");

    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)
}

/// Treat blank and whitespace-only parameters as absent.
pub fn normalized(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn like_pattern(needle: &str) -> String {
    format!("%{needle}%")
}

fn push_range(
    builder: &mut QueryBuilder<'_, Sqlite>,
    column: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) {
    if let Some(from) = from {
        builder.push(format!(" AND {column} >= ")).push_bind(from);
    }
    if let Some(to) = to {
        builder.push(format!(" AND {column} <= ")).push_bind(to);
    }
}

fn push_field(fragment: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value {
        let _ = write!(fragment, "{label}={value};");
    }
}

fn push_datetime(fragment: &mut String, label: &str, value: Option<DateTime<Utc>>) {
    if let Some(value) = value {
        let _ = write!(fragment, "{label}={};", value.to_rfc3339());
    }
}
