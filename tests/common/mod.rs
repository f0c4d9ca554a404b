#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;

use taskward::create_app;
use taskward::utils::hash_password;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    // Keeps the database file alive for the duration of the test.
    _dir: TempDir,
}

pub async fn setup() -> Result<TestApp> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;

    Ok(TestApp {
        app,
        pool,
        _dir: dir,
    })
}

pub async fn seed_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let password_hash = hash_password(password)?;

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 'enabled', ?, ?)",
    )
    .bind(id.to_string())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

#[allow(clippy::too_many_arguments)]
pub async fn seed_task_at(
    pool: &SqlitePool,
    owner: Uuid,
    owner_role: &str,
    title: &str,
    completed: bool,
    due_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO tasks (id, title, description, due_date, completed, user_id, user_role, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(title)
    .bind(format!("{title} description"))
    .bind(due_date)
    .bind(completed)
    .bind(owner.to_string())
    .bind(owner_role)
    .bind(created_at)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn seed_task(
    pool: &SqlitePool,
    owner: Uuid,
    owner_role: &str,
    title: &str,
    due_date: DateTime<Utc>,
) -> Result<Uuid> {
    let now = Utc::now();
    seed_task_at(pool, owner, owner_role, title, false, due_date, now, now).await
}

pub async fn login(app: &Router, email: &str, password: &str) -> Result<String> {
    let (status, body) = post_json(
        app,
        "/auth/login",
        None,
        json!({ "email": email, "password": password }),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::OK, "login failed for {email}: {body}");

    body["token"]
        .as_str()
        .map(str::to_string)
        .context("login response carried no token")
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
    send(app, "GET", uri, token, None).await
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> Result<(StatusCode, Value)> {
    send(app, "POST", uri, token, Some(body)).await
}

pub async fn put_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> Result<(StatusCode, Value)> {
    send(app, "PUT", uri, token, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
    send(app, "DELETE", uri, token, None).await
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    Ok((status, value))
}
