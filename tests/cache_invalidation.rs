mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;

use common::{delete, get, login, post_json, put_json, seed_task, seed_user, setup};

#[tokio::test]
async fn repeated_reads_are_value_identical() -> Result<()> {
    let ctx = setup().await?;
    let worker_id = seed_user(&ctx.pool, "Worker", "worker@example.com", "password123", "user").await?;
    seed_task(&ctx.pool, worker_id, "user", "Stable task", Utc::now()).await?;

    let token = login(&ctx.app, "worker@example.com", "password123").await?;

    // Back-to-back identical reads with no intervening mutation: the second
    // may come from the cache, but the value must be identical.
    let (status, first) = get(&ctx.app, "/tasks", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = get(&ctx.app, "/tasks", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);

    Ok(())
}

#[tokio::test]
async fn task_mutations_flush_cached_listings() -> Result<()> {
    let ctx = setup().await?;
    let worker_id = seed_user(&ctx.pool, "Worker", "worker@example.com", "password123", "user").await?;
    let existing = seed_task(&ctx.pool, worker_id, "user", "Existing task", Utc::now()).await?;

    let token = login(&ctx.app, "worker@example.com", "password123").await?;

    // Prime the cache.
    let (_, body) = get(&ctx.app, "/tasks", Some(&token)).await?;
    assert_eq!(body["total"], 1);

    // Create: the very next read must see the new row.
    let (status, created) = post_json(
        &ctx.app,
        "/tasks",
        Some(&token),
        json!({
            "title": "Fresh task",
            "description": "Must appear immediately after the write.",
            "due_date": "2026-09-01T12:00:00Z",
            "user_id": worker_id.to_string(),
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = get(&ctx.app, "/tasks", Some(&token)).await?;
    assert_eq!(body["total"], 2);

    // Update: the title change must be visible at once.
    let task_id = created["id"].as_str().unwrap().to_string();
    let (status, _) = put_json(
        &ctx.app,
        &format!("/tasks/{task_id}"),
        Some(&token),
        json!({
            "title": "Renamed task",
            "description": "Must appear immediately after the write.",
            "due_date": "2026-09-01T12:00:00Z",
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&ctx.app, "/tasks?title=Renamed", Some(&token)).await?;
    assert_eq!(body["total"], 1);

    // Delete: the row disappears from the very next listing.
    let (status, _) = delete(&ctx.app, &format!("/tasks/{existing}"), Some(&token)).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = get(&ctx.app, "/tasks", Some(&token)).await?;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["title"], "Renamed task");

    Ok(())
}

#[tokio::test]
async fn role_changes_invalidate_role_scoped_listings() -> Result<()> {
    let ctx = setup().await?;
    seed_user(&ctx.pool, "Root", "root@example.com", "password123", "superadmin").await?;
    seed_user(&ctx.pool, "Admin", "admin@example.com", "password123", "admin").await?;
    let worker_id = seed_user(&ctx.pool, "Worker", "worker@example.com", "password123", "user").await?;
    seed_task(&ctx.pool, worker_id, "user", "Worker task", Utc::now()).await?;

    let admin_token = login(&ctx.app, "admin@example.com", "password123").await?;
    let root_token = login(&ctx.app, "root@example.com", "password123").await?;

    // Admin's default scope includes the subordinate's task; prime the cache.
    let (_, body) = get(&ctx.app, "/tasks", Some(&admin_token)).await?;
    assert_eq!(body["total"], 1);

    // Promoting the worker moves its tasks out of the admin's scope; the
    // cached listing must not serve the stale row.
    let (status, _) = put_json(
        &ctx.app,
        &format!("/users/{worker_id}"),
        Some(&root_token),
        json!({ "role": "admin" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&ctx.app, "/tasks", Some(&admin_token)).await?;
    assert_eq!(body["total"], 0);

    Ok(())
}

#[tokio::test]
async fn account_deletion_invalidates_listings() -> Result<()> {
    let ctx = setup().await?;
    seed_user(&ctx.pool, "Admin", "admin@example.com", "password123", "admin").await?;
    let worker_id = seed_user(&ctx.pool, "Worker", "worker@example.com", "password123", "user").await?;
    seed_task(&ctx.pool, worker_id, "user", "Orphan-to-be", Utc::now()).await?;

    let admin_token = login(&ctx.app, "admin@example.com", "password123").await?;

    let (_, body) = get(&ctx.app, "/tasks", Some(&admin_token)).await?;
    assert_eq!(body["total"], 1);

    // Deleting the account cascades to its tasks and flushes the cache.
    let (status, _) = delete(&ctx.app, &format!("/users/{worker_id}"), Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = get(&ctx.app, "/tasks", Some(&admin_token)).await?;
    assert_eq!(body["total"], 0);

    Ok(())
}
