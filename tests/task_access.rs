mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use common::{delete, get, login, post_json, put_json, seed_task, seed_user, setup};

fn task_payload(owner: Option<Uuid>) -> serde_json::Value {
    let mut payload = json!({
        "title": "Write the launch notes",
        "description": "Summarize the release for the changelog.",
        "due_date": "2026-09-01T12:00:00Z",
    });
    if let Some(owner) = owner {
        payload["user_id"] = json!(owner.to_string());
    }
    payload
}

#[tokio::test]
async fn store_requires_an_owner_and_dominance() -> Result<()> {
    let ctx = setup().await?;
    let root_id = seed_user(&ctx.pool, "Root", "root@example.com", "password123", "superadmin").await?;
    let admin_id = seed_user(&ctx.pool, "Admin", "admin@example.com", "password123", "admin").await?;
    let peer_id = seed_user(&ctx.pool, "Peer", "peer@example.com", "password123", "admin").await?;
    let worker_id = seed_user(&ctx.pool, "Worker", "worker@example.com", "password123", "user").await?;

    let worker_token = login(&ctx.app, "worker@example.com", "password123").await?;
    let admin_token = login(&ctx.app, "admin@example.com", "password123").await?;
    let root_token = login(&ctx.app, "root@example.com", "password123").await?;

    // A task without an owner is refused.
    let (status, _) = post_json(&ctx.app, "/tasks", Some(&worker_token), task_payload(None)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Self-assignment is open to everyone.
    let (status, body) =
        post_json(&ctx.app, "/tasks", Some(&worker_token), task_payload(Some(worker_id))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_id"], worker_id.to_string());
    assert_eq!(body["user_role"], "user");

    // A plain user cannot assign a task to anyone else.
    let (status, _) =
        post_json(&ctx.app, "/tasks", Some(&worker_token), task_payload(Some(admin_id))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // An admin assigns downwards, not sideways or upwards.
    let (status, body) =
        post_json(&ctx.app, "/tasks", Some(&admin_token), task_payload(Some(worker_id))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_role"], "user");

    let (status, _) =
        post_json(&ctx.app, "/tasks", Some(&admin_token), task_payload(Some(peer_id))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
        post_json(&ctx.app, "/tasks", Some(&admin_token), task_payload(Some(root_id))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // An unknown owner id is denied before any insert happens.
    let (status, _) =
        post_json(&ctx.app, "/tasks", Some(&admin_token), task_payload(Some(Uuid::new_v4()))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Superadmin without an owner defaults to itself.
    let (status, body) = post_json(&ctx.app, "/tasks", Some(&root_token), task_payload(None)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_id"], root_id.to_string());
    assert_eq!(body["user_role"], "superadmin");

    // Validation runs after authorization.
    let mut payload = task_payload(Some(worker_id));
    payload["title"] = json!("x");
    let (status, body) = post_json(&ctx.app, "/tasks", Some(&admin_token), payload).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["title"].is_array());

    Ok(())
}

#[tokio::test]
async fn view_and_delete_follow_ownership_and_hierarchy() -> Result<()> {
    let ctx = setup().await?;
    let admin_id = seed_user(&ctx.pool, "Admin", "admin@example.com", "password123", "admin").await?;
    let worker_id = seed_user(&ctx.pool, "Worker", "worker@example.com", "password123", "user").await?;
    let other_id = seed_user(&ctx.pool, "Other", "other@example.com", "password123", "user").await?;

    let worker_task = seed_task(&ctx.pool, worker_id, "user", "Worker task", Utc::now()).await?;
    let admin_task = seed_task(&ctx.pool, admin_id, "admin", "Admin task", Utc::now()).await?;
    let other_task = seed_task(&ctx.pool, other_id, "user", "Other task", Utc::now()).await?;

    let worker_token = login(&ctx.app, "worker@example.com", "password123").await?;
    let admin_token = login(&ctx.app, "admin@example.com", "password123").await?;

    // Owner and dominating admin see the task; an unrelated peer does not.
    let (status, _) = get(&ctx.app, &format!("/tasks/{worker_task}"), Some(&worker_token)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&ctx.app, &format!("/tasks/{worker_task}"), Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&ctx.app, &format!("/tasks/{other_task}"), Some(&worker_token)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A plain user cannot see an admin's task.
    let (status, _) = get(&ctx.app, &format!("/tasks/{admin_task}"), Some(&worker_token)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Unknown task is a 404 before any policy runs.
    let (status, body) = get(&ctx.app, &format!("/tasks/{}", Uuid::new_v4()), Some(&worker_token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "not found");

    // Deletion mirrors view: owner yes, stranger no, dominator yes.
    let (status, _) = delete(&ctx.app, &format!("/tasks/{other_task}"), Some(&worker_token)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = delete(&ctx.app, &format!("/tasks/{worker_task}"), Some(&worker_token)).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = delete(&ctx.app, &format!("/tasks/{other_task}"), Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn update_allows_self_service_and_guarded_reassignment() -> Result<()> {
    let ctx = setup().await?;
    let admin_id = seed_user(&ctx.pool, "Admin", "admin@example.com", "password123", "admin").await?;
    let worker_id = seed_user(&ctx.pool, "Worker", "worker@example.com", "password123", "user").await?;
    let other_id = seed_user(&ctx.pool, "Other", "other@example.com", "password123", "user").await?;

    let worker_task = seed_task(&ctx.pool, worker_id, "user", "Worker task", Utc::now()).await?;
    let admin_task = seed_task(&ctx.pool, admin_id, "admin", "Admin task", Utc::now()).await?;

    let worker_token = login(&ctx.app, "worker@example.com", "password123").await?;
    let admin_token = login(&ctx.app, "admin@example.com", "password123").await?;

    // Owner edits freely.
    let mut payload = task_payload(None);
    payload["title"] = json!("Rewritten by the owner");
    let (status, body) =
        put_json(&ctx.app, &format!("/tasks/{worker_task}"), Some(&worker_token), payload).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Rewritten by the owner");

    // Owner restating itself as owner is a no-op, not a denial.
    let (status, _) = put_json(
        &ctx.app,
        &format!("/tasks/{worker_task}"),
        Some(&worker_token),
        task_payload(Some(worker_id)),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    // Reassigning away requires rank the owner does not have.
    let (status, _) = put_json(
        &ctx.app,
        &format!("/tasks/{worker_task}"),
        Some(&worker_token),
        task_payload(Some(other_id)),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A plain user cannot edit an admin's task.
    let (status, _) = put_json(
        &ctx.app,
        &format!("/tasks/{admin_task}"),
        Some(&worker_token),
        task_payload(None),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // An admin reassigns its own task downwards; the owner-role snapshot
    // is re-derived from the new owner.
    let (status, body) = put_json(
        &ctx.app,
        &format!("/tasks/{admin_task}"),
        Some(&admin_token),
        task_payload(Some(worker_id)),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], worker_id.to_string());
    assert_eq!(body["user_role"], "user");

    // And can keep editing it afterwards as the dominating role.
    let mut payload = task_payload(None);
    payload["completed"] = json!(true);
    let (status, body) =
        put_json(&ctx.app, &format!("/tasks/{admin_task}"), Some(&admin_token), payload).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], true);

    Ok(())
}
