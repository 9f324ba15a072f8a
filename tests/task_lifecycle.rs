mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{ids, str_field, TestApp};
use workgrid::authz::Role;

#[tokio::test]
async fn task_creation_requires_project_membership() -> Result<()> {
    let t = TestApp::new().await?;
    let head = t.head(Role::DeptHeadDev, "head@example.com").await?;
    let dev = t.user(&head, "Dana", "dana@example.com", "developer").await?;
    let project_id = t.project(&head, "Platform", &[]).await?;

    let body = json!({ "title": "Cache layer", "project_id": project_id });
    let (status, _) = t.post("/api/tasks", &dev, body.clone()).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .post(&format!("/api/projects/{}/members", project_id), &head, json!({ "user_id": dev.id }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, task) = t.post("/api/tasks", &dev, body).await?;
    assert_eq!(status, StatusCode::CREATED, "{}", task);
    assert_eq!(task["area"], "dev");
    assert_eq!(task["status"], "pending");
    assert_eq!(task["completed_date"], Value::Null);

    let (status, _) = t
        .post(
            "/api/tasks",
            &dev,
            json!({ "title": "Ghost", "project_id": uuid::Uuid::new_v4() }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn completion_date_tracks_status() -> Result<()> {
    let t = TestApp::new().await?;
    let head = t.head(Role::DeptHeadDev, "head@example.com").await?;
    let project_id = t.project(&head, "Platform", &[]).await?;

    let (status, task) = t
        .post(
            "/api/tasks",
            &head,
            json!({ "title": "Born done", "project_id": project_id, "status": "completed" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert!(task["completed_date"].is_string(), "created completed must be stamped: {}", task);

    let (_, task) = t
        .post("/api/tasks", &head, json!({ "title": "Migrate", "project_id": project_id }))
        .await?;
    let status_uri = format!("/api/tasks/{}/status", str_field(&task, "id")?);

    let (status, done) = t.patch(&status_uri, &head, json!({ "status": "completed" })).await?;
    assert_eq!(status, StatusCode::OK);
    let stamp = done["completed_date"].clone();
    assert!(stamp.is_string());

    let (_, again) = t.patch(&status_uri, &head, json!({ "status": "completed" })).await?;
    assert_eq!(again["completed_date"], stamp, "re-setting completed keeps the original stamp");

    let (_, reopened) = t.patch(&status_uri, &head, json!({ "status": "pending" })).await?;
    assert_eq!(reopened["status"], "pending");
    assert_eq!(reopened["completed_date"], Value::Null);

    let (_, progressing) = t
        .put(
            &format!("/api/tasks/{}", str_field(&task, "id")?),
            &head,
            json!({ "status": "in_progress", "title": "Migrate data" }),
        )
        .await?;
    assert_eq!(progressing["title"], "Migrate data");
    assert_eq!(progressing["completed_date"], Value::Null);

    let (status, body) = t.patch(&status_uri, &head, json!({ "status": "archived" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    Ok(())
}

#[tokio::test]
async fn assignees_comments_and_deletion() -> Result<()> {
    let t = TestApp::new().await?;
    let head = t.head(Role::DeptHeadDev, "head@example.com").await?;
    let ada = t.user(&head, "Ada", "ada@example.com", "developer").await?;
    let bob = t.user(&head, "Bob", "bob@example.com", "developer").await?;
    let project_id = t.project(&ada, "Platform", &[bob.id.as_str()]).await?;

    let (status, task) = t
        .post(
            "/api/tasks",
            &ada,
            json!({
                "title": "Exporter",
                "project_id": project_id,
                "assignees": [bob.id],
                "assigned_to": ada.id
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ids(&task["assignees"], "user_id"), vec![bob.id.clone()], "list wins over legacy field");
    assert_eq!(task["assigned_to"], bob.id.as_str());
    let task_id = str_field(&task, "id")?;

    let (status, task) = t
        .put(&format!("/api/tasks/{}", task_id), &ada, json!({ "assigned_to": ada.id }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&task["assignees"], "user_id"), vec![ada.id.clone()]);

    let comments_uri = format!("/api/tasks/{}/comments", task_id);
    for text in ["first", "second"] {
        let (status, _) = t.post(&comments_uri, &bob, json!({ "comment": text })).await?;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = t.post(&comments_uri, &bob, json!({ "comment": "   " })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, comments) = t.get(&comments_uri, &ada).await?;
    assert_eq!(status, StatusCode::OK);
    let texts: Vec<&str> = comments
        .as_array()
        .map(|list| list.iter().filter_map(|c| c["comment"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(texts, vec!["first", "second"]);
    assert_eq!(comments[0]["user_name"], "Bob");

    let (status, detail) = t.get(&format!("/api/tasks/{}", task_id), &bob).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["title"], "Exporter");
    assert_eq!(detail["comments"].as_array().map(Vec::len), Some(2));

    let (status, _) = t.delete(&format!("/api/tasks/{}", task_id), &bob).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "only the creator deletes");
    let (status, _) = t.delete(&format!("/api/tasks/{}", task_id), &head).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "heads do not bypass task deletion");
    let (status, _) = t.delete(&format!("/api/tasks/{}", task_id), &ada).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn my_tasks_and_task_stats() -> Result<()> {
    let t = TestApp::new().await?;
    let head = t.head(Role::DeptHeadDev, "head@example.com").await?;
    let ada = t.user(&head, "Ada", "ada@example.com", "developer").await?;
    let project_id = t.project(&head, "Platform", &[ada.id.as_str()]).await?;

    for (title, status, assignee) in [
        ("One", "completed", Some(ada.id.as_str())),
        ("Two", "in_progress", Some(ada.id.as_str())),
        ("Three", "pending", None),
    ] {
        let (code, body) = t
            .post(
                "/api/tasks",
                &head,
                json!({ "title": title, "project_id": project_id, "status": status, "assigned_to": assignee }),
            )
            .await?;
        assert_eq!(code, StatusCode::CREATED, "{}", body);
    }

    let (status, mine) = t.get("/api/tasks/my-tasks", &ada).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().map(Vec::len), Some(2));

    let (status, stats) = t.get(&format!("/api/tasks/stats?project_id={}", project_id), &head).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["by_status"]["total"], 3);
    assert_eq!(stats["by_status"]["completed"], 1);
    assert_eq!(stats["completion_rate"], 33.3);

    let (status, project_stats) = t.get(&format!("/api/projects/{}/stats", project_id), &ada).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project_stats["tasks_by_status"]["in_progress"], 1);
    assert_eq!(project_stats["tasks_by_priority"]["medium"], 3);

    Ok(())
}
