mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{ids, TestApp};
use workgrid::authz::Role;

fn areas(list: &Value) -> Vec<String> {
    list.as_array()
        .map(|items| items.iter().filter_map(|i| i["area"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn listings_never_cross_areas() -> Result<()> {
    let t = TestApp::new().await?;
    let dev_head = t.head(Role::DeptHeadDev, "dev-head@example.com").await?;
    let wf_head = t.head(Role::DeptHeadWorkforce, "wf-head@example.com").await?;
    let ada = t.user(&dev_head, "Ada", "ada@example.com", "developer").await?;
    let lone = t.user(&dev_head, "Lone", "lone@example.com", "developer").await?;
    let wendy = t.user(&wf_head, "Wendy", "wendy@example.com", "workforce_worker").await?;

    let dev_project = t.project(&ada, "Platform", &[]).await?;
    let wf_project = t.project(&wf_head, "Warehouse", &[wendy.id.as_str()]).await?;
    for (who, project) in [(&ada, &dev_project), (&wendy, &wf_project)] {
        let (status, _) = t
            .post("/api/tasks", who, json!({ "title": "Kickoff", "project_id": project }))
            .await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, projects) = t.get("/api/projects", &dev_head).await?;
    assert_eq!(ids(&projects, "id"), vec![dev_project.clone()]);
    let (_, projects) = t.get("/api/projects", &wf_head).await?;
    assert_eq!(ids(&projects, "id"), vec![wf_project.clone()]);

    let (_, tasks) = t.get("/api/tasks", &dev_head).await?;
    assert_eq!(areas(&tasks), vec!["dev"]);
    let (_, tasks) = t.get("/api/tasks", &wendy).await?;
    assert_eq!(areas(&tasks), vec!["workforce"]);

    let (_, users) = t.get("/api/users", &dev_head).await?;
    assert!(areas(&users).iter().all(|area| area == "dev"), "{}", users);
    assert_eq!(areas(&users).len(), 3);

    let (_, projects) = t.get("/api/projects", &lone).await?;
    assert_eq!(projects, json!([]), "non-members see nothing");
    let (_, tasks) = t.get("/api/tasks", &lone).await?;
    assert_eq!(tasks, json!([]));
    let (_, users) = t.get("/api/users", &lone).await?;
    assert_eq!(ids(&users, "id"), vec![lone.id.clone()]);

    Ok(())
}

#[tokio::test]
async fn heads_are_denied_outside_their_area() -> Result<()> {
    let t = TestApp::new().await?;
    let dev_head = t.head(Role::DeptHeadDev, "dev-head@example.com").await?;
    let wf_head = t.head(Role::DeptHeadWorkforce, "wf-head@example.com").await?;
    let wendy = t.user(&wf_head, "Wendy", "wendy@example.com", "workforce_worker").await?;
    let wf_project = t.project(&wf_head, "Warehouse", &[wendy.id.as_str()]).await?;

    let project_uri = format!("/api/projects/{}", wf_project);
    let (status, _) = t.get(&project_uri, &dev_head).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.put(&project_uri, &dev_head, json!({ "name": "Mine now" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.delete(&project_uri, &dev_head).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.get(&format!("/api/users/{}", wendy.id), &dev_head).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, project) = t.get(&project_uri, &wf_head).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&project["members"], "user_id"), vec![wf_head.id.clone(), wendy.id.clone()]);

    let (status, _) = t.get(&project_uri, &wendy).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn dashboard_is_bounded_by_the_caller() -> Result<()> {
    let t = TestApp::new().await?;
    let dev_head = t.head(Role::DeptHeadDev, "dev-head@example.com").await?;
    let wf_head = t.head(Role::DeptHeadWorkforce, "wf-head@example.com").await?;
    let dev_project = t.project(&dev_head, "Platform", &[]).await?;
    let wf_project = t.project(&wf_head, "Warehouse", &[]).await?;

    for (who, project, status) in [
        (&dev_head, &dev_project, "completed"),
        (&dev_head, &dev_project, "pending"),
        (&wf_head, &wf_project, "pending"),
    ] {
        let (code, _) = t
            .post(
                "/api/tasks",
                who,
                json!({ "title": "Work", "project_id": project, "status": status, "priority": "high" }),
            )
            .await?;
        assert_eq!(code, StatusCode::CREATED);
    }

    let (status, dashboard) = t.get("/api/dashboard", &dev_head).await?;
    assert_eq!(status, StatusCode::OK, "{}", dashboard);
    assert_eq!(dashboard["projects"]["total"], 1);
    assert_eq!(dashboard["projects"]["active"], 1);
    assert_eq!(dashboard["tasks_by_status"]["total"], 2);
    assert_eq!(dashboard["tasks_by_status"]["completed"], 1);
    assert_eq!(dashboard["tasks_by_priority"]["high"], 2);
    assert_eq!(dashboard["recent_tasks"].as_array().map(Vec::len), Some(2));
    assert_eq!(dashboard["recent_activity"][0]["project_name"], "Platform");
    assert_eq!(dashboard["recent_activity"][0]["user_name"], "Head");

    Ok(())
}
