mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{ids, str_field, TestApp};
use workgrid::authz::Role;

#[tokio::test]
async fn create_dedupes_members_and_keeps_creator_first() -> Result<()> {
    let t = TestApp::new().await?;
    let head = t.head(Role::DeptHeadDev, "head@example.com").await?;
    let ada = t.user(&head, "Ada", "ada@example.com", "developer").await?;
    let bob = t.user(&head, "Bob", "bob@example.com", "developer").await?;
    let cy = t.user(&head, "Cy", "cy@example.com", "designer").await?;

    let unknown = Uuid::new_v4().to_string();
    let (status, project) = t
        .post(
            "/api/projects",
            &ada,
            json!({
                "name": "Billing",
                "members": [ada.id, bob.id, cy.id, bob.id, unknown]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", project);
    assert_eq!(project["area"], "dev");

    let project_id = str_field(&project, "id")?;
    let (status, fetched) = t.get(&format!("/api/projects/{}", project_id), &ada).await?;
    assert_eq!(status, StatusCode::OK);

    let members = ids(&fetched["members"], "user_id");
    assert_eq!(members.len(), 3, "creator + two distinct members: {:?}", members);
    assert_eq!(members[0], ada.id, "creator is listed first");
    assert!(members.contains(&bob.id));
    assert!(members.contains(&cy.id));
    assert!(!members.contains(&unknown));

    Ok(())
}

#[tokio::test]
async fn empty_member_replace_leaves_only_the_creator() -> Result<()> {
    let t = TestApp::new().await?;
    let head = t.head(Role::DeptHeadDev, "head@example.com").await?;
    let ada = t.user(&head, "Ada", "ada@example.com", "developer").await?;
    let bob = t.user(&head, "Bob", "bob@example.com", "developer").await?;

    let project_id = t.project(&ada, "Billing", &[bob.id.as_str()]).await?;

    let (status, updated) = t
        .put(&format!("/api/projects/{}", project_id), &ada, json!({ "members": [] }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(ids(&updated["members"], "user_id"), vec![ada.id.clone()]);

    let (status, _) = t.get(&format!("/api/projects/{}", project_id), &bob).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "removed member loses access");

    let (status, updated) = t
        .put(
            &format!("/api/projects/{}", project_id),
            &ada,
            json!({ "name": "Billing v2", "members": [bob.id] }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Billing v2");
    assert_eq!(ids(&updated["members"], "user_id"), vec![ada.id.clone(), bob.id.clone()]);

    Ok(())
}

#[tokio::test]
async fn add_and_remove_member_rules() -> Result<()> {
    let t = TestApp::new().await?;
    let head = t.head(Role::DeptHeadDev, "head@example.com").await?;
    let ada = t.user(&head, "Ada", "ada@example.com", "developer").await?;
    let bob = t.user(&head, "Bob", "bob@example.com", "developer").await?;
    let project_id = t.project(&ada, "Billing", &[]).await?;
    let members_uri = format!("/api/projects/{}/members", project_id);

    let (status, project) = t.post(&members_uri, &ada, json!({ "user_id": bob.id })).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ids(&project["members"], "user_id").len(), 2);

    let (status, body) = t.post(&members_uri, &ada, json!({ "user_id": bob.id })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");

    let (status, _) = t
        .post(&members_uri, &ada, json!({ "user_id": Uuid::new_v4() }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = t.delete(&format!("{}/{}", members_uri, ada.id), &head).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "creator membership is permanent: {}", body);

    let (status, _) = t.delete(&format!("{}/{}", members_uri, bob.id), &bob).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "plain members cannot remove members");

    let (status, project) = t.delete(&format!("{}/{}", members_uri, bob.id), &ada).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&project["members"], "user_id"), vec![ada.id.clone()]);

    let (status, _) = t.delete(&format!("{}/{}", members_uri, bob.id), &ada).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn designers_cannot_create_projects_and_delete_cascades() -> Result<()> {
    let t = TestApp::new().await?;
    let head = t.head(Role::DeptHeadDev, "head@example.com").await?;
    let cy = t.user(&head, "Cy", "cy@example.com", "designer").await?;

    let (status, _) = t.post("/api/projects", &cy, json!({ "name": "Moodboard" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let project_id = t.project(&head, "Billing", &[]).await?;
    let (status, task) = t
        .post("/api/tasks", &head, json!({ "title": "Schema", "project_id": project_id }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", task);
    let task_id = str_field(&task, "id")?;

    let (status, _) = t.delete(&format!("/api/projects/{}", project_id), &head).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t.get(&format!("/api/tasks/{}", task_id), &head).await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "tasks go with their project");

    Ok(())
}
