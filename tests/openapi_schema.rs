use serde_json::Value;

#[test]
fn openapi_documents_every_area_resource() -> anyhow::Result<()> {
    let doc = workgrid::docs::build_openapi(8000)?;
    let v = serde_json::to_value(&doc)?;

    let paths = v.get("paths").and_then(Value::as_object).expect("paths must exist");
    for path in [
        "/api/auth/login",
        "/api/users/{id}",
        "/api/projects/{id}/members/{user_id}",
        "/api/tasks/{id}/status",
        "/api/tasks/{id}/comments",
        "/api/reports/monthly",
        "/api/reports/available-months",
        "/api/dashboard",
    ] {
        assert!(paths.contains_key(path), "OpenAPI missing path '{}'", path);
    }

    let task = v
        .pointer("/components/schemas/Task/properties")
        .and_then(Value::as_object)
        .expect("components.schemas.Task.properties must exist");
    for key in ["area", "assigned_to", "assignees", "completed_date"] {
        assert!(task.contains_key(key), "OpenAPI Task schema missing '{}'", key);
    }

    Ok(())
}
