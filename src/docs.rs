use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{models, routes};

/// Operations reachable without a bearer token.
const PUBLIC_OPERATIONS: [(&str, &str); 2] = [("/api/auth/login", "post"), ("/api/health", "get")];

#[derive(OpenApi)]
#[openapi(
	info(title = "workgrid", description = "Area-segregated project and task tracking API"),
	paths(
		routes::auth::login,
		routes::auth::profile,
		routes::auth::update_profile,
		routes::auth::change_password,
		routes::auth::logout,
		routes::users::list_users,
		routes::users::create_user,
		routes::users::my_team,
		routes::users::user_stats,
		routes::users::get_user,
		routes::users::update_user,
		routes::users::delete_user,
		routes::projects::list_projects,
		routes::projects::create_project,
		routes::projects::get_project,
		routes::projects::update_project,
		routes::projects::delete_project,
		routes::projects::add_member,
		routes::projects::remove_member,
		routes::projects::project_stats,
		routes::tasks::list_tasks,
		routes::tasks::create_task,
		routes::tasks::my_tasks,
		routes::tasks::task_stats,
		routes::tasks::get_task,
		routes::tasks::update_task,
		routes::tasks::update_task_status,
		routes::tasks::delete_task,
		routes::tasks::list_comments,
		routes::tasks::add_comment,
		routes::reports::monthly_report,
		routes::reports::report_preview,
		routes::reports::available_months,
		routes::dashboard::dashboard,
		routes::dashboard::dashboard_stats,
		routes::dashboard::recent_activity,
		routes::dashboard::filtered_tasks,
		routes::health::health
	),
	components(
		schemas(
			crate::authz::Role,
			crate::authz::Area,
			crate::authz::ProjectRole,
			models::user::User,
			models::user::AuthResponse,
			models::user::LoginRequest,
			models::user::UserCreateRequest,
			models::user::UserCreatedResponse,
			models::user::UserUpdateRequest,
			models::user::ProfileUpdateRequest,
			models::user::ChangePasswordRequest,
			models::user::RoleCount,
			models::user::UserStats,
			models::user::MessageResponse,
			models::project::ProjectStatus,
			models::project::Priority,
			models::project::ProjectMember,
			models::project::Project,
			models::project::ProjectCreateRequest,
			models::project::ProjectUpdateRequest,
			models::project::AddMemberRequest,
			models::project::ProjectStats,
			models::task::TaskStatus,
			models::task::TaskAssignee,
			models::task::Task,
			models::task::TaskDetail,
			models::task::TaskCreateRequest,
			models::task::TaskUpdateRequest,
			models::task::TaskStatusRequest,
			models::task::TaskStats,
			models::comment::Comment,
			models::comment::CommentCreateRequest,
			models::stats::TaskStatusCounts,
			models::stats::ProjectStatusCounts,
			models::stats::PriorityCounts,
			models::dashboard::ActivityEntry,
			models::dashboard::Dashboard,
			models::dashboard::DashboardStats,
			models::report::ReportPeriod,
			models::report::ReportSummary,
			models::report::WorkerStats,
			models::report::ProjectRollup,
			models::report::AreaMetrics,
			models::report::TimelineEventKind,
			models::report::TimelineEvent,
			models::report::TaskReportRow,
			models::report::MonthlyReport,
			models::report::ReportPreview,
			models::report::AvailableMonth,
			routes::health::HealthResponse
		)
	),
	tags(
		(name = "Auth", description = "Login and the caller's own profile"),
		(name = "Users", description = "User management within the caller's area"),
		(name = "Projects", description = "Projects and their members"),
		(name = "Tasks", description = "Tasks, assignees and comments"),
		(name = "Reports", description = "Monthly reports for department heads"),
		(name = "Dashboard", description = "Landing page summary"),
		(name = "Health", description = "Liveness and database reachability")
	)
)]
pub struct ApiDoc;

/// Generated document plus the bearer scheme, global security and server entry.
pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	ensure_security_components(&mut doc);
	ensure_global_security(&mut doc);
	mark_public_operations(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: &utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(doc)?);
	let json_route = get(move || {
		let doc_json = Arc::clone(&doc_json);
		async move { Json((*doc_json).clone()) }
	});

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn object_entry<'a>(parent: &'a mut Value, key: &str) -> Option<&'a mut Map<String, Value>> {
	parent
		.as_object_mut()?
		.entry(key)
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
}

fn ensure_security_components(doc: &mut Value) {
	let Some(components) = object_entry(doc, "components") else {
		return;
	};
	let schemes = components
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()));
	if let Some(schemes) = schemes.as_object_mut() {
		schemes.insert(
			"bearerAuth".to_string(),
			json!({
				"type": "http",
				"scheme": "bearer",
				"bearerFormat": "JWT"
			}),
		);
	}
}

fn ensure_global_security(doc: &mut Value) {
	if let Some(root) = doc.as_object_mut() {
		root.entry("security")
			.or_insert_with(|| json!([{ "bearerAuth": [] }]));
	}
}

fn mark_public_operations(doc: &mut Value) {
	let Some(paths) = object_entry(doc, "paths") else {
		return;
	};
	for (path, method) in PUBLIC_OPERATIONS {
		if let Some(operation) = paths.get_mut(path).and_then(|item| item.get_mut(method)) {
			operation["security"] = json!([]);
		}
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let tls_enabled = std::env::var("TLS_CERT_PATH").is_ok() && std::env::var("TLS_KEY_PATH").is_ok();
	let scheme = if tls_enabled { "https" } else { "http" };
	let server_url = format!("{}://localhost:{}", scheme, port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_login_is_public_and_the_rest_is_bearer() {
		let doc = serde_json::to_value(build_openapi(8000).unwrap()).unwrap();
		assert_eq!(doc["paths"]["/api/auth/login"]["post"]["security"], json!([]));
		assert!(doc["paths"]["/api/projects"]["get"].get("security").is_none());
		assert_eq!(doc["security"], json!([{ "bearerAuth": [] }]));
		assert_eq!(doc["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");
	}
}
