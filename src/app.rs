use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{Actor, DefaultPolicyEvaluator, PolicyEvaluator};
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{auth, dashboard, health, projects, reports, tasks, users};
use crate::services::Context;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub policy: Arc<dyn PolicyEvaluator>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            policy: Arc::new(DefaultPolicyEvaluator::new()),
        }
    }

    pub fn context(&self, actor: Actor) -> Context<'_> {
        Context::new(&self.pool, self.policy.as_ref(), actor)
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let state = AppState::new(pool, jwt_config);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/profile", get(auth::profile).put(auth::update_profile))
        .route("/change-password", put(auth::change_password))
        .route("/logout", post(auth::logout));

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/my-team", get(users::my_team))
        .route("/stats", get(users::user_stats))
        .route("/:id", get(users::get_user).put(users::update_user).delete(users::delete_user));

    let project_routes = Router::new()
        .route("/", get(projects::list_projects).post(projects::create_project))
        .route(
            "/:id",
            get(projects::get_project).put(projects::update_project).delete(projects::delete_project),
        )
        .route("/:id/members", post(projects::add_member))
        .route("/:id/members/:user_id", delete(projects::remove_member))
        .route("/:id/stats", get(projects::project_stats));

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route("/my-tasks", get(tasks::my_tasks))
        .route("/stats", get(tasks::task_stats))
        .route("/:id", get(tasks::get_task).put(tasks::update_task).delete(tasks::delete_task))
        .route("/:id/status", patch(tasks::update_task_status))
        .route("/:id/comments", get(tasks::list_comments).post(tasks::add_comment));

    let report_routes = Router::new()
        .route("/monthly", get(reports::monthly_report))
        .route("/preview", get(reports::report_preview))
        .route("/available-months", get(reports::available_months));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/reports", report_routes)
        .route("/dashboard", get(dashboard::dashboard))
        .route("/dashboard/stats", get(dashboard::dashboard_stats))
        .route("/dashboard/activity", get(dashboard::recent_activity))
        .route("/dashboard/tasks/filtered", get(dashboard::filtered_tasks))
        .route("/health", get(health::health));

    let router = Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
