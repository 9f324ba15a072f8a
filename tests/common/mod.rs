#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

use workgrid::authz::Role;
use workgrid::create_app;
use workgrid::services::users::bootstrap_head;

pub const PASSWORD: &str = "password123";

/// Router over a migrated temp-file database. The directory lives as long as this value.
pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    _dir: TempDir,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub id: String,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create tempdir")?;
        let opts = SqliteConnectOptions::new()
            .filename(dir.path().join("test.db"))
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(opts).await?;

        let migrator =
            sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
        migrator.run(&pool).await?;

        std::env::set_var("JWT_SECRET", "test-secret");
        let app = create_app(pool.clone()).await?;

        Ok(Self { app, pool, _dir: dir })
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, session: &Session) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, Some(&session.token), None).await
    }

    pub async fn post(&self, uri: &str, session: &Session, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, Some(&session.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, session: &Session, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, uri, Some(&session.token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, session: &Session, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PATCH, uri, Some(&session.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, session: &Session) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, uri, Some(&session.token), None).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let (status, body) = self
            .send(Method::POST, "/api/auth/login", None, Some(json!({ "email": email, "password": password })))
            .await?;
        if status != StatusCode::OK {
            panic!("login failed: {} - {}", status, body);
        }
        Ok(Session {
            token: str_field(&body, "token")?,
            id: body["user"]["id"].as_str().context("missing user id")?.to_string(),
        })
    }

    /// Department head created the way `cli create-head` does it.
    pub async fn head(&self, role: Role, email: &str) -> Result<Session> {
        bootstrap_head(&self.pool, "Head", email, PASSWORD, role).await?;
        self.login(email, PASSWORD).await
    }

    /// Creates a user through the API on behalf of `by` and logs them in.
    pub async fn user(&self, by: &Session, name: &str, email: &str, role: &str) -> Result<Session> {
        let (status, body) = self
            .post(
                "/api/users",
                by,
                json!({ "name": name, "email": email, "password": PASSWORD, "role": role }),
            )
            .await?;
        if status != StatusCode::CREATED {
            panic!("user create failed: {} - {}", status, body);
        }
        self.login(email, PASSWORD).await
    }

    pub async fn project(&self, by: &Session, name: &str, members: &[&str]) -> Result<String> {
        let (status, body) = self
            .post("/api/projects", by, json!({ "name": name, "members": members }))
            .await?;
        if status != StatusCode::CREATED {
            panic!("project create failed: {} - {}", status, body);
        }
        str_field(&body, "id")
    }
}

pub fn str_field(value: &Value, key: &str) -> Result<String> {
    Ok(value
        .get(key)
        .and_then(Value::as_str)
        .with_context(|| format!("missing `{}` in {}", key, value))?
        .to_string())
}

pub fn ids(list: &Value, key: &str) -> Vec<String> {
    list.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(key).and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
