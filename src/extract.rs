use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// JSON body extractor whose rejection is an [`AppError::Validation`] naming
/// the offending field path, e.g. `members[1]: invalid type`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/json"))
            .unwrap_or(false);
        if !is_json {
            return Err(AppError::validation("expected `Content-Type: application/json`"));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|err| AppError::validation(err.body_text()))?;

        parse(&bytes).map(AppJson)
    }
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    let deserializer = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(deserializer).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        if path == "." {
            AppError::validation(inner.to_string())
        } else {
            AppError::validation(format!("{path}: {inner}"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Body {
        name: String,
        members: Vec<uuid::Uuid>,
    }

    #[test]
    fn test_error_names_field_path() {
        let err = parse::<Body>(br#"{"name":"x","members":["not-a-uuid"]}"#).unwrap_err();
        match err {
            AppError::Validation(message) => assert!(message.starts_with("members[0]"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_field() {
        let err = parse::<Body>(br#"{"members":[]}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `name`"));
    }
}
