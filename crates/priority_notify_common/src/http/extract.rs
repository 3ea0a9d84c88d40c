// --- File: crates/priority_notify_common/src/http/extract.rs ---
//! Body and query extractors whose rejections use the common error body.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;

use crate::error::{validation_error, NotifyError};

/// Like [`axum::Json`], but a body that cannot be read or parsed is a
/// validation error on the `body` field.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = NotifyError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(validation_error("body", rejection.body_text())),
        }
    }
}

/// Like [`axum::extract::Query`], with the same rejection mapping on the
/// `query` field.
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = NotifyError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => Err(validation_error("query", rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        title: String,
    }

    #[tokio::test]
    async fn test_json_body_parses_valid_input() {
        let req = Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title":"disk full"}"#))
            .unwrap();
        let JsonBody(payload) = JsonBody::<Payload>::from_request(req, &()).await.unwrap();
        assert_eq!(payload.title, "disk full");
    }

    #[tokio::test]
    async fn test_json_body_rejection_is_validation_error() {
        let req = Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title": 5}"#))
            .unwrap();
        let err = JsonBody::<Payload>::from_request(req, &()).await.unwrap_err();
        match err {
            NotifyError::Validation(fields) => assert_eq!(fields[0].field, "body"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
