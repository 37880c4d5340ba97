//! Custom Extractors
//!
//! Axum extractors that report rejections in the API error format.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::shared::error::AppError;
use crate::shared::snowflake::parse_id;
use crate::shared::validation::validate_request;

/// Snowflake id from the `{id}` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathId(pub i64);

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::BadRequest("Invalid id".into()))?;

        parse_id(&raw)
            .map(PathId)
            .ok_or_else(|| AppError::BadRequest("Invalid id".into()))
    }
}

/// JSON body run through its `validator` rules before reaching the handler.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state).await?;
        validate_request(&body)?;
        Ok(Self(body))
    }
}

/// JSON body without validation rules.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state).await?;
        Ok(Self(body))
    }
}

/// Query string whose rejection is a 400 in the API error format.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::get, routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    struct NameBody {
        #[validate(length(min = 2, message = "Name is too short"))]
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct PageParams {
        page: Option<i64>,
    }

    fn app() -> Router {
        Router::new()
            .route("/items/{id}", get(|PathId(id): PathId| async move { id.to_string() }))
            .route(
                "/items",
                post(|ValidatedJson(body): ValidatedJson<NameBody>| async move { body.name }),
            )
            .route(
                "/pages",
                get(|ApiQuery(params): ApiQuery<PageParams>| async move {
                    params.page.unwrap_or(1).to_string().into_response()
                }),
            )
    }

    async fn send(request: Request) -> StatusCode {
        app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_path_id() {
        let ok = Request::builder().uri("/items/42").body(Body::empty()).unwrap();
        assert_eq!(send(ok).await, StatusCode::OK);

        let bad = Request::builder().uri("/items/abc").body(Body::empty()).unwrap();
        assert_eq!(send(bad).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_validated_json() {
        let json = |body: &str| {
            Request::builder()
                .method("POST")
                .uri("/items")
                .header("content-type", "application/json")
                .body(Body::from(body.to_owned()))
                .unwrap()
        };

        assert_eq!(send(json(r#"{"name":"Rex"}"#)).await, StatusCode::OK);
        assert_eq!(send(json(r#"{"name":"R"}"#)).await, StatusCode::BAD_REQUEST);
        assert_eq!(send(json("not json")).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_query_is_bad_request() {
        let bad = Request::builder().uri("/pages?page=first").body(Body::empty()).unwrap();
        assert_eq!(send(bad).await, StatusCode::BAD_REQUEST);
    }
}
