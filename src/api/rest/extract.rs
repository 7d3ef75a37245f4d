use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::api::rest::error::ApiError;

/// `Json` whose rejections use the API's `{"message": ...}` error body.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        text: String,
    }

    fn request(body: &'static str, content_type: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/api/ai/actions/parse");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn rejection_of(req: Request) -> (StatusCode, serde_json::Value) {
        let err = match ApiJson::<Payload>::from_request(req, &()).await {
            Ok(_) => panic!("body should be rejected"),
            Err(e) => e,
        };
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn valid_body_is_extracted() {
        let ApiJson(payload) =
            ApiJson::<Payload>::from_request(request(r#"{"text":"hi"}"#, Some("application/json")), &())
                .await
                .unwrap_or_else(|_| panic!("valid body rejected"));
        assert_eq!(payload.text, "hi");
    }

    #[tokio::test]
    async fn malformed_and_incomplete_bodies_get_json_errors() {
        let (status, body) = rejection_of(request("{not json", Some("application/json"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid request body"));

        let (status, body) = rejection_of(request("{}", Some("application/json"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("text"), "{body}");

        let (status, _) = rejection_of(request(r#"{"text":"hi"}"#, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
