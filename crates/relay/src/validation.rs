// Input validation helpers.
//
// - `ValidatedJson<T>` extractor: content-type check + serde, structured errors.
// - `ValidatedPath<T>` extractor: path parameters with the same error envelope.
// - Field checks shared by the directory and document operations.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::{AccessError, ErrorCode, RelayError};

/// Maximum REST request body in bytes (1 MiB).
pub const MAX_REST_BODY_BYTES: usize = 1024 * 1024;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_EMAIL_CHARS: usize = 254;
pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 256;

// ── ValidatedJson extractor ────────────────────────────────────────

/// A JSON body extractor that returns structured `RelayError` on failure.
///
/// Use this instead of `axum::Json<T>` in handlers to get consistent
/// VALIDATION_FAILED error responses instead of plain-text Axum rejections.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => Err(json_rejection_error(&rejection).into_response()),
        }
    }
}

fn json_rejection_error(rejection: &JsonRejection) -> RelayError {
    let (code, message, kind) = match rejection {
        JsonRejection::JsonDataError(e) => {
            (ErrorCode::ValidationFailed, format!("invalid JSON payload: {e}"), "data_error")
        }
        JsonRejection::JsonSyntaxError(e) => {
            (ErrorCode::ValidationFailed, format!("malformed JSON: {e}"), "syntax_error")
        }
        JsonRejection::MissingJsonContentType(_) => (
            ErrorCode::ValidationFailed,
            "expected Content-Type: application/json".to_string(),
            "missing_content_type",
        ),
        JsonRejection::BytesRejection(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            (ErrorCode::PayloadTooLarge, format!("request body error: {e}"), "too_large")
        }
        other => {
            (ErrorCode::ValidationFailed, format!("request body error: {other}"), "body_error")
        }
    };
    RelayError::new(code, message).with_details(serde_json::json!({ "kind": kind }))
}

// ── ValidatedPath extractor ────────────────────────────────────────

/// Path parameters that reject with a `RelayError` envelope, so a malformed
/// document id reads the same to clients as any other bad input.
pub struct ValidatedPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ValidatedPath(value)),
            Err(rejection) => Err(path_rejection_error(&rejection).into_response()),
        }
    }
}

fn path_rejection_error(rejection: &PathRejection) -> RelayError {
    // Missing route parameters are a routing bug, not client input.
    let code = if rejection.status().is_server_error() {
        ErrorCode::InternalError
    } else {
        ErrorCode::ValidationFailed
    };
    RelayError::new(code, format!("invalid path parameter: {}", rejection.body_text()))
        .with_details(serde_json::json!({ "kind": "path_error" }))
}

// ── Field checks ───────────────────────────────────────────────────

/// Trim `value` and require it to be non-empty and at most `max_chars` long.
pub fn required_text(field: &str, value: &str, max_chars: usize) -> Result<String, AccessError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AccessError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(AccessError::validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

pub fn document_title(title: &str) -> Result<String, AccessError> {
    required_text("title", title, MAX_TITLE_CHARS)
}

/// Emails are trimmed but otherwise compared exactly as stored.
pub fn email(value: &str) -> Result<String, AccessError> {
    let email = required_text("email", value, MAX_EMAIL_CHARS)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AccessError::validation("email must look like name@domain")),
    }
}

pub fn password(value: &str) -> Result<(), AccessError> {
    let length = value.chars().count();
    if length < MIN_PASSWORD_CHARS {
        return Err(AccessError::validation(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    if length > MAX_PASSWORD_CHARS {
        return Err(AccessError::validation(format!(
            "password must be at most {MAX_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::DefaultBodyLimit,
        http::{Method, Request, StatusCode},
        routing::post,
        Router,
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    struct TestPayload {
        name: String,
    }

    async fn echo_handler(ValidatedJson(payload): ValidatedJson<TestPayload>) -> impl IntoResponse {
        (StatusCode::OK, payload.name)
    }

    fn test_app() -> Router {
        Router::new().route("/test", post(echo_handler))
    }

    async fn error_code(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn validated_json_accepts_valid_payload() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/test")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"alice"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"alice");
    }

    #[tokio::test]
    async fn validated_json_rejects_missing_content_type() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/test")
                    .body(Body::from(r#"{"name":"alice"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let (status, parsed) = error_code(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(parsed["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(parsed["error"]["details"]["kind"], "missing_content_type");
    }

    #[tokio::test]
    async fn validated_json_rejects_missing_field() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/test")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"nickname":"alice"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let (status, parsed) = error_code(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(parsed["error"]["details"]["kind"], "data_error");
    }

    #[tokio::test]
    async fn oversized_body_maps_to_payload_too_large() {
        let app = test_app().layer(DefaultBodyLimit::max(16));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/test")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"a much longer name than sixteen bytes"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let (status, parsed) = error_code(response).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(parsed["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[test]
    fn titles_are_trimmed_and_bounded() {
        assert_eq!(document_title("  Plan  ").unwrap(), "Plan");
        assert!(matches!(document_title("   "), Err(AccessError::Validation(_))));
        assert!(document_title(&"x".repeat(MAX_TITLE_CHARS)).is_ok());
        assert!(document_title(&"x".repeat(MAX_TITLE_CHARS + 1)).is_err());
    }

    #[test]
    fn title_limit_counts_characters_not_bytes() {
        assert!(document_title(&"é".repeat(MAX_TITLE_CHARS)).is_ok());
    }

    #[test]
    fn email_requires_local_part_and_domain() {
        assert_eq!(email(" alice@acme.test ").unwrap(), "alice@acme.test");
        assert!(email("alice").is_err());
        assert!(email("@acme.test").is_err());
        assert!(email("alice@").is_err());
    }

    #[test]
    fn email_case_is_preserved() {
        assert_eq!(email("Alice@Acme.test").unwrap(), "Alice@Acme.test");
    }

    #[test]
    fn password_length_is_enforced() {
        assert!(password("short").is_err());
        assert!(password("long enough").is_ok());
        assert!(password(&"p".repeat(MAX_PASSWORD_CHARS + 1)).is_err());
    }

    async fn id_handler(ValidatedPath(id): ValidatedPath<uuid::Uuid>) -> String {
        id.to_string()
    }

    #[tokio::test]
    async fn validated_path_rejects_malformed_uuid_with_envelope() {
        let app = Router::new().route("/items/{id}", axum::routing::get(id_handler));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/items/not-a-uuid").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let (status, parsed) = error_code(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(parsed["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(parsed["error"]["details"]["kind"], "path_error");

        let id = uuid::Uuid::new_v4();
        let response = app
            .oneshot(Request::builder().uri(format!("/items/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), id.to_string().as_bytes());
    }
}
