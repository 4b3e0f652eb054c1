use std::future::Future;

use axum::{
    http::{header::HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;
use uuid::Uuid;

use crate::{
    store::{StoreError, UniqueKey},
    sync::SyncError,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    static REQUEST_ID: String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationFailed,
    DuplicateEmail,
    InvalidInviteCode,
    InvalidCredentials,
    Unauthorized,
    Forbidden,
    PayloadTooLarge,
    InternalError,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::DuplicateEmail => "DUPLICATE_EMAIL",
            Self::InvalidInviteCode => "INVALID_INVITE_CODE",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    pub const fn status(self) -> StatusCode {
        match self {
            Self::ValidationFailed => StatusCode::BAD_REQUEST,
            Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::InvalidInviteCode => StatusCode::NOT_FOUND,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn retryable(self) -> bool {
        matches!(self, Self::InternalError)
    }

    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ValidationFailed => "request validation failed",
            Self::DuplicateEmail => "email already registered",
            Self::InvalidInviteCode => "invalid invite code",
            Self::InvalidCredentials => "invalid email or password",
            Self::Unauthorized => "not authenticated",
            Self::Forbidden => "not authorized",
            Self::PayloadTooLarge => "payload exceeds maximum allowed size",
            Self::InternalError => "internal server error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayError {
    code: ErrorCode,
    message: String,
    details: Value,
    request_id: Option<String>,
}

impl RelayError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), details: json!({}), request_id: None }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(default_code_for_status(status), message)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let request_id = self.request_id.or_else(current_request_id);

        let mut response = (
            self.code.status(),
            Json(json!({
                "error": {
                    "code": self.code.as_str(),
                    "message": self.message,
                    "retryable": self.code.retryable(),
                    "request_id": request_id.clone(),
                    "details": self.details,
                }
            })),
        )
            .into_response();

        if let Some(request_id) = request_id {
            attach_request_id_header(&mut response, &request_id);
        }

        response
    }
}

/// Failure kinds surfaced by the access-control operations.
///
/// Every variant except `Internal` is a caller-facing outcome. `Internal`
/// carries storage or hashing failures and is never shown to clients.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid invite code")]
    InvalidInviteCode,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("not authenticated")]
    Unauthorized,
    #[error("not authorized")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AccessError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateEmail => ErrorCode::DuplicateEmail,
            Self::InvalidInviteCode => ErrorCode::InvalidInviteCode,
            Self::InvalidCredentials => ErrorCode::InvalidCredentials,
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::Forbidden => ErrorCode::Forbidden,
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl From<StoreError> for AccessError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(UniqueKey::Email) => Self::DuplicateEmail,
            StoreError::Conflict(key) => {
                Self::Internal(anyhow::anyhow!("unexpected unique conflict on {key:?}"))
            }
            StoreError::Internal(source) => Self::Internal(source),
        }
    }
}

impl From<SyncError> for AccessError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::InvalidUpdate { .. } => Self::Validation(error.to_string()),
            SyncError::Backend(source) => Self::Internal(source),
        }
    }
}

impl From<AccessError> for RelayError {
    fn from(error: AccessError) -> Self {
        match error {
            AccessError::Internal(source) => {
                error!(error = ?source, "access operation failed");
                RelayError::from_code(ErrorCode::InternalError)
            }
            other => RelayError::new(other.code(), other.to_string()),
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        RelayError::from(self).into_response()
    }
}

pub fn default_code_for_status(status: StatusCode) -> ErrorCode {
    match status {
        StatusCode::BAD_REQUEST => ErrorCode::ValidationFailed,
        StatusCode::UNAUTHORIZED => ErrorCode::Unauthorized,
        StatusCode::FORBIDDEN => ErrorCode::Forbidden,
        StatusCode::CONFLICT => ErrorCode::DuplicateEmail,
        StatusCode::PAYLOAD_TOO_LARGE => ErrorCode::PayloadTooLarge,
        _ => ErrorCode::InternalError,
    }
}

pub async fn with_request_id_scope<F>(request_id: String, future: F) -> F::Output
where
    F: Future,
{
    REQUEST_ID.scope(request_id, future).await
}

pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok()
}

pub fn request_id_from_headers_or_generate(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub fn attach_request_id_header(response: &mut Response, request_id: &str) {
    if let Ok(header) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header);
    }
}
