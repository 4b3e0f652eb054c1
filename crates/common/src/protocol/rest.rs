// Request and response bodies for the folio REST API (v1).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CurrentUser, DocumentSummary, MemberSummary};

pub const API_VERSION: &str = "v1";

pub const ROUTE_SIGNUP_ORG: &str = "/v1/auth/signup/org";
pub const ROUTE_SIGNUP_JOIN: &str = "/v1/auth/signup/join";
pub const ROUTE_SIGNIN: &str = "/v1/auth/signin";
pub const ROUTE_SIGNOUT: &str = "/v1/auth/signout";
pub const ROUTE_ME: &str = "/v1/me";
pub const ROUTE_MEMBERS: &str = "/v1/members";
pub const ROUTE_DOCUMENTS: &str = "/v1/documents";
pub const ROUTE_DOCUMENT: &str = "/v1/documents/{doc_id}";
pub const ROUTE_DOCUMENT_CONTENT: &str = "/v1/documents/{doc_id}/content";
pub const ROUTE_DOCUMENT_TITLE: &str = "/v1/documents/{doc_id}/title";
pub const ROUTE_DOCUMENT_SYNC: &str = "/v1/documents/{doc_id}/sync";
pub const ROUTE_HEALTH: &str = "/healthz";

/// Every routed path, in registration order.
pub const ALL_ROUTES: &[&str] = &[
    ROUTE_SIGNUP_ORG,
    ROUTE_SIGNUP_JOIN,
    ROUTE_SIGNIN,
    ROUTE_SIGNOUT,
    ROUTE_ME,
    ROUTE_MEMBERS,
    ROUTE_DOCUMENTS,
    ROUTE_DOCUMENT,
    ROUTE_DOCUMENT_CONTENT,
    ROUTE_DOCUMENT_TITLE,
    ROUTE_DOCUMENT_SYNC,
    ROUTE_HEALTH,
];

/// Fills `{doc_id}` in a document route template.
pub fn document_path(template: &str, doc_id: Uuid) -> String {
    template.replace("{doc_id}", &doc_id.to_string())
}

// ── Requests ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignUpWithOrgRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub org_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignUpJoinOrgRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateDocumentRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateTitleRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateContentRequest {
    pub content: String,
}

/// A binary collaborative update, base64 encoded (standard alphabet).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncUpdateRequest {
    pub update: String,
}

// ── Responses ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignUpResult {
    pub user_id: Uuid,
    pub token: String,
    pub org_id: Uuid,
    pub org_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignInResult {
    pub user_id: Uuid,
    pub token: String,
    pub name: String,
    pub org_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUserEnvelope {
    pub user: Option<CurrentUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MembersEnvelope {
    pub items: Vec<MemberSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentsEnvelope {
    pub items: Vec<DocumentSummary>,
}

/// `document` is null when the id is unknown or belongs to another organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentEnvelope {
    pub document: Option<DocumentSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedDocument {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncStateEnvelope {
    pub update: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_path_fills_template() {
        let id = Uuid::nil();
        assert_eq!(
            document_path(ROUTE_DOCUMENT_TITLE, id),
            "/v1/documents/00000000-0000-0000-0000-000000000000/title"
        );
    }

    #[test]
    fn missing_document_serializes_as_null() {
        let value = serde_json::to_value(DocumentEnvelope { document: None }).unwrap();
        assert_eq!(value, serde_json::json!({ "document": null }));
    }

    #[test]
    fn error_envelope_tolerates_missing_optional_fields() {
        let envelope: ErrorEnvelope = serde_json::from_str(
            r#"{"error":{"code":"FORBIDDEN","message":"nope","retryable":false}}"#,
        )
        .expect("error envelope should parse");
        assert_eq!(envelope.error.code, "FORBIDDEN");
        assert!(envelope.error.request_id.is_none());
    }
}
