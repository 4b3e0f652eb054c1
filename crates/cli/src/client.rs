use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use folio_common::protocol::rest::{
    document_path, CreateDocumentRequest, CreatedDocument, CurrentUserEnvelope, DocumentEnvelope,
    DocumentsEnvelope, ErrorEnvelope, MembersEnvelope, SignInRequest, SignInResult,
    SignUpJoinOrgRequest, SignUpResult, SignUpWithOrgRequest, UpdateContentRequest,
    UpdateTitleRequest, ROUTE_DOCUMENT, ROUTE_DOCUMENTS, ROUTE_DOCUMENT_CONTENT,
    ROUTE_DOCUMENT_TITLE, ROUTE_ME, ROUTE_MEMBERS, ROUTE_SIGNIN, ROUTE_SIGNOUT, ROUTE_SIGNUP_JOIN,
    ROUTE_SIGNUP_ORG,
};
use folio_common::types::{CurrentUser, DocumentSummary, MemberSummary};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;
use uuid::Uuid;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// A relay error envelope, kept typed inside the `anyhow` chain.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: u16,
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relay error {} ({}): {}", self.code, self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

/// The relay could not be reached at all.
#[derive(Debug)]
pub struct RelayUnreachable {
    pub relay_url: String,
    source: reqwest::Error,
}

impl fmt::Display for RelayUnreachable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relay at `{}` is unreachable", self.relay_url)
    }
}

impl std::error::Error for RelayUnreachable {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl RelayClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid relay url `{base_url}`"))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, base_url, token })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub async fn sign_up_with_org(&self, request: &SignUpWithOrgRequest) -> Result<SignUpResult> {
        self.send_json(Method::POST, ROUTE_SIGNUP_ORG, Some(request)).await
    }

    pub async fn sign_up_join(&self, request: &SignUpJoinOrgRequest) -> Result<SignUpResult> {
        self.send_json(Method::POST, ROUTE_SIGNUP_JOIN, Some(request)).await
    }

    pub async fn sign_in(&self, request: &SignInRequest) -> Result<SignInResult> {
        self.send_json(Method::POST, ROUTE_SIGNIN, Some(request)).await
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.send_empty::<()>(Method::POST, ROUTE_SIGNOUT, None).await
    }

    pub async fn current_user(&self) -> Result<Option<CurrentUser>> {
        let envelope: CurrentUserEnvelope =
            self.send_json(Method::GET, ROUTE_ME, None::<&()>).await?;
        Ok(envelope.user)
    }

    pub async fn list_members(&self) -> Result<Vec<MemberSummary>> {
        let envelope: MembersEnvelope =
            self.send_json(Method::GET, ROUTE_MEMBERS, None::<&()>).await?;
        Ok(envelope.items)
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let envelope: DocumentsEnvelope =
            self.send_json(Method::GET, ROUTE_DOCUMENTS, None::<&()>).await?;
        Ok(envelope.items)
    }

    pub async fn create_document(&self, title: &str) -> Result<Uuid> {
        let request = CreateDocumentRequest { title: title.to_owned() };
        let created: CreatedDocument =
            self.send_json(Method::POST, ROUTE_DOCUMENTS, Some(&request)).await?;
        Ok(created.id)
    }

    pub async fn get_document(&self, doc_id: Uuid) -> Result<Option<DocumentSummary>> {
        let path = document_path(ROUTE_DOCUMENT, doc_id);
        let envelope: DocumentEnvelope = self.send_json(Method::GET, &path, None::<&()>).await?;
        Ok(envelope.document)
    }

    pub async fn update_title(&self, doc_id: Uuid, title: &str) -> Result<()> {
        let path = document_path(ROUTE_DOCUMENT_TITLE, doc_id);
        let request = UpdateTitleRequest { title: title.to_owned() };
        self.send_empty(Method::PUT, &path, Some(&request)).await
    }

    pub async fn update_content(&self, doc_id: Uuid, content: String) -> Result<()> {
        let path = document_path(ROUTE_DOCUMENT_CONTENT, doc_id);
        let request = UpdateContentRequest { content };
        self.send_empty(Method::PUT, &path, Some(&request)).await
    }

    pub async fn delete_document(&self, doc_id: Uuid) -> Result<()> {
        let path = document_path(ROUTE_DOCUMENT, doc_id);
        self.send_empty::<()>(Method::DELETE, &path, None).await
    }

    async fn send_json<B, R>(&self, method: Method, path: &str, body: Option<&B>) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let response = self.send(method, path, body).await?;
        response
            .json::<R>()
            .await
            .with_context(|| format!("failed to decode relay response for `{path}`"))
    }

    async fn send_empty<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<()>
    where
        B: Serialize,
    {
        self.send(method, path, body).await.map(|_| ())
    }

    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response>
    where
        B: Serialize,
    {
        let url = self.base_url.join(path).with_context(|| format!("invalid route `{path}`"))?;
        debug!(%method, %url, "relay request");

        let mut request: RequestBuilder = self.http.request(method, url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| {
            if source.is_connect() || source.is_timeout() {
                anyhow!(RelayUnreachable { relay_url: self.base_url.to_string(), source })
            } else {
                anyhow!(source)
            }
        })?;

        if response.status().is_success() {
            return Ok(response);
        }
        Err(anyhow!(api_error(response).await))
    }
}

async fn api_error(response: Response) -> ApiError {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    match serde_json::from_slice::<ErrorEnvelope>(&body) {
        Ok(envelope) => ApiError {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
            request_id: envelope.error.request_id,
        },
        Err(_) => ApiError {
            status: status.as_u16(),
            code: fallback_code(status).to_owned(),
            message: String::from_utf8_lossy(&body).trim().to_owned(),
            request_id: None,
        },
    }
}

fn fallback_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "VALIDATION_FAILED",
        StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
        StatusCode::FORBIDDEN => "FORBIDDEN",
        StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
        _ => "INTERNAL_ERROR",
    }
}

pub fn api_error_code(error: &anyhow::Error) -> Option<&str> {
    error.chain().find_map(|cause| cause.downcast_ref::<ApiError>()).map(|e| e.code.as_str())
}

pub fn is_relay_unreachable(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| cause.downcast_ref::<RelayUnreachable>().is_some())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::{api_error_code, is_relay_unreachable, ApiError, RelayClient};

    /// Serve exactly one canned HTTP response and hand back the raw request.
    async fn serve_once(status_line: &str, body: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("listener should bind");
        let addr = listener.local_addr().expect("listener should have an address");
        let status_line = status_line.to_owned();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept should succeed");
            let mut request = Vec::new();
            let mut buf = [0_u8; 4096];
            loop {
                let read = stream.read(&mut buf).await.expect("request should be readable");
                request.extend_from_slice(&buf[..read]);
                if read == 0 || request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.expect("response write should succeed");
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{addr}"), server)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse().ok())?
            })
            .unwrap_or(0_usize);
        request.len() >= header_end + 4 + content_length
    }

    #[tokio::test]
    async fn sends_bearer_token_and_decodes_envelope() {
        let (base, server) = serve_once(
            "200 OK",
            json!({ "items": [{
                "id": "00000000-0000-0000-0000-000000000001",
                "name": "Alice",
                "email": "alice@acme.test",
                "role": "admin"
            }] })
            .to_string(),
        )
        .await;

        let client = RelayClient::new(&base, Some("secret-token".into())).unwrap();
        let members = client.list_members().await.expect("members call should succeed");
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "Alice");

        let request = server.await.expect("server should finish");
        assert!(request.starts_with("GET /v1/members "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret-token"));
    }

    #[tokio::test]
    async fn error_envelope_becomes_typed_api_error() {
        let (base, server) = serve_once(
            "409 Conflict",
            json!({ "error": {
                "code": "DUPLICATE_EMAIL",
                "message": "email already registered",
                "retryable": false,
                "request_id": "req-1",
                "details": {}
            } })
            .to_string(),
        )
        .await;

        let client = RelayClient::new(&base, None).unwrap();
        let error = client
            .sign_in(&folio_common::protocol::rest::SignInRequest {
                email: "alice@acme.test".into(),
                password: "correct-horse".into(),
            })
            .await
            .expect_err("409 should fail");

        assert_eq!(api_error_code(&error), Some("DUPLICATE_EMAIL"));
        let api_error = error.downcast_ref::<ApiError>().expect("error should be typed");
        assert_eq!(api_error.status, 409);
        assert_eq!(api_error.request_id.as_deref(), Some("req-1"));

        let request = server.await.expect("server should finish");
        assert!(request.starts_with("POST /v1/auth/signin "));
        assert!(request.contains("\"email\":\"alice@acme.test\""));
    }

    #[tokio::test]
    async fn no_content_responses_are_accepted() {
        let (base, server) = serve_once("204 No Content", String::new()).await;
        let client = RelayClient::new(&base, Some("t".into())).unwrap();
        client
            .delete_document(uuid::Uuid::nil())
            .await
            .expect("204 should be treated as success");

        let request = server.await.expect("server should finish");
        assert!(request.starts_with("DELETE /v1/documents/00000000-0000-0000-0000-000000000000 "));
    }

    #[tokio::test]
    async fn closed_port_is_reported_as_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("listener should bind");
        let addr = listener.local_addr().expect("listener should have an address");
        drop(listener);

        let client = RelayClient::new(&format!("http://{addr}"), None).unwrap();
        let error = client.current_user().await.expect_err("closed port should fail");
        assert!(is_relay_unreachable(&error));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(RelayClient::new("not a url", None).is_err());
    }
}
