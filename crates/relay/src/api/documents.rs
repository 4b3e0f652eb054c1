// Document endpoints.
//
// Routes:
//   GET    /v1/documents                  list (caller's organization)
//   POST   /v1/documents                  create
//   GET    /v1/documents/{doc_id}         get single (null when not visible)
//   DELETE /v1/documents/{doc_id}         delete (creator or admin)
//   PUT    /v1/documents/{doc_id}/content replace body snapshot
//   PUT    /v1/documents/{doc_id}/title   rename
//   GET    /v1/documents/{doc_id}/sync    collaborative state (base64)
//   POST   /v1/documents/{doc_id}/sync    merge a collaborative update (base64)

use axum::{extract::State, http::StatusCode, Json};
use base64::{engine::general_purpose::STANDARD, Engine};
use folio_common::protocol::rest::{
    CreateDocumentRequest, CreatedDocument, DocumentEnvelope, DocumentsEnvelope,
    SyncStateEnvelope, SyncUpdateRequest, UpdateContentRequest, UpdateTitleRequest,
};
use uuid::Uuid;

use super::ApiState;
use crate::{
    auth::middleware::BearerToken,
    documents,
    error::AccessError,
    gate::{check_read, check_write},
    validation::{ValidatedJson, ValidatedPath},
};

pub(super) async fn list_documents(
    State(state): State<ApiState>,
    token: BearerToken,
) -> Result<Json<DocumentsEnvelope>, AccessError> {
    let items = documents::list_documents(&state.store, token.as_deref()).await?;
    Ok(Json(DocumentsEnvelope { items }))
}

pub(super) async fn create_document(
    State(state): State<ApiState>,
    token: BearerToken,
    ValidatedJson(payload): ValidatedJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<CreatedDocument>), AccessError> {
    let id = documents::create_document(
        &state.store,
        state.sync.as_ref(),
        token.as_deref(),
        &payload.title,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(CreatedDocument { id })))
}

pub(super) async fn get_document(
    State(state): State<ApiState>,
    token: BearerToken,
    ValidatedPath(doc_id): ValidatedPath<Uuid>,
) -> Result<Json<DocumentEnvelope>, AccessError> {
    let document = documents::get_document(&state.store, token.as_deref(), doc_id).await?;
    Ok(Json(DocumentEnvelope { document }))
}

pub(super) async fn delete_document(
    State(state): State<ApiState>,
    token: BearerToken,
    ValidatedPath(doc_id): ValidatedPath<Uuid>,
) -> Result<StatusCode, AccessError> {
    documents::delete_document(&state.store, state.sync.as_ref(), token.as_deref(), doc_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn update_content(
    State(state): State<ApiState>,
    token: BearerToken,
    ValidatedPath(doc_id): ValidatedPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateContentRequest>,
) -> Result<StatusCode, AccessError> {
    documents::update_document_content(&state.store, token.as_deref(), doc_id, payload.content)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn update_title(
    State(state): State<ApiState>,
    token: BearerToken,
    ValidatedPath(doc_id): ValidatedPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateTitleRequest>,
) -> Result<StatusCode, AccessError> {
    documents::update_document_title(&state.store, token.as_deref(), doc_id, &payload.title)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn read_sync_state(
    State(state): State<ApiState>,
    token: BearerToken,
    ValidatedPath(doc_id): ValidatedPath<Uuid>,
) -> Result<Json<SyncStateEnvelope>, AccessError> {
    if !check_read(&state.store, token.as_deref(), doc_id).await? {
        return Err(AccessError::Unauthorized);
    }
    let update = documents::sync_state(&state.store, state.sync.as_ref(), doc_id).await?;
    Ok(Json(SyncStateEnvelope { update: STANDARD.encode(update) }))
}

pub(super) async fn apply_sync_update(
    State(state): State<ApiState>,
    token: BearerToken,
    ValidatedPath(doc_id): ValidatedPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<SyncUpdateRequest>,
) -> Result<StatusCode, AccessError> {
    if !check_write(&state.store, token.as_deref(), doc_id).await? {
        return Err(AccessError::Unauthorized);
    }
    let update = STANDARD
        .decode(payload.update.trim())
        .map_err(|_| AccessError::validation("update must be standard base64"))?;
    documents::merge_sync_update(&state.store, state.sync.as_ref(), doc_id, &update).await?;
    Ok(StatusCode::NO_CONTENT)
}
