use axum::{extract::State, http::StatusCode, Json};
use folio_common::protocol::rest::{
    CurrentUserEnvelope, SignInRequest, SignInResult, SignUpJoinOrgRequest, SignUpResult,
    SignUpWithOrgRequest,
};

use super::ApiState;
use crate::{
    auth::{lifecycle, middleware::BearerToken},
    directory,
    error::AccessError,
    validation::ValidatedJson,
};

pub(super) async fn sign_up_with_org(
    State(state): State<ApiState>,
    ValidatedJson(payload): ValidatedJson<SignUpWithOrgRequest>,
) -> Result<(StatusCode, Json<SignUpResult>), AccessError> {
    let result =
        directory::create_organization_and_admin(&state.store, state.sessions, payload).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub(super) async fn sign_up_join(
    State(state): State<ApiState>,
    ValidatedJson(payload): ValidatedJson<SignUpJoinOrgRequest>,
) -> Result<(StatusCode, Json<SignUpResult>), AccessError> {
    let result = directory::join_organization_by_code(&state.store, state.sessions, payload).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub(super) async fn sign_in(
    State(state): State<ApiState>,
    ValidatedJson(payload): ValidatedJson<SignInRequest>,
) -> Result<Json<SignInResult>, AccessError> {
    let result =
        lifecycle::sign_in(&state.store, state.sessions, &payload.email, &payload.password).await?;
    Ok(Json(result))
}

pub(super) async fn sign_out(
    State(state): State<ApiState>,
    token: BearerToken,
) -> Result<StatusCode, AccessError> {
    lifecycle::sign_out(&state.store, token.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn current_user(
    State(state): State<ApiState>,
    token: BearerToken,
) -> Result<Json<CurrentUserEnvelope>, AccessError> {
    let user = directory::current_user(&state.store, token.as_deref()).await?;
    Ok(Json(CurrentUserEnvelope { user }))
}
