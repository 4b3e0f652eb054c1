use axum::{extract::State, Json};
use folio_common::protocol::rest::MembersEnvelope;

use super::ApiState;
use crate::{auth::middleware::BearerToken, directory, error::AccessError};

pub(super) async fn list_members(
    State(state): State<ApiState>,
    token: BearerToken,
) -> Result<Json<MembersEnvelope>, AccessError> {
    let items = directory::list_members(&state.store, token.as_deref()).await?;
    Ok(Json(MembersEnvelope { items }))
}
