pub mod auth;
pub mod documents;
pub mod members;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use folio_common::protocol::rest::{
    ROUTE_DOCUMENT, ROUTE_DOCUMENTS, ROUTE_DOCUMENT_CONTENT, ROUTE_DOCUMENT_SYNC,
    ROUTE_DOCUMENT_TITLE, ROUTE_ME, ROUTE_MEMBERS, ROUTE_SIGNIN, ROUTE_SIGNOUT, ROUTE_SIGNUP_JOIN,
    ROUTE_SIGNUP_ORG,
};

use crate::{auth::session::SessionPolicy, store::Store, sync::DocumentSync};

/// Shared state behind every `/v1` handler.
#[derive(Clone)]
pub struct ApiState {
    pub store: Store,
    pub sync: Arc<dyn DocumentSync>,
    pub sessions: SessionPolicy,
}

impl ApiState {
    pub fn new(store: Store, sync: Arc<dyn DocumentSync>, sessions: SessionPolicy) -> Self {
        Self { store, sync, sessions }
    }
}

/// All `/v1` routes. Authentication is resolved per handler from the bearer
/// token so that read endpoints can answer anonymous callers with empty results.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route(ROUTE_SIGNUP_ORG, post(auth::sign_up_with_org))
        .route(ROUTE_SIGNUP_JOIN, post(auth::sign_up_join))
        .route(ROUTE_SIGNIN, post(auth::sign_in))
        .route(ROUTE_SIGNOUT, post(auth::sign_out))
        .route(ROUTE_ME, get(auth::current_user))
        .route(ROUTE_MEMBERS, get(members::list_members))
        .route(ROUTE_DOCUMENTS, get(documents::list_documents).post(documents::create_document))
        .route(ROUTE_DOCUMENT, get(documents::get_document).delete(documents::delete_document))
        .route(ROUTE_DOCUMENT_CONTENT, put(documents::update_content))
        .route(ROUTE_DOCUMENT_TITLE, put(documents::update_title))
        .route(
            ROUTE_DOCUMENT_SYNC,
            get(documents::read_sync_state).post(documents::apply_sync_update),
        )
        .with_state(state)
}
