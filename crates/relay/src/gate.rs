// Authorization gate for document access.
//
// Tenant scoping always comes from the resolved session. A document in another
// organization is reported exactly like a missing one.

use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::session::resolve_session,
    error::AccessError,
    store::{DocumentRecord, Store, UserRecord},
};

/// Resolve `token` or fail with `Unauthorized`.
pub async fn authenticate(store: &Store, token: Option<&str>) -> Result<UserRecord, AccessError> {
    match resolve_session(store, token).await? {
        Some(user) => Ok(user),
        None => {
            debug!("rejected request without a live session");
            Err(AccessError::Unauthorized)
        }
    }
}

/// A caller together with a document they may read and edit.
#[derive(Debug, Clone)]
pub struct AuthorizedDocument {
    pub caller: UserRecord,
    pub document: DocumentRecord,
}

impl AuthorizedDocument {
    /// Only the creator or an admin of the same organization may delete.
    pub fn ensure_can_delete(&self) -> Result<(), AccessError> {
        if can_delete(&self.caller, &self.document) {
            Ok(())
        } else {
            debug!(
                user_id = %self.caller.id,
                doc_id = %self.document.id,
                "delete rejected: caller is neither creator nor admin"
            );
            Err(AccessError::Forbidden)
        }
    }
}

pub fn can_delete(caller: &UserRecord, document: &DocumentRecord) -> bool {
    document.created_by == caller.id || caller.role.is_admin()
}

/// Authenticate the caller and load `doc_id` inside their organization.
pub async fn authorize_document(
    store: &Store,
    token: Option<&str>,
    doc_id: Uuid,
) -> Result<AuthorizedDocument, AccessError> {
    let caller = authenticate(store, token).await?;
    match store.get_document(doc_id).await? {
        Some(document) if document.org_id == caller.org_id => {
            Ok(AuthorizedDocument { caller, document })
        }
        _ => {
            debug!(user_id = %caller.id, %doc_id, "document outside caller's organization");
            Err(AccessError::Unauthorized)
        }
    }
}

/// Read-side variant of [`authorize_document`]: anonymous, absent and foreign all become `None`.
pub async fn readable_document(
    store: &Store,
    token: Option<&str>,
    doc_id: Uuid,
) -> Result<Option<AuthorizedDocument>, AccessError> {
    match authorize_document(store, token, doc_id).await {
        Ok(authorized) => Ok(Some(authorized)),
        Err(AccessError::Unauthorized) => Ok(None),
        Err(error) => Err(error),
    }
}

/// Whether `token` may read the collaborative body of `doc_id`.
pub async fn check_read(
    store: &Store,
    token: Option<&str>,
    doc_id: Uuid,
) -> Result<bool, AccessError> {
    Ok(readable_document(store, token, doc_id).await?.is_some())
}

/// Whether `token` may write the collaborative body of `doc_id`.
///
/// Any member of the owning organization may edit; only deletion is restricted.
pub async fn check_write(
    store: &Store,
    token: Option<&str>,
    doc_id: Uuid,
) -> Result<bool, AccessError> {
    check_read(store, token, doc_id).await
}
