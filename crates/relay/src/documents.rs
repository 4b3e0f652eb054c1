// Document registry: metadata CRUD scoped to the caller's organization.
//
// Mutations authenticate and run the tenant check before validating input,
// so a foreign caller learns nothing from a malformed request.

use std::collections::HashMap;

use chrono::Utc;
use folio_common::types::DocumentSummary;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::AccessError,
    gate::{authenticate, authorize_document, readable_document},
    store::{DocumentEdit, DocumentRecord, Store},
    sync::DocumentSync,
    validation,
};

pub const UNKNOWN_USER_NAME: &str = "Unknown";

/// Create a document in the caller's organization and return its id.
pub async fn create_document(
    store: &Store,
    sync: &dyn DocumentSync,
    token: Option<&str>,
    title: &str,
) -> Result<Uuid, AccessError> {
    let caller = authenticate(store, token).await?;
    let title = validation::document_title(title)?;

    let now = Utc::now();
    let document = DocumentRecord {
        id: Uuid::new_v4(),
        title,
        content: Some(String::new()),
        org_id: caller.org_id,
        created_by: caller.id,
        last_edited_by: Some(caller.id),
        created_at: now,
        updated_at: now,
    };
    store.insert_document(&document).await?;
    sync.attach(document.id).await?;

    info!(doc_id = %document.id, user_id = %caller.id, org_id = %caller.org_id, "document created");
    Ok(document.id)
}

/// Replace the stored body snapshot of a document.
pub async fn update_document_content(
    store: &Store,
    token: Option<&str>,
    doc_id: Uuid,
    content: String,
) -> Result<(), AccessError> {
    edit_document(store, token, doc_id, |_| Ok(DocumentEdit::Content(content))).await
}

pub async fn update_document_title(
    store: &Store,
    token: Option<&str>,
    doc_id: Uuid,
    title: &str,
) -> Result<(), AccessError> {
    edit_document(store, token, doc_id, |_| {
        validation::document_title(title).map(DocumentEdit::Title)
    })
    .await
}

async fn edit_document<F>(
    store: &Store,
    token: Option<&str>,
    doc_id: Uuid,
    build_edit: F,
) -> Result<(), AccessError>
where
    F: FnOnce(&DocumentRecord) -> Result<DocumentEdit, AccessError>,
{
    let authorized = authorize_document(store, token, doc_id).await?;
    let edit = build_edit(&authorized.document)?;

    let applied = store
        .edit_document(authorized.caller.org_id, doc_id, edit, authorized.caller.id, Utc::now())
        .await?;
    if !applied {
        // Deleted between the check and the write.
        return Err(AccessError::Unauthorized);
    }
    Ok(())
}

/// Delete a document. Only its creator or an admin of the organization may.
pub async fn delete_document(
    store: &Store,
    sync: &dyn DocumentSync,
    token: Option<&str>,
    doc_id: Uuid,
) -> Result<(), AccessError> {
    let authorized = authorize_document(store, token, doc_id).await?;
    authorized.ensure_can_delete()?;

    if !store.delete_document(authorized.caller.org_id, doc_id).await? {
        return Err(AccessError::Unauthorized);
    }
    sync.detach(doc_id).await?;

    info!(%doc_id, user_id = %authorized.caller.id, "document deleted");
    Ok(())
}

/// The caller's organization's documents, newest first. Anonymous callers get nothing.
pub async fn list_documents(
    store: &Store,
    token: Option<&str>,
) -> Result<Vec<DocumentSummary>, AccessError> {
    let caller = match authenticate(store, token).await {
        Ok(caller) => caller,
        Err(AccessError::Unauthorized) => return Ok(Vec::new()),
        Err(error) => return Err(error),
    };

    let documents = store.list_organization_documents(caller.org_id).await?;
    summarize(store, documents).await
}

/// A single document of the caller's organization, or `None`.
pub async fn get_document(
    store: &Store,
    token: Option<&str>,
    doc_id: Uuid,
) -> Result<Option<DocumentSummary>, AccessError> {
    let Some(authorized) = readable_document(store, token, doc_id).await? else {
        return Ok(None);
    };
    Ok(summarize(store, vec![authorized.document]).await?.pop())
}

/// Full collaborative state of a document the caller has passed `check_read` for.
pub async fn sync_state(
    store: &Store,
    sync: &dyn DocumentSync,
    doc_id: Uuid,
) -> Result<Vec<u8>, AccessError> {
    let state = sync.encode_state(doc_id).await?;
    settle_sync_body(store, sync, doc_id).await?;
    Ok(state)
}

/// Merge a client update into a document the caller has passed `check_write` for.
pub async fn merge_sync_update(
    store: &Store,
    sync: &dyn DocumentSync,
    doc_id: Uuid,
    update: &[u8],
) -> Result<(), AccessError> {
    sync.apply_update(doc_id, update).await?;
    settle_sync_body(store, sync, doc_id).await
}

// Sync bodies are recreated on first touch. A delete that lands between the
// access check and the sync call would leave one behind for a missing document.
async fn settle_sync_body(
    store: &Store,
    sync: &dyn DocumentSync,
    doc_id: Uuid,
) -> Result<(), AccessError> {
    if store.get_document(doc_id).await?.is_some() {
        return Ok(());
    }
    sync.detach(doc_id).await?;
    debug!(%doc_id, "sync body dropped: document deleted during the request");
    Err(AccessError::Unauthorized)
}

async fn summarize(
    store: &Store,
    documents: Vec<DocumentRecord>,
) -> Result<Vec<DocumentSummary>, AccessError> {
    let mut user_ids: Vec<Uuid> = documents
        .iter()
        .flat_map(|doc| std::iter::once(doc.created_by).chain(doc.last_edited_by))
        .collect();
    user_ids.sort_unstable();
    user_ids.dedup();

    let names = store.user_names(&user_ids).await?;
    Ok(documents.into_iter().map(|doc| to_summary(doc, &names)).collect())
}

fn to_summary(document: DocumentRecord, names: &HashMap<Uuid, String>) -> DocumentSummary {
    let name_of = |user_id: Option<Uuid>| {
        user_id
            .and_then(|id| names.get(&id).cloned())
            .unwrap_or_else(|| UNKNOWN_USER_NAME.to_owned())
    };

    DocumentSummary {
        id: document.id,
        creator_name: name_of(Some(document.created_by)),
        last_editor_name: name_of(document.last_edited_by),
        title: document.title,
        content: document.content,
        org_id: document.org_id,
        created_by: document.created_by,
        last_edited_by: document.last_edited_by,
        created_at: document.created_at,
        updated_at: document.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use folio_common::protocol::rest::{SignUpJoinOrgRequest, SignUpResult, SignUpWithOrgRequest};

    use yrs::{Doc, ReadTxn, StateVector, Transact};

    use super::*;
    use crate::{
        auth::session::{issue_session_at, SessionPolicy},
        directory::{create_organization_and_admin, join_organization_by_code, list_members},
        gate::{check_read, check_write},
        sync::YrsDocumentSync,
    };

    struct Fixture {
        store: Store,
        sync: YrsDocumentSync,
        admin: SignUpResult,
        member: SignUpResult,
        outsider: SignUpResult,
    }

    async fn fixture() -> Fixture {
        let store = Store::memory();
        let admin = create_organization_and_admin(
            &store,
            SessionPolicy::default(),
            SignUpWithOrgRequest {
                email: "ann@acme.test".to_owned(),
                name: "Ann".to_owned(),
                password: "correct horse".to_owned(),
                org_name: "Acme".to_owned(),
            },
        )
        .await
        .expect("admin sign-up should succeed");
        let member = join_organization_by_code(
            &store,
            SessionPolicy::default(),
            SignUpJoinOrgRequest {
                email: "bob@acme.test".to_owned(),
                name: "Bob".to_owned(),
                password: "correct horse".to_owned(),
                code: admin.org_code.clone(),
            },
        )
        .await
        .expect("member join should succeed");
        let outsider = create_organization_and_admin(
            &store,
            SessionPolicy::default(),
            SignUpWithOrgRequest {
                email: "gil@globex.test".to_owned(),
                name: "Gil".to_owned(),
                password: "correct horse".to_owned(),
                org_name: "Globex".to_owned(),
            },
        )
        .await
        .expect("outsider sign-up should succeed");

        Fixture { store, sync: YrsDocumentSync::new(), admin, member, outsider }
    }

    #[tokio::test]
    async fn created_document_starts_empty_and_attributed_to_creator() {
        let f = fixture().await;
        let doc_id = create_document(&f.store, &f.sync, Some(&f.member.token), "  Notes ")
            .await
            .expect("create should succeed");

        let doc = get_document(&f.store, Some(&f.member.token), doc_id)
            .await
            .expect("get should succeed")
            .expect("document should be visible");
        assert_eq!(doc.title, "Notes");
        assert_eq!(doc.content.as_deref(), Some(""));
        assert_eq!(doc.org_id, f.member.org_id);
        assert_eq!(doc.created_by, f.member.user_id);
        assert_eq!(doc.last_edited_by, Some(f.member.user_id));
        assert_eq!(doc.creator_name, "Bob");
        assert_eq!(doc.last_editor_name, "Bob");
        assert_eq!(doc.created_at, doc.updated_at);
        assert!(f.sync.is_attached(doc_id).await);
    }

    #[tokio::test]
    async fn anonymous_create_is_unauthorized() {
        let f = fixture().await;
        let error = create_document(&f.store, &f.sync, None, "Notes")
            .await
            .expect_err("anonymous create should fail");
        assert!(matches!(error, AccessError::Unauthorized));
    }

    #[tokio::test]
    async fn invalid_title_is_rejected_after_authentication() {
        let f = fixture().await;
        let error = create_document(&f.store, &f.sync, Some(&f.admin.token), "   ")
            .await
            .expect_err("blank title should fail");
        assert!(matches!(error, AccessError::Validation(_)));

        let error = create_document(&f.store, &f.sync, Some("bogus"), "   ")
            .await
            .expect_err("anonymous caller should fail first");
        assert!(matches!(error, AccessError::Unauthorized));
    }

    #[tokio::test]
    async fn edits_stamp_editor_and_time() {
        let f = fixture().await;
        let doc_id =
            create_document(&f.store, &f.sync, Some(&f.admin.token), "Plan").await.unwrap();
        let before = get_document(&f.store, Some(&f.admin.token), doc_id).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        update_document_content(&f.store, Some(&f.member.token), doc_id, "<p>hi</p>".to_owned())
            .await
            .expect("member may edit content");

        let after = get_document(&f.store, Some(&f.admin.token), doc_id).await.unwrap().unwrap();
        assert_eq!(after.content.as_deref(), Some("<p>hi</p>"));
        assert_eq!(after.last_edited_by, Some(f.member.user_id));
        assert_eq!(after.last_editor_name, "Bob");
        assert_eq!(after.creator_name, "Ann");
        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn cross_tenant_access_is_indistinguishable_from_absence() {
        let f = fixture().await;
        let doc_id =
            create_document(&f.store, &f.sync, Some(&f.admin.token), "Plan").await.unwrap();
        let outsider = Some(f.outsider.token.as_str());

        assert!(get_document(&f.store, outsider, doc_id).await.unwrap().is_none());
        assert!(list_documents(&f.store, outsider).await.unwrap().is_empty());
        assert!(matches!(
            update_document_title(&f.store, outsider, doc_id, "Pwned").await,
            Err(AccessError::Unauthorized)
        ));
        assert!(matches!(
            update_document_content(&f.store, outsider, doc_id, "x".to_owned()).await,
            Err(AccessError::Unauthorized)
        ));
        assert!(matches!(
            delete_document(&f.store, &f.sync, outsider, doc_id).await,
            Err(AccessError::Unauthorized)
        ));
        assert!(matches!(
            update_document_title(&f.store, outsider, Uuid::new_v4(), "Pwned").await,
            Err(AccessError::Unauthorized)
        ));

        let doc = get_document(&f.store, Some(&f.admin.token), doc_id).await.unwrap().unwrap();
        assert_eq!(doc.title, "Plan");
    }

    #[tokio::test]
    async fn delete_requires_creator_or_admin() {
        let f = fixture().await;
        let admins_doc =
            create_document(&f.store, &f.sync, Some(&f.admin.token), "Admin's").await.unwrap();
        let members_doc =
            create_document(&f.store, &f.sync, Some(&f.member.token), "Bob's").await.unwrap();

        let error = delete_document(&f.store, &f.sync, Some(&f.member.token), admins_doc)
            .await
            .expect_err("member may not delete someone else's document");
        assert!(matches!(error, AccessError::Forbidden));

        delete_document(&f.store, &f.sync, Some(&f.member.token), members_doc)
            .await
            .expect("creator may delete");
        delete_document(&f.store, &f.sync, Some(&f.admin.token), admins_doc)
            .await
            .expect("admin may delete");

        assert!(list_documents(&f.store, Some(&f.admin.token)).await.unwrap().is_empty());
        assert!(!f.sync.is_attached(admins_doc).await);
    }

    #[tokio::test]
    async fn admin_may_delete_a_members_document() {
        let f = fixture().await;
        let members_doc =
            create_document(&f.store, &f.sync, Some(&f.member.token), "Bob's").await.unwrap();

        delete_document(&f.store, &f.sync, Some(&f.admin.token), members_doc)
            .await
            .expect("admin may delete any document in the organization");
        assert!(get_document(&f.store, Some(&f.member.token), members_doc).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let f = fixture().await;
        let first = create_document(&f.store, &f.sync, Some(&f.admin.token), "First").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second =
            create_document(&f.store, &f.sync, Some(&f.member.token), "Second").await.unwrap();

        let ids: Vec<Uuid> = list_documents(&f.store, Some(&f.member.token))
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn anonymous_reads_degrade_to_empty() {
        let f = fixture().await;
        let doc_id =
            create_document(&f.store, &f.sync, Some(&f.admin.token), "Plan").await.unwrap();

        assert!(list_documents(&f.store, None).await.unwrap().is_empty());
        assert!(get_document(&f.store, None, doc_id).await.unwrap().is_none());
        assert!(get_document(&f.store, Some("expired-or-bogus"), doc_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_users_render_as_unknown() {
        let f = fixture().await;
        let doc_id =
            create_document(&f.store, &f.sync, Some(&f.member.token), "Orphan").await.unwrap();

        let Store::Memory(inner) = &f.store else { unreachable!() };
        inner.write().await.forget_user(f.member.user_id);

        let doc = get_document(&f.store, Some(&f.admin.token), doc_id).await.unwrap().unwrap();
        assert_eq!(doc.creator_name, UNKNOWN_USER_NAME);
        assert_eq!(doc.last_editor_name, UNKNOWN_USER_NAME);
    }

    fn empty_update() -> Vec<u8> {
        let doc = Doc::new();
        let txn = doc.transact();
        txn.encode_state_as_update_v1(&StateVector::default())
    }

    #[tokio::test]
    async fn expired_session_is_treated_as_anonymous() {
        let f = fixture().await;
        let doc_id =
            create_document(&f.store, &f.sync, Some(&f.admin.token), "Plan").await.unwrap();
        let stale = issue_session_at(
            &f.store,
            SessionPolicy::with_ttl_days(1),
            f.admin.user_id,
            Utc::now() - chrono::Duration::days(2),
        )
        .await
        .expect("stale session should be stored");
        let token = Some(stale.token.as_str());

        assert!(matches!(
            update_document_title(&f.store, token, doc_id, "Stale").await,
            Err(AccessError::Unauthorized)
        ));
        assert!(matches!(
            update_document_content(&f.store, token, doc_id, "stale".to_owned()).await,
            Err(AccessError::Unauthorized)
        ));
        assert!(matches!(
            delete_document(&f.store, &f.sync, token, doc_id).await,
            Err(AccessError::Unauthorized)
        ));
        assert!(matches!(
            create_document(&f.store, &f.sync, token, "Stale").await,
            Err(AccessError::Unauthorized)
        ));
        assert!(list_documents(&f.store, token).await.unwrap().is_empty());
        assert!(get_document(&f.store, token, doc_id).await.unwrap().is_none());
        assert!(list_members(&f.store, token).await.unwrap().is_empty());
        assert!(!check_read(&f.store, token, doc_id).await.unwrap());

        let doc = get_document(&f.store, Some(&f.admin.token), doc_id).await.unwrap().unwrap();
        assert_eq!(doc.title, "Plan");
        assert_eq!(doc.content.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn sync_on_a_live_document_keeps_its_body() {
        let f = fixture().await;
        let doc_id =
            create_document(&f.store, &f.sync, Some(&f.member.token), "Plan").await.unwrap();

        merge_sync_update(&f.store, &f.sync, doc_id, &empty_update())
            .await
            .expect("update should merge");
        sync_state(&f.store, &f.sync, doc_id).await.expect("state should encode");
        assert!(f.sync.is_attached(doc_id).await);
    }

    #[tokio::test]
    async fn sync_losing_a_race_with_delete_leaves_no_body_behind() {
        let f = fixture().await;
        let doc_id =
            create_document(&f.store, &f.sync, Some(&f.member.token), "Plan").await.unwrap();
        assert!(check_write(&f.store, Some(&f.member.token), doc_id).await.unwrap());

        delete_document(&f.store, &f.sync, Some(&f.admin.token), doc_id)
            .await
            .expect("admin may delete");

        let error = merge_sync_update(&f.store, &f.sync, doc_id, &empty_update())
            .await
            .expect_err("update for a deleted document should fail");
        assert!(matches!(error, AccessError::Unauthorized));
        assert!(!f.sync.is_attached(doc_id).await);

        let error = sync_state(&f.store, &f.sync, doc_id)
            .await
            .expect_err("state of a deleted document should fail");
        assert!(matches!(error, AccessError::Unauthorized));
        assert!(!f.sync.is_attached(doc_id).await);
    }
}
