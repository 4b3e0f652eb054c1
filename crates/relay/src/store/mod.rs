// Identity store: organizations, users, sessions and document metadata.
//
// Two backends sit behind one enum. Every operation dispatches to a
// `*_pg` or `*_memory` function; callers never see which one is live.

mod memory;
mod postgres;

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use folio_common::types::Role;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

pub use memory::MemoryStore;

#[derive(Clone)]
pub enum Store {
    Postgres(PgPool),
    Memory(Arc<RwLock<MemoryStore>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationRecord {
    pub id: Uuid,
    pub name: String,
    pub invite_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub org_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A persisted session. Only the SHA-256 of the bearer token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token_hash: Vec<u8>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub org_id: Uuid,
    pub created_by: Uuid,
    pub last_edited_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A metadata edit applied to one document inside one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEdit {
    Content(String),
    Title(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    Email,
    InviteCode,
    SessionToken,
    Other,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0:?}")]
    Conflict(UniqueKey),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(Arc::new(RwLock::new(MemoryStore::default())))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    // ── Organizations and users ────────────────────────────────────

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::find_user_by_email_pg(pool, email).await,
            Self::Memory(store) => Ok(store.read().await.find_user_by_email(email)),
        }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::get_user_pg(pool, user_id).await,
            Self::Memory(store) => Ok(store.read().await.get_user(user_id)),
        }
    }

    /// Display names for the given user ids. Unknown ids are simply absent.
    pub async fn user_names(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        match self {
            Self::Postgres(pool) => postgres::user_names_pg(pool, user_ids).await,
            Self::Memory(store) => Ok(store.read().await.user_names(user_ids)),
        }
    }

    pub async fn get_organization(
        &self,
        org_id: Uuid,
    ) -> Result<Option<OrganizationRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::get_organization_pg(pool, org_id).await,
            Self::Memory(store) => Ok(store.read().await.get_organization(org_id)),
        }
    }

    pub async fn find_organization_by_code(
        &self,
        invite_code: &str,
    ) -> Result<Option<OrganizationRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::find_organization_by_code_pg(pool, invite_code).await,
            Self::Memory(store) => Ok(store.read().await.find_organization_by_code(invite_code)),
        }
    }

    /// Insert an organization and its first admin atomically.
    ///
    /// Fails with `Conflict(Email)` or `Conflict(InviteCode)` without writing anything.
    pub async fn create_organization_with_admin(
        &self,
        organization: &OrganizationRecord,
        admin: &UserRecord,
    ) -> Result<(), StoreError> {
        match self {
            Self::Postgres(pool) => {
                postgres::create_organization_with_admin_pg(pool, organization, admin).await
            }
            Self::Memory(store) => {
                store.write().await.create_organization_with_admin(organization, admin)
            }
        }
    }

    pub async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        match self {
            Self::Postgres(pool) => postgres::insert_user_pg(pool, user).await,
            Self::Memory(store) => store.write().await.insert_user(user),
        }
    }

    /// Members of one organization in join order.
    pub async fn list_organization_users(
        &self,
        org_id: Uuid,
    ) -> Result<Vec<UserRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::list_organization_users_pg(pool, org_id).await,
            Self::Memory(store) => Ok(store.read().await.list_organization_users(org_id)),
        }
    }

    // ── Sessions ───────────────────────────────────────────────────

    pub async fn insert_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        match self {
            Self::Postgres(pool) => postgres::insert_session_pg(pool, session).await,
            Self::Memory(store) => store.write().await.insert_session(session),
        }
    }

    pub async fn find_session(
        &self,
        token_hash: &[u8],
    ) -> Result<Option<SessionRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::find_session_pg(pool, token_hash).await,
            Self::Memory(store) => Ok(store.read().await.find_session(token_hash)),
        }
    }

    /// Returns whether a session was removed.
    pub async fn delete_session(&self, token_hash: &[u8]) -> Result<bool, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::delete_session_pg(pool, token_hash).await,
            Self::Memory(store) => Ok(store.write().await.delete_session(token_hash)),
        }
    }

    /// Drop every session with `expires_at <= now`. Returns how many were removed.
    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::purge_expired_sessions_pg(pool, now).await,
            Self::Memory(store) => Ok(store.write().await.purge_expired_sessions(now)),
        }
    }

    // ── Documents ──────────────────────────────────────────────────

    pub async fn insert_document(&self, document: &DocumentRecord) -> Result<(), StoreError> {
        match self {
            Self::Postgres(pool) => postgres::insert_document_pg(pool, document).await,
            Self::Memory(store) => {
                store.write().await.insert_document(document);
                Ok(())
            }
        }
    }

    pub async fn get_document(&self, doc_id: Uuid) -> Result<Option<DocumentRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::get_document_pg(pool, doc_id).await,
            Self::Memory(store) => Ok(store.read().await.get_document(doc_id)),
        }
    }

    /// Documents of one organization, newest first (ties by id, descending).
    pub async fn list_organization_documents(
        &self,
        org_id: Uuid,
    ) -> Result<Vec<DocumentRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::list_organization_documents_pg(pool, org_id).await,
            Self::Memory(store) => Ok(store.read().await.list_organization_documents(org_id)),
        }
    }

    /// Apply `edit` to a document of `org_id`, stamping the editor and time.
    ///
    /// Returns `false` when no such document exists inside the organization.
    pub async fn edit_document(
        &self,
        org_id: Uuid,
        doc_id: Uuid,
        edit: DocumentEdit,
        editor: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        match self {
            Self::Postgres(pool) => {
                postgres::edit_document_pg(pool, org_id, doc_id, &edit, editor, now).await
            }
            Self::Memory(store) => {
                Ok(store.write().await.edit_document(org_id, doc_id, edit, editor, now))
            }
        }
    }

    /// Returns `false` when no such document exists inside the organization.
    pub async fn delete_document(&self, org_id: Uuid, doc_id: Uuid) -> Result<bool, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::delete_document_pg(pool, org_id, doc_id).await,
            Self::Memory(store) => Ok(store.write().await.delete_document(org_id, doc_id)),
        }
    }
}
