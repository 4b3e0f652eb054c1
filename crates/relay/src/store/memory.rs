use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    DocumentEdit, DocumentRecord, OrganizationRecord, SessionRecord, StoreError, UniqueKey,
    UserRecord,
};

/// In-process backend used by tests and local development.
///
/// Mirrors the Postgres unique constraints: email, invite code and session
/// token hash. Callers hold the surrounding `RwLock` write guard for the
/// whole of any multi-record write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    organizations: HashMap<Uuid, OrganizationRecord>,
    invite_codes: HashMap<String, Uuid>,
    users: HashMap<Uuid, UserRecord>,
    emails: HashMap<String, Uuid>,
    sessions: HashMap<Vec<u8>, SessionRecord>,
    documents: HashMap<Uuid, DocumentRecord>,
}

impl MemoryStore {
    pub(crate) fn find_user_by_email(&self, email: &str) -> Option<UserRecord> {
        self.emails.get(email).and_then(|user_id| self.users.get(user_id)).cloned()
    }

    pub(crate) fn get_user(&self, user_id: Uuid) -> Option<UserRecord> {
        self.users.get(&user_id).cloned()
    }

    pub(crate) fn user_names(&self, user_ids: &[Uuid]) -> HashMap<Uuid, String> {
        user_ids
            .iter()
            .filter_map(|user_id| self.users.get(user_id).map(|user| (*user_id, user.name.clone())))
            .collect()
    }

    pub(crate) fn get_organization(&self, org_id: Uuid) -> Option<OrganizationRecord> {
        self.organizations.get(&org_id).cloned()
    }

    pub(crate) fn find_organization_by_code(&self, invite_code: &str) -> Option<OrganizationRecord> {
        self.invite_codes
            .get(invite_code)
            .and_then(|org_id| self.organizations.get(org_id))
            .cloned()
    }

    pub(crate) fn create_organization_with_admin(
        &mut self,
        organization: &OrganizationRecord,
        admin: &UserRecord,
    ) -> Result<(), StoreError> {
        if self.invite_codes.contains_key(&organization.invite_code) {
            return Err(StoreError::Conflict(UniqueKey::InviteCode));
        }
        if self.emails.contains_key(&admin.email) {
            return Err(StoreError::Conflict(UniqueKey::Email));
        }
        if self.organizations.contains_key(&organization.id) || self.users.contains_key(&admin.id) {
            return Err(StoreError::Conflict(UniqueKey::Other));
        }

        self.invite_codes.insert(organization.invite_code.clone(), organization.id);
        self.organizations.insert(organization.id, organization.clone());
        self.emails.insert(admin.email.clone(), admin.id);
        self.users.insert(admin.id, admin.clone());
        Ok(())
    }

    pub(crate) fn insert_user(&mut self, user: &UserRecord) -> Result<(), StoreError> {
        if self.emails.contains_key(&user.email) {
            return Err(StoreError::Conflict(UniqueKey::Email));
        }
        if self.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(UniqueKey::Other));
        }
        if !self.organizations.contains_key(&user.org_id) {
            return Err(StoreError::Internal(anyhow::anyhow!(
                "organization {} does not exist",
                user.org_id
            )));
        }

        self.emails.insert(user.email.clone(), user.id);
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    pub(crate) fn list_organization_users(&self, org_id: Uuid) -> Vec<UserRecord> {
        let mut users: Vec<UserRecord> =
            self.users.values().filter(|user| user.org_id == org_id).cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        users
    }

    pub(crate) fn insert_session(&mut self, session: &SessionRecord) -> Result<(), StoreError> {
        if self.sessions.contains_key(&session.token_hash) {
            return Err(StoreError::Conflict(UniqueKey::SessionToken));
        }
        if !self.users.contains_key(&session.user_id) {
            return Err(StoreError::Internal(anyhow::anyhow!(
                "user {} does not exist",
                session.user_id
            )));
        }
        self.sessions.insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    pub(crate) fn find_session(&self, token_hash: &[u8]) -> Option<SessionRecord> {
        self.sessions.get(token_hash).cloned()
    }

    pub(crate) fn delete_session(&mut self, token_hash: &[u8]) -> bool {
        self.sessions.remove(token_hash).is_some()
    }

    pub(crate) fn purge_expired_sessions(&mut self, now: DateTime<Utc>) -> u64 {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.is_live_at(now));
        (before - self.sessions.len()) as u64
    }

    pub(crate) fn insert_document(&mut self, document: &DocumentRecord) {
        self.documents.insert(document.id, document.clone());
    }

    pub(crate) fn get_document(&self, doc_id: Uuid) -> Option<DocumentRecord> {
        self.documents.get(&doc_id).cloned()
    }

    pub(crate) fn list_organization_documents(&self, org_id: Uuid) -> Vec<DocumentRecord> {
        let mut documents: Vec<DocumentRecord> =
            self.documents.values().filter(|doc| doc.org_id == org_id).cloned().collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        documents
    }

    pub(crate) fn edit_document(
        &mut self,
        org_id: Uuid,
        doc_id: Uuid,
        edit: DocumentEdit,
        editor: Uuid,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(document) = self.documents.get_mut(&doc_id).filter(|doc| doc.org_id == org_id)
        else {
            return false;
        };
        match edit {
            DocumentEdit::Content(content) => document.content = Some(content),
            DocumentEdit::Title(title) => document.title = title,
        }
        document.last_edited_by = Some(editor);
        document.updated_at = now;
        true
    }

    pub(crate) fn delete_document(&mut self, org_id: Uuid, doc_id: Uuid) -> bool {
        match self.documents.get(&doc_id) {
            Some(document) if document.org_id == org_id => {
                self.documents.remove(&doc_id);
                true
            }
            _ => false,
        }
    }

    /// Drop a user row while leaving their sessions and documents behind.
    #[cfg(test)]
    pub(crate) fn forget_user(&mut self, user_id: Uuid) {
        if let Some(user) = self.users.remove(&user_id) {
            self.emails.remove(&user.email);
        }
    }

    #[cfg(test)]
    pub(crate) fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
