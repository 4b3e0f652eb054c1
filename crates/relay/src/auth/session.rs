// Opaque bearer sessions.
//
// A token is 32 random bytes, base64url without padding. Only its SHA-256 is
// stored, so a leaked sessions table cannot be replayed.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::store::{SessionRecord, Store, StoreError, UniqueKey, UserRecord};

const SESSION_TOKEN_BYTES: usize = 32;
const MAX_TOKEN_ATTEMPTS: usize = 3;

pub const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

/// How long issued sessions stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub ttl: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self { ttl: Duration::days(DEFAULT_SESSION_TTL_DAYS) }
    }
}

impl SessionPolicy {
    pub fn with_ttl_days(days: i64) -> Self {
        Self { ttl: Duration::days(days) }
    }
}

/// A freshly issued session. `token` is handed to the caller exactly once.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn hash_session_token(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}

pub async fn issue_session(
    store: &Store,
    policy: SessionPolicy,
    user_id: Uuid,
) -> Result<IssuedSession, StoreError> {
    issue_session_at(store, policy, user_id, Utc::now()).await
}

pub async fn issue_session_at(
    store: &Store,
    policy: SessionPolicy,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<IssuedSession, StoreError> {
    let expires_at = now + policy.ttl;
    let mut attempts = 0;
    loop {
        attempts += 1;
        let token = generate_session_token();
        let record = SessionRecord {
            token_hash: hash_session_token(&token),
            user_id,
            created_at: now,
            expires_at,
        };
        match store.insert_session(&record).await {
            Ok(()) => return Ok(IssuedSession { token, expires_at }),
            Err(StoreError::Conflict(UniqueKey::SessionToken)) if attempts < MAX_TOKEN_ATTEMPTS => {
                continue
            }
            Err(error) => return Err(error),
        }
    }
}

/// Resolve a bearer token to its live user.
///
/// Absent, blank, unknown and expired tokens all resolve to `None`; only
/// storage failures are errors.
pub async fn resolve_session(
    store: &Store,
    token: Option<&str>,
) -> Result<Option<UserRecord>, StoreError> {
    resolve_session_at(store, token, Utc::now()).await
}

pub async fn resolve_session_at(
    store: &Store,
    token: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<UserRecord>, StoreError> {
    let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) else {
        return Ok(None);
    };

    let Some(session) = store.find_session(&hash_session_token(token)).await? else {
        return Ok(None);
    };

    if !session.is_live_at(now) {
        debug!(user_id = %session.user_id, "rejected expired session");
        return Ok(None);
    }

    store.get_user(session.user_id).await
}

/// Delete the session behind `token`, if any. Returns whether one existed.
pub async fn revoke_session(store: &Store, token: &str) -> Result<bool, StoreError> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(false);
    }
    store.delete_session(&hash_session_token(token)).await
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use chrono::{Duration, Utc};
    use folio_common::types::Role;
    use uuid::Uuid;

    use super::*;
    use crate::store::{OrganizationRecord, Store, UserRecord};

    async fn store_with_user() -> (Store, UserRecord) {
        let store = Store::memory();
        let organization = OrganizationRecord {
            id: Uuid::new_v4(),
            name: "Acme".to_owned(),
            invite_code: "ACME01".to_owned(),
            created_at: Utc::now(),
        };
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: "ann@acme.test".to_owned(),
            name: "Ann".to_owned(),
            password_hash: "unused".to_owned(),
            org_id: organization.id,
            role: Role::Admin,
            created_at: Utc::now(),
        };
        store
            .create_organization_with_admin(&organization, &user)
            .await
            .expect("fixture organization should insert");
        (store, user)
    }

    #[test]
    fn tokens_are_32_bytes_url_safe() {
        let token = generate_session_token();
        let decoded = URL_SAFE_NO_PAD.decode(&token).expect("token should be base64url");
        assert_eq!(decoded.len(), 32);
        assert!(!token.contains('='));
        assert_ne!(token, generate_session_token());
    }

    #[test]
    fn token_hash_is_sha256() {
        assert_eq!(hash_session_token("abc").len(), 32);
        assert_eq!(hash_session_token("abc"), hash_session_token("abc"));
        assert_ne!(hash_session_token("abc"), hash_session_token("abd"));
    }

    #[tokio::test]
    async fn absent_and_blank_tokens_resolve_to_none() {
        let (store, _) = store_with_user().await;
        assert!(resolve_session(&store, None).await.expect("resolve").is_none());
        assert!(resolve_session(&store, Some("   ")).await.expect("resolve").is_none());
        assert!(resolve_session(&store, Some("not-a-token")).await.expect("resolve").is_none());
    }

    #[tokio::test]
    async fn token_resolves_until_expiry_instant() {
        let (store, user) = store_with_user().await;
        let issued_at = Utc::now();
        let session = issue_session_at(&store, SessionPolicy::default(), user.id, issued_at)
            .await
            .expect("session should issue");
        assert_eq!(session.expires_at, issued_at + Duration::days(7));

        let just_before = session.expires_at - Duration::milliseconds(1);
        let resolved = resolve_session_at(&store, Some(&session.token), just_before)
            .await
            .expect("resolve should succeed");
        assert_eq!(resolved.map(|user| user.id), Some(user.id));

        let at_expiry = resolve_session_at(&store, Some(&session.token), session.expires_at)
            .await
            .expect("resolve should succeed");
        assert!(at_expiry.is_none(), "now >= expires_at must not resolve");
    }

    #[tokio::test]
    async fn only_the_token_hash_is_persisted() {
        let (store, user) = store_with_user().await;
        let session =
            issue_session(&store, SessionPolicy::default(), user.id).await.expect("issue");

        let Store::Memory(inner) = &store else { unreachable!() };
        let stored = inner
            .read()
            .await
            .find_session(&hash_session_token(&session.token))
            .expect("session should be stored under its hash");
        assert_ne!(stored.token_hash, session.token.as_bytes());
    }

    #[tokio::test]
    async fn revoked_token_no_longer_resolves() {
        let (store, user) = store_with_user().await;
        let session =
            issue_session(&store, SessionPolicy::default(), user.id).await.expect("issue");

        assert!(revoke_session(&store, &session.token).await.expect("revoke"));
        assert!(!revoke_session(&store, &session.token).await.expect("second revoke"));
        assert!(resolve_session(&store, Some(&session.token)).await.expect("resolve").is_none());
    }

    #[tokio::test]
    async fn session_of_vanished_user_resolves_to_none() {
        let (store, user) = store_with_user().await;
        let session =
            issue_session(&store, SessionPolicy::default(), user.id).await.expect("issue");

        let Store::Memory(inner) = &store else { unreachable!() };
        inner.write().await.forget_user(user.id);

        assert!(resolve_session(&store, Some(&session.token)).await.expect("resolve").is_none());
    }

    #[tokio::test]
    async fn concurrent_sessions_are_independent() {
        let (store, user) = store_with_user().await;
        let first = issue_session(&store, SessionPolicy::default(), user.id).await.expect("issue");
        let second = issue_session(&store, SessionPolicy::default(), user.id).await.expect("issue");

        revoke_session(&store, &first.token).await.expect("revoke");
        assert!(resolve_session(&store, Some(&second.token)).await.expect("resolve").is_some());
    }
}
