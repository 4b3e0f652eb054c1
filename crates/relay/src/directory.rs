// Organization directory: sign-up, invite codes, membership listing.

use chrono::Utc;
use folio_common::{
    protocol::rest::{SignUpJoinOrgRequest, SignUpResult, SignUpWithOrgRequest},
    types::{CurrentUser, MemberSummary, Role},
};
use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        password::hash_password,
        session::{issue_session, resolve_session, SessionPolicy},
    },
    error::AccessError,
    store::{OrganizationRecord, Store, StoreError, UniqueKey, UserRecord},
    validation,
};

pub const INVITE_CODE_LEN: usize = 6;
pub const MAX_INVITE_CODE_ATTEMPTS: usize = 8;

const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_CODE_LEN)
        .map(|_| char::from(INVITE_CODE_ALPHABET[rng.gen_range(0..INVITE_CODE_ALPHABET.len())]))
        .collect()
}

/// Codes are matched case-insensitively; stored codes are always uppercase.
pub fn normalize_invite_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

struct SignUpFields {
    email: String,
    name: String,
}

async fn prepare_sign_up(
    store: &Store,
    email: &str,
    name: &str,
    password: &str,
) -> Result<SignUpFields, AccessError> {
    let email = validation::email(email)?;
    let name = validation::required_text("name", name, validation::MAX_NAME_CHARS)?;
    validation::password(password)?;

    if store.find_user_by_email(&email).await?.is_some() {
        debug!("sign-up rejected: email already registered");
        return Err(AccessError::DuplicateEmail);
    }

    Ok(SignUpFields { email, name })
}

/// Create a new organization with the caller as its first admin.
pub async fn create_organization_and_admin(
    store: &Store,
    policy: SessionPolicy,
    request: SignUpWithOrgRequest,
) -> Result<SignUpResult, AccessError> {
    create_organization_and_admin_with(store, policy, request, generate_invite_code).await
}

/// As [`create_organization_and_admin`], drawing invite codes from `next_code`.
pub async fn create_organization_and_admin_with<F>(
    store: &Store,
    policy: SessionPolicy,
    request: SignUpWithOrgRequest,
    mut next_code: F,
) -> Result<SignUpResult, AccessError>
where
    F: FnMut() -> String,
{
    let fields = prepare_sign_up(store, &request.email, &request.name, &request.password).await?;
    let org_name =
        validation::required_text("org_name", &request.org_name, validation::MAX_NAME_CHARS)?;
    let password_hash = hash_password(&request.password).await?;

    let now = Utc::now();
    let mut admin = UserRecord {
        id: Uuid::new_v4(),
        email: fields.email,
        name: fields.name,
        password_hash,
        org_id: Uuid::nil(),
        role: Role::Admin,
        created_at: now,
    };

    for attempt in 1..=MAX_INVITE_CODE_ATTEMPTS {
        let organization = OrganizationRecord {
            id: Uuid::new_v4(),
            name: org_name.clone(),
            invite_code: next_code(),
            created_at: now,
        };
        admin.org_id = organization.id;

        match store.create_organization_with_admin(&organization, &admin).await {
            Ok(()) => {
                let session = issue_session(store, policy, admin.id).await?;
                info!(user_id = %admin.id, org_id = %organization.id, "organization created");
                return Ok(SignUpResult {
                    user_id: admin.id,
                    token: session.token,
                    org_id: organization.id,
                    org_code: organization.invite_code,
                });
            }
            Err(StoreError::Conflict(UniqueKey::InviteCode)) => {
                warn!(attempt, "invite code collision, regenerating");
            }
            Err(error) => return Err(error.into()),
        }
    }

    Err(AccessError::Internal(anyhow::anyhow!(
        "could not allocate a unique invite code after {MAX_INVITE_CODE_ATTEMPTS} attempts"
    )))
}

/// Join an existing organization as a member using its invite code.
pub async fn join_organization_by_code(
    store: &Store,
    policy: SessionPolicy,
    request: SignUpJoinOrgRequest,
) -> Result<SignUpResult, AccessError> {
    let fields = prepare_sign_up(store, &request.email, &request.name, &request.password).await?;

    let code = normalize_invite_code(&request.code);
    let Some(organization) = store.find_organization_by_code(&code).await? else {
        debug!("join rejected: unknown invite code");
        return Err(AccessError::InvalidInviteCode);
    };

    let user = UserRecord {
        id: Uuid::new_v4(),
        email: fields.email,
        name: fields.name,
        password_hash: hash_password(&request.password).await?,
        org_id: organization.id,
        role: Role::Member,
        created_at: Utc::now(),
    };
    store.insert_user(&user).await?;

    let session = issue_session(store, policy, user.id).await?;
    info!(user_id = %user.id, org_id = %organization.id, "member joined organization");

    Ok(SignUpResult {
        user_id: user.id,
        token: session.token,
        org_id: organization.id,
        org_code: organization.invite_code,
    })
}

/// Everyone in the caller's organization, in join order. Anonymous callers get nothing.
pub async fn list_members(
    store: &Store,
    token: Option<&str>,
) -> Result<Vec<MemberSummary>, AccessError> {
    let Some(caller) = resolve_session(store, token).await? else {
        return Ok(Vec::new());
    };

    let members = store
        .list_organization_users(caller.org_id)
        .await?
        .into_iter()
        .map(|user| MemberSummary {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        })
        .collect();

    Ok(members)
}

/// The caller's own profile and organization, or `None` when anonymous.
pub async fn current_user(
    store: &Store,
    token: Option<&str>,
) -> Result<Option<CurrentUser>, AccessError> {
    let Some(user) = resolve_session(store, token).await? else {
        return Ok(None);
    };

    let organization = store.get_organization(user.org_id).await?.ok_or_else(|| {
        AccessError::Internal(anyhow::anyhow!("user {} references missing organization", user.id))
    })?;

    Ok(Some(CurrentUser {
        id: user.id,
        email: user.email,
        name: user.name,
        org_id: organization.id,
        org_name: organization.name,
        org_code: organization.invite_code,
        role: user.role,
    }))
}
