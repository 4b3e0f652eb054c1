use std::collections::HashMap;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use folio_common::types::Role;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    DocumentEdit, DocumentRecord, OrganizationRecord, SessionRecord, StoreError, UniqueKey,
    UserRecord,
};

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    invite_code: String,
    created_at: DateTime<Utc>,
}

impl From<OrganizationRow> for OrganizationRecord {
    fn from(value: OrganizationRow) -> Self {
        Self {
            id: value.id,
            name: value.name,
            invite_code: value.invite_code,
            created_at: value.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    org_id: Uuid,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = StoreError;

    fn try_from(value: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_db_value(&value.role)
            .ok_or_else(|| anyhow!("invalid role '{}' in database", value.role))?;
        Ok(Self {
            id: value.id,
            email: value.email,
            name: value.name,
            password_hash: value.password_hash,
            org_id: value.org_id,
            role,
            created_at: value.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    token_hash: Vec<u8>,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for SessionRecord {
    fn from(value: SessionRow) -> Self {
        Self {
            token_hash: value.token_hash,
            user_id: value.user_id,
            created_at: value.created_at,
            expires_at: value.expires_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    title: String,
    content: Option<String>,
    org_id: Uuid,
    created_by: Uuid,
    last_edited_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for DocumentRecord {
    fn from(value: DocumentRow) -> Self {
        Self {
            id: value.id,
            title: value.title,
            content: value.content,
            org_id: value.org_id,
            created_by: value.created_by,
            last_edited_by: value.last_edited_by,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

const USER_COLUMNS: &str = "id, email, name, password_hash, org_id, role, created_at";
const DOCUMENT_COLUMNS: &str =
    "id, title, content, org_id, created_by, last_edited_by, created_at, updated_at";

// ── Organizations and users ────────────────────────────────────────

pub(super) async fn find_user_by_email_pg(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserRecord>, StoreError> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(map_sqlx_error)?
        .map(UserRecord::try_from)
        .transpose()
}

pub(super) async fn get_user_pg(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<UserRecord>, StoreError> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(map_sqlx_error)?
        .map(UserRecord::try_from)
        .transpose()
}

pub(super) async fn user_names_pg(
    pool: &PgPool,
    user_ids: &[Uuid],
) -> Result<HashMap<Uuid, String>, StoreError> {
    let rows = sqlx::query_as::<_, (Uuid, String)>("SELECT id, name FROM users WHERE id = ANY($1)")
        .bind(user_ids)
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_error)?;

    Ok(rows.into_iter().collect())
}

pub(super) async fn get_organization_pg(
    pool: &PgPool,
    org_id: Uuid,
) -> Result<Option<OrganizationRecord>, StoreError> {
    let row = sqlx::query_as::<_, OrganizationRow>(
        "SELECT id, name, invite_code, created_at FROM organizations WHERE id = $1",
    )
    .bind(org_id)
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx_error)?;

    Ok(row.map(OrganizationRecord::from))
}

pub(super) async fn find_organization_by_code_pg(
    pool: &PgPool,
    invite_code: &str,
) -> Result<Option<OrganizationRecord>, StoreError> {
    let row = sqlx::query_as::<_, OrganizationRow>(
        "SELECT id, name, invite_code, created_at FROM organizations WHERE invite_code = $1",
    )
    .bind(invite_code)
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx_error)?;

    Ok(row.map(OrganizationRecord::from))
}

pub(super) async fn create_organization_with_admin_pg(
    pool: &PgPool,
    organization: &OrganizationRecord,
    admin: &UserRecord,
) -> Result<(), StoreError> {
    let mut tx = pool.begin().await.map_err(map_sqlx_error)?;

    sqlx::query(
        r#"
        INSERT INTO organizations (id, name, invite_code, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(organization.id)
    .bind(&organization.name)
    .bind(&organization.invite_code)
    .bind(organization.created_at)
    .execute(&mut *tx)
    .await
    .map_err(map_sqlx_error)?;

    insert_user_query(admin).execute(&mut *tx).await.map_err(map_sqlx_error)?;

    tx.commit().await.map_err(map_sqlx_error)
}

pub(super) async fn insert_user_pg(pool: &PgPool, user: &UserRecord) -> Result<(), StoreError> {
    insert_user_query(user).execute(pool).await.map_err(map_sqlx_error)?;
    Ok(())
}

fn insert_user_query(
    user: &UserRecord,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, password_hash, org_id, role, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.password_hash)
    .bind(user.org_id)
    .bind(user.role.as_str())
    .bind(user.created_at)
}

pub(super) async fn list_organization_users_pg(
    pool: &PgPool,
    org_id: Uuid,
) -> Result<Vec<UserRecord>, StoreError> {
    sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE org_id = $1 ORDER BY created_at ASC, id ASC"
    ))
    .bind(org_id)
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_error)?
    .into_iter()
    .map(UserRecord::try_from)
    .collect()
}

// ── Sessions ───────────────────────────────────────────────────────

pub(super) async fn insert_session_pg(
    pool: &PgPool,
    session: &SessionRecord,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&session.token_hash)
    .bind(session.user_id)
    .bind(session.created_at)
    .bind(session.expires_at)
    .execute(pool)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

pub(super) async fn find_session_pg(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<SessionRecord>, StoreError> {
    let row = sqlx::query_as::<_, SessionRow>(
        "SELECT token_hash, user_id, created_at, expires_at FROM sessions WHERE token_hash = $1",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx_error)?;

    Ok(row.map(SessionRecord::from))
}

pub(super) async fn delete_session_pg(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
        .bind(token_hash)
        .execute(pool)
        .await
        .map_err(map_sqlx_error)?;

    Ok(result.rows_affected() > 0)
}

pub(super) async fn purge_expired_sessions_pg(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
        .bind(now)
        .execute(pool)
        .await
        .map_err(map_sqlx_error)?;

    Ok(result.rows_affected())
}

// ── Documents ──────────────────────────────────────────────────────

pub(super) async fn insert_document_pg(
    pool: &PgPool,
    document: &DocumentRecord,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO documents
            (id, title, content, org_id, created_by, last_edited_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(document.id)
    .bind(&document.title)
    .bind(&document.content)
    .bind(document.org_id)
    .bind(document.created_by)
    .bind(document.last_edited_by)
    .bind(document.created_at)
    .bind(document.updated_at)
    .execute(pool)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

pub(super) async fn get_document_pg(
    pool: &PgPool,
    doc_id: Uuid,
) -> Result<Option<DocumentRecord>, StoreError> {
    let row = sqlx::query_as::<_, DocumentRow>(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"
    ))
    .bind(doc_id)
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx_error)?;

    Ok(row.map(DocumentRecord::from))
}

pub(super) async fn list_organization_documents_pg(
    pool: &PgPool,
    org_id: Uuid,
) -> Result<Vec<DocumentRecord>, StoreError> {
    let rows = sqlx::query_as::<_, DocumentRow>(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE org_id = $1 \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(org_id)
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_error)?;

    Ok(rows.into_iter().map(DocumentRecord::from).collect())
}

pub(super) async fn edit_document_pg(
    pool: &PgPool,
    org_id: Uuid,
    doc_id: Uuid,
    edit: &DocumentEdit,
    editor: Uuid,
    now: DateTime<Utc>,
) -> Result<bool, StoreError> {
    let (column, value) = match edit {
        DocumentEdit::Content(content) => ("content", content.as_str()),
        DocumentEdit::Title(title) => ("title", title.as_str()),
    };

    let result = sqlx::query(&format!(
        r#"
        UPDATE documents
        SET {column} = $3, last_edited_by = $4, updated_at = $5
        WHERE id = $1 AND org_id = $2
        "#
    ))
    .bind(doc_id)
    .bind(org_id)
    .bind(value)
    .bind(editor)
    .bind(now)
    .execute(pool)
    .await
    .map_err(map_sqlx_error)?;

    Ok(result.rows_affected() > 0)
}

pub(super) async fn delete_document_pg(
    pool: &PgPool,
    org_id: Uuid,
    doc_id: Uuid,
) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND org_id = $2")
        .bind(doc_id)
        .bind(org_id)
        .execute(pool)
        .await
        .map_err(map_sqlx_error)?;

    Ok(result.rows_affected() > 0)
}

fn map_sqlx_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(database_error) = &error {
        if database_error.code().as_deref() == Some("23505") {
            return StoreError::Conflict(unique_key_for_constraint(database_error.constraint()));
        }
    }

    StoreError::Internal(error.into())
}

fn unique_key_for_constraint(constraint: Option<&str>) -> UniqueKey {
    match constraint {
        Some("users_email_key") => UniqueKey::Email,
        Some("organizations_invite_code_key") => UniqueKey::InviteCode,
        Some("sessions_pkey") => UniqueKey::SessionToken,
        _ => UniqueKey::Other,
    }
}
