use folio_common::protocol::rest::SignInResult;
use tracing::{debug, info};

use crate::{
    auth::{
        password::{verify_against_dummy, verify_password},
        session::{issue_session, revoke_session, SessionPolicy},
    },
    error::AccessError,
    store::Store,
};

/// Exchange email and password for a new session.
///
/// Unknown email and wrong password fail identically. Earlier sessions of the
/// same user stay valid.
pub async fn sign_in(
    store: &Store,
    policy: SessionPolicy,
    email: &str,
    password: &str,
) -> Result<SignInResult, AccessError> {
    let Some(user) = store.find_user_by_email(email.trim()).await? else {
        verify_against_dummy(password).await;
        debug!("sign-in rejected: unknown email");
        return Err(AccessError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash).await? {
        debug!(user_id = %user.id, "sign-in rejected: wrong password");
        return Err(AccessError::InvalidCredentials);
    }

    let session = issue_session(store, policy, user.id).await?;
    info!(user_id = %user.id, org_id = %user.org_id, "user signed in");

    Ok(SignInResult {
        user_id: user.id,
        token: session.token,
        name: user.name,
        org_id: user.org_id,
    })
}

/// End the session behind `token`. Unknown or missing tokens are a no-op.
pub async fn sign_out(store: &Store, token: Option<&str>) -> Result<(), AccessError> {
    let Some(token) = token else {
        return Ok(());
    };
    if revoke_session(store, token).await? {
        info!("session revoked");
    }
    Ok(())
}
