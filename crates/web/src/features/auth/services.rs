use storage::StorageError;
use storage::dto::auth::{LoginRequest, RegisterRequest};
use storage::models::{NewUser, Session, User};
use storage::repository::{SessionStore, UserRepository};
use uuid::Uuid;

use super::password::{hash_password, verify_password};
use crate::error::{WebError, WebResult};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Create the account and open its first session.
pub async fn register(
    users: &dyn UserRepository,
    sessions: &dyn SessionStore,
    request: &RegisterRequest,
) -> WebResult<(User, Session)> {
    let password_hash = hash_password(&request.password)
        .map_err(|e| WebError::InternalServerError(format!("password hashing failed: {e}")))?;

    let user = users
        .create(&NewUser {
            username: request.username.trim().to_string(),
            email: request.email.trim().to_string(),
            password_hash,
        })
        .await?;
    let session = sessions.create(user.user_id).await?;

    Ok((user, session))
}

pub async fn login(
    users: &dyn UserRepository,
    sessions: &dyn SessionStore,
    request: &LoginRequest,
) -> WebResult<(User, Session)> {
    let user = match users.find_by_username(request.username.trim()).await {
        Ok(user) => user,
        Err(StorageError::NotFound) => {
            return Err(WebError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let verified = verify_password(&request.password, &user.password_hash)
        .map_err(|e| WebError::InternalServerError(format!("stored hash unreadable: {e}")))?;
    if !verified {
        return Err(WebError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let session = sessions.create(user.user_id).await?;
    Ok((user, session))
}

pub async fn logout(sessions: &dyn SessionStore, token: &str) -> WebResult<()> {
    sessions.revoke(token).await?;
    Ok(())
}

pub async fn profile(users: &dyn UserRepository, user_id: Uuid) -> WebResult<User> {
    Ok(users.find_by_id(user_id).await?)
}
