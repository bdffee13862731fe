use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::User;
use crate::error::ApiError;
use crate::schema::{UserRole, Uuid};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, role: UserRole, ttl: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + ttl).timestamp();

        Self {
            user_id: id,
            role,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::Forbidden);
        }
        Ok(())
    }

    /// Owners may touch their own resources; everyone else needs `wider`.
    pub fn authenticate_owner(
        &self,
        owner_id: Uuid,
        own: ActionType,
        wider: ActionType,
    ) -> Result<(), ApiError> {
        self.authenticate(own)?;
        if owner_id == self.user_id {
            return Ok(());
        }
        self.authenticate(wider)
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            role: value.role,
        }
    }
}

/// Signing key and token lifetime shared by every request.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl_hours: i64) -> Result<Self, ApiError> {
        let key = Hmac::new_from_slice(secret)
            .map_err(|e| ApiError::Internal(format!("Invalid session secret: {e}")))?;

        Ok(Self {
            key,
            ttl: Duration::hours(ttl_hours),
        })
    }

    pub fn generate_session(&self, user: &User) -> Result<String, ApiError> {
        let claims = JwtSessionData::new(user.id, user.role.to_owned(), self.ttl);

        claims
            .sign_with_key(&self.key)
            .map_err(|e| ApiError::Internal(format!("Failed to sign session: {e}")))
    }

    pub fn verify_session(&self, token: &str) -> Result<JwtSessionData, ApiError> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_| ApiError::Unauthenticated)?;

        let now = Local::now().timestamp();
        if (session.exp - now).is_negative() {
            log::trace!("> Rejected expired session for user {}", session.user_id);
            return Err(ApiError::Unauthenticated);
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: 42,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Ada"),
            last_name: String::from("Baker"),
            password: String::new(),
            role,
        }
    }

    #[test]
    fn issued_session_verifies() {
        let keys = SessionKeys::new(b"test-secret", 1).unwrap();
        let token = keys.generate_session(&user(UserRole::Admin)).unwrap();

        let session: SessionData = keys.verify_session(&token).unwrap().into();
        assert_eq!(session.user_id, 42);
        assert_eq!(session.role, UserRole::Admin);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let issuer = SessionKeys::new(b"one-secret", 1).unwrap();
        let verifier = SessionKeys::new(b"another-secret", 1).unwrap();
        let token = issuer.generate_session(&user(UserRole::User)).unwrap();

        assert_eq!(
            verifier.verify_session(&token).unwrap_err(),
            ApiError::Unauthenticated
        );
    }

    #[test]
    fn expired_session_is_rejected() {
        let keys = SessionKeys::new(b"test-secret", -1).unwrap();
        let token = keys.generate_session(&user(UserRole::User)).unwrap();

        assert_eq!(
            keys.verify_session(&token).unwrap_err(),
            ApiError::Unauthenticated
        );
    }

    #[test]
    fn non_owner_needs_wider_permission() {
        let session = SessionData {
            user_id: 1,
            role: UserRole::User,
        };

        assert!(session
            .authenticate_owner(1, ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes)
            .is_ok());
        assert_eq!(
            session
                .authenticate_owner(2, ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes)
                .unwrap_err(),
            ApiError::Forbidden
        );
    }
}
