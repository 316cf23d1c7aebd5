use thiserror::Error;

use crate::model::ids::{RoleId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("username cannot be empty")]
    EmptyUsername,

    #[error("password hash cannot be empty")]
    EmptyPasswordHash,
}

/// A user account.
///
/// The password hash is a PHC-format string (salt embedded); the session
/// token is present only while a session is open for this user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    role: RoleId,
    password_hash: String,
    technical: bool,
    session_token: Option<String>,
}

impl User {
    /// Creates a new user with no active session.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the username or hash is empty.
    pub fn new(
        id: UserId,
        role: RoleId,
        password_hash: impl Into<String>,
        technical: bool,
    ) -> Result<Self, UserError> {
        if id.as_str().trim().is_empty() {
            return Err(UserError::EmptyUsername);
        }
        let password_hash = password_hash.into();
        if password_hash.is_empty() {
            return Err(UserError::EmptyPasswordHash);
        }
        Ok(Self {
            id,
            role,
            password_hash,
            technical,
            session_token: None,
        })
    }

    /// Rebuilds a user from persisted fields.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the username or hash is empty.
    pub fn from_persisted(
        id: UserId,
        role: RoleId,
        password_hash: String,
        technical: bool,
        session_token: Option<String>,
    ) -> Result<Self, UserError> {
        let mut user = Self::new(id, role, password_hash, technical)?;
        user.session_token = session_token;
        Ok(user)
    }

    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    #[must_use]
    pub fn role(&self) -> &RoleId {
        &self.role
    }

    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    /// Technical stakeholder (CISO/CIO/CTO) vs business stakeholder.
    #[must_use]
    pub fn is_technical(&self) -> bool {
        self.technical
    }

    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Administrators hold the UNIVERSAL role and never answer surveys.
    #[must_use]
    pub fn is_administrator(&self) -> bool {
        self.role.is_universal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_new_rejects_blank_fields() {
        let err = User::new(UserId::new(""), RoleId::new("CEO"), "hash", false).unwrap_err();
        assert_eq!(err, UserError::EmptyUsername);

        let err = User::new(UserId::new("alice"), RoleId::new("CEO"), "", false).unwrap_err();
        assert_eq!(err, UserError::EmptyPasswordHash);
    }

    #[test]
    fn administrator_flag_follows_role() {
        let admin = User::new(UserId::new("admin"), RoleId::universal(), "hash", false).unwrap();
        assert!(admin.is_administrator());

        let cto = User::new(UserId::new("test.cto"), RoleId::new("CTO"), "hash", true).unwrap();
        assert!(!cto.is_administrator());
        assert!(cto.is_technical());
    }

    #[test]
    fn from_persisted_restores_token() {
        let user = User::from_persisted(
            UserId::new("alice"),
            RoleId::new("CFO"),
            "hash".into(),
            false,
            Some("abc123".into()),
        )
        .unwrap();
        assert_eq!(user.session_token(), Some("abc123"));
    }
}
