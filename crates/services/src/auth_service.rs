use std::fmt;
use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;
use sat_core::model::{RoleId, User, UserId};
use storage::repository::{StorageError, UserRepository};

use crate::error::{AuthError, CredentialError};

/// Opaque handle for an open session.
///
/// The token is returned to the caller when a session opens and must be
/// presented back for every identity lookup; there is no ambient
/// "current user" state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checks account naming rules: 3 to 32 characters, letters, digits and
/// `.`, `_`, `-`.
///
/// # Errors
///
/// Returns `CredentialError::InvalidUsername` when the rules are not met.
pub fn validate_username(username: &str) -> Result<(), CredentialError> {
    let ok_len = (3..=32).contains(&username.len());
    let ok_chars = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if ok_len && ok_chars {
        Ok(())
    } else {
        Err(CredentialError::InvalidUsername)
    }
}

/// Checks password strength: at least 8 characters mixing upper case,
/// lower case, digits and punctuation.
///
/// # Errors
///
/// Returns `CredentialError` naming the failed rule.
pub fn validate_password(password: &str) -> Result<(), CredentialError> {
    if password.len() < 8 {
        return Err(CredentialError::PasswordTooShort);
    }
    let upper = password.chars().any(char::is_uppercase);
    let lower = password.chars().any(char::is_lowercase);
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let punct = password.chars().any(|c| !c.is_alphanumeric());
    if upper && lower && digit && punct {
        Ok(())
    } else {
        Err(CredentialError::PasswordTooWeak)
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn generate_token() -> SessionToken {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    SessionToken(hex::encode(bytes))
}

/// Account management and session handling.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
}

impl AuthService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Create a new account with a freshly hashed password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Credential` for a rejected username or password,
    /// `AuthError::UsernameTaken` if the name is in use, or
    /// `AuthError::Storage` if persistence fails.
    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        role: RoleId,
        technical: bool,
    ) -> Result<(), AuthError> {
        validate_username(username)?;
        validate_password(password)?;

        let hash = hash_password(password)?;
        let user = User::new(UserId::new(username), role, hash, technical)?;
        match self.users.insert_user(&user).await {
            Err(StorageError::Conflict) => Err(AuthError::UsernameTaken),
            other => Ok(other?),
        }
    }

    /// Check a username/password pair. Unknown usernames verify as false.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if repository access fails, or
    /// `AuthError::Hash` for an unreadable stored hash.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        match self.users.get_user(&UserId::new(username)).await? {
            Some(user) => verify_password(password, user.password_hash()),
            None => Ok(false),
        }
    }

    /// Verify credentials and open a session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the pair does not verify.
    pub async fn open_session(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionToken, AuthError> {
        if !self.authenticate(username, password).await? {
            return Err(AuthError::InvalidCredentials);
        }
        let token = generate_token();
        self.users
            .set_session_token(&UserId::new(username), Some(token.as_str()))
            .await?;
        Ok(token)
    }

    /// Close the session identified by `token`. Unknown tokens are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if repository access fails.
    pub async fn close_session(&self, token: &SessionToken) -> Result<(), AuthError> {
        match self.users.find_user_by_token(token.as_str()).await? {
            Some(user) => {
                self.users.set_session_token(user.id(), None).await?;
                Ok(())
            }
            None => {
                tracing::warn!("close_session called with an unknown token");
                Ok(())
            }
        }
    }

    /// Resolve the user owning an open session, if any.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if repository access fails.
    pub async fn current_user(&self, token: &SessionToken) -> Result<Option<User>, AuthError> {
        Ok(self.users.find_user_by_token(token.as_str()).await?)
    }

    /// Change a password after verifying the current one. Any open session
    /// for the user is closed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the current password does
    /// not verify, or `AuthError::Credential` if the new one is rejected.
    pub async fn change_password(
        &self,
        username: &str,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        if !self.authenticate(username, current).await? {
            return Err(AuthError::InvalidCredentials);
        }
        validate_password(new)?;

        let hash = hash_password(new)?;
        match self
            .users
            .set_password_hash(&UserId::new(username), &hash)
            .await
        {
            Err(StorageError::NotFound) => Err(AuthError::UnknownUser),
            other => Ok(other?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::{InMemoryRepository, UserRepository};

    const PASSWORD: &str = "Correct-horse1";

    fn service() -> (AuthService, Arc<dyn UserRepository>) {
        let repo: Arc<dyn UserRepository> = Arc::new(InMemoryRepository::new());
        (AuthService::new(Arc::clone(&repo)), repo)
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("test.ceo").is_ok());
        assert!(validate_username("a-b_c.9").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password(PASSWORD).is_ok());
        assert_eq!(
            validate_password("Sh0rt!"),
            Err(CredentialError::PasswordTooShort)
        );
        assert_eq!(
            validate_password("alllowercase1!"),
            Err(CredentialError::PasswordTooWeak)
        );
    }

    #[tokio::test]
    async fn create_account_hashes_the_password() {
        let (auth, users) = service();
        auth.create_account("test.ceo", PASSWORD, RoleId::new("CEO"), false)
            .await
            .unwrap();

        let stored = users
            .get_user(&UserId::new("test.ceo"))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash(), PASSWORD);
        assert!(stored.password_hash().starts_with("$argon2"));

        assert!(auth.authenticate("test.ceo", PASSWORD).await.unwrap());
        assert!(!auth.authenticate("test.ceo", "wrong-guess").await.unwrap());
        assert!(!auth.authenticate("nobody", PASSWORD).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_account_is_rejected() {
        let (auth, _) = service();
        auth.create_account("test.ceo", PASSWORD, RoleId::new("CEO"), false)
            .await
            .unwrap();
        let err = auth
            .create_account("test.ceo", PASSWORD, RoleId::new("CEO"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let (auth, _) = service();
        auth.create_account("test.ceo", PASSWORD, RoleId::new("CEO"), false)
            .await
            .unwrap();

        let err = auth.open_session("test.ceo", "wrong-guess").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let token = auth.open_session("test.ceo", PASSWORD).await.unwrap();
        assert_eq!(token.as_str().len(), 64);

        let current = auth.current_user(&token).await.unwrap().unwrap();
        assert_eq!(current.id(), &UserId::new("test.ceo"));

        // a new session replaces the old token
        let replacement = auth.open_session("test.ceo", PASSWORD).await.unwrap();
        assert_ne!(replacement, token);
        assert!(auth.current_user(&token).await.unwrap().is_none());

        auth.close_session(&replacement).await.unwrap();
        assert!(auth.current_user(&replacement).await.unwrap().is_none());

        // closing again is a no-op
        auth.close_session(&replacement).await.unwrap();
    }

    #[tokio::test]
    async fn change_password_requires_current_and_closes_session() {
        let (auth, _) = service();
        auth.create_account("test.ceo", PASSWORD, RoleId::new("CEO"), false)
            .await
            .unwrap();
        let token = auth.open_session("test.ceo", PASSWORD).await.unwrap();

        let err = auth
            .change_password("test.ceo", "wrong-guess", "Next-secret2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        auth.change_password("test.ceo", PASSWORD, "Next-secret2")
            .await
            .unwrap();
        assert!(auth.current_user(&token).await.unwrap().is_none());
        assert!(auth.authenticate("test.ceo", "Next-secret2").await.unwrap());
        assert!(!auth.authenticate("test.ceo", PASSWORD).await.unwrap());
    }
}
