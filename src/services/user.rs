//! User service
//!
//! Registration, login/logout and session validation. Any registered user
//! may both teach (own courses) and study (enroll), so there are no roles.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error; the first field names the offending input
    #[error("Validation error: {1}")]
    ValidationError(&'static str, String),

    /// Username or email already registered
    #[error("User already exists: {1}")]
    UserExists(&'static str, String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a user service with a custom session lifetime
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if username, email or password is empty, or the
    ///   email has no `@`
    /// - `UserExists` if username or email is already taken
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let input = RegisterInput {
            username: input.username.trim().to_string(),
            email: input.email.trim().to_string(),
            password: input.password,
        };
        validate_register_input(&input)?;

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(
                "username",
                format!("Username '{}' is already taken", input.username),
            ));
        }

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(
                "email",
                format!("Email '{}' is already registered", input.email),
            ));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = self
            .user_repo
            .create(&User::new(input.username, input.email, password_hash))
            .await
            .context("Failed to create user")?;

        tracing::info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Check credentials and open a new session.
    ///
    /// Unknown user and wrong password produce the same error.
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let invalid =
            || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = self
            .user_repo
            .get_by_login(input.username_or_email.trim())
            .await
            .context("Failed to look up user")?
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!("Rejected login for user {}", user.id);
            return Err(invalid());
        }

        let session = self.open_session(user.id).await?;
        Ok((user, session))
    }

    /// Open a session for an already authenticated user (e.g. right after
    /// registration).
    pub async fn open_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::issue(user_id, self.session_expiration_days);
        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }

    /// Invalidate a session; unknown tokens are ignored
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Returns `None` for unknown or expired tokens; expired sessions are
    /// removed on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_token(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to remove expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;

        Ok(user)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }

    pub fn session_expiration_days(&self) -> i64 {
        self.session_expiration_days
    }
}

fn validate_register_input(input: &RegisterInput) -> Result<(), UserServiceError> {
    if input.username.is_empty() {
        return Err(UserServiceError::ValidationError(
            "username",
            "Username cannot be empty".to_string(),
        ));
    }
    if input.username.chars().count() > 150 {
        return Err(UserServiceError::ValidationError(
            "username",
            "Username must be at most 150 characters".to_string(),
        ));
    }
    if input.email.is_empty() {
        return Err(UserServiceError::ValidationError(
            "email",
            "Email cannot be empty".to_string(),
        ));
    }
    if !input.email.contains('@') {
        return Err(UserServiceError::ValidationError(
            "email",
            "Invalid email format".to_string(),
        ));
    }
    if input.password.is_empty() {
        return Err(UserServiceError::ValidationError(
            "password",
            "Password cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Input for user registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
        )
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let service = setup_test_service().await;

        let user = service
            .register(RegisterInput::new(" alice ", "alice@example.com", "s3cret"))
            .await
            .expect("Failed to register");

        assert_eq!(user.username, "alice");
        assert_ne!(user.password_hash, "s3cret");
        assert!(verify_password("s3cret", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicates_rejected() {
        let service = setup_test_service().await;
        service
            .register(RegisterInput::new("bob", "bob@example.com", "pw"))
            .await
            .unwrap();

        let dup_name = service
            .register(RegisterInput::new("bob", "other@example.com", "pw"))
            .await;
        assert!(matches!(dup_name, Err(UserServiceError::UserExists("username", _))));

        let dup_email = service
            .register(RegisterInput::new("robert", "bob@example.com", "pw"))
            .await;
        assert!(matches!(dup_email, Err(UserServiceError::UserExists("email", _))));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let service = setup_test_service().await;

        for (input, field) in [
            (RegisterInput::new("", "a@b.c", "pw"), "username"),
            (RegisterInput::new("a", "", "pw"), "email"),
            (RegisterInput::new("a", "no-at-sign", "pw"), "email"),
            (RegisterInput::new("a", "a@b.c", ""), "password"),
        ] {
            match service.register(input).await {
                Err(UserServiceError::ValidationError(f, _)) => assert_eq!(f, field),
                other => panic!("expected validation error on {}, got {:?}", field, other),
            }
        }
    }

    #[tokio::test]
    async fn test_login_by_username_or_email() {
        let service = setup_test_service().await;
        let user = service
            .register(RegisterInput::new("carol", "carol@example.com", "pw"))
            .await
            .unwrap();

        let (by_name, session) = service.login(LoginInput::new("carol", "pw")).await.unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(session.user_id, user.id);

        let (by_email, _) = service
            .login(LoginInput::new("carol@example.com", "pw"))
            .await
            .unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_login_failures_look_the_same() {
        let service = setup_test_service().await;
        service
            .register(RegisterInput::new("dave", "dave@example.com", "pw"))
            .await
            .unwrap();

        let wrong_pw = service.login(LoginInput::new("dave", "nope")).await;
        let no_user = service.login(LoginInput::new("nobody", "pw")).await;

        match (wrong_pw, no_user) {
            (
                Err(UserServiceError::AuthenticationError(a)),
                Err(UserServiceError::AuthenticationError(b)),
            ) => assert_eq!(a, b),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_session_roundtrip_and_logout() {
        let service = setup_test_service().await;
        let user = service
            .register(RegisterInput::new("erin", "erin@example.com", "pw"))
            .await
            .unwrap();
        let session = service.open_session(user.id).await.unwrap();

        let validated = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(validated.id, user.id);

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());

        // logging out twice is harmless
        service.logout(&session.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            -1,
        );
        let user = service
            .register(RegisterInput::new("frank", "frank@example.com", "pw"))
            .await
            .unwrap();

        let session = service.open_session(user.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 0);
    }
}
