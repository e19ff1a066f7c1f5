//! User service
//!
//! Registration, login and session management, plus the admin's role
//! management. The first account registered becomes the admin; everyone
//! after that starts as a visitor until promoted to member.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{ListParams, PagedResult, Session, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for accounts, sessions and roles
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the default session lifetime
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a user service whose sessions last `session_expiration_days`
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

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for empty fields or a malformed email
    /// - `UserExists` if the username or email is taken
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let input = RegisterInput {
            username: input.username.trim().to_string(),
            email: input.email.trim().to_string(),
            password: input.password,
        };
        validate_register_input(&input)?;

        if self.user_repo.get_by_username(&input.username).await?.is_some() {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }
        if self.user_repo.get_by_email(&input.email).await?.is_some() {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                input.email
            )));
        }

        let role = if self.user_repo.count().await? == 0 {
            UserRole::Admin
        } else {
            UserRole::Visitor
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = self
            .user_repo
            .create(&User::new(input.username, input.email, password_hash, role))
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = user.id, role = %user.role, "Registered user");
        Ok(user)
    }

    /// Check credentials and open a new session
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = self
            .find_user_by_username_or_email(input.username_or_email.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &user.password_hash).context("Failed to verify password")? {
            return Err(invalid());
        }

        let session = self
            .session_repo
            .create(&Session::new(user.id, self.session_expiration_days))
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(session)
    }

    /// End a session
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// User behind a session token; `None` for unknown or expired tokens.
    /// Expired sessions are deleted on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let Some(session) = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!(error = %e, "Failed to delete expired session");
            }
            return Ok(None);
        }

        Ok(self.user_repo.get_by_id(session.user_id).await?)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.user_repo.get_by_id(id).await?)
    }

    /// Page through all users, oldest first
    pub async fn list_users(&self, params: &ListParams) -> Result<PagedResult<User>, UserServiceError> {
        let (users, total) = self
            .user_repo
            .list(params.page as i64, params.limit())
            .await
            .context("Failed to list users")?;
        Ok(PagedResult::new(users, total, params))
    }

    /// Grant or revoke membership or admin rights
    pub async fn set_role(&self, user_id: i64, role: UserRole) -> Result<User, UserServiceError> {
        let user = self
            .user_repo
            .set_role(user_id, role)
            .await?
            .ok_or(UserServiceError::NotFound(user_id))?;
        tracing::info!(user_id, role = %role, "Changed user role");
        Ok(user)
    }

    /// Delete all expired sessions, returning how many went
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        if count > 0 {
            tracing::info!(count, "Removed expired sessions");
        }
        Ok(count)
    }

    async fn find_user_by_username_or_email(&self, username_or_email: &str) -> Result<Option<User>, UserServiceError> {
        if let Some(user) = self.user_repo.get_by_username(username_or_email).await? {
            return Ok(Some(user));
        }
        Ok(self.user_repo.get_by_email(username_or_email).await?)
    }
}

fn validate_register_input(input: &RegisterInput) -> Result<(), UserServiceError> {
    if input.username.is_empty() {
        return Err(UserServiceError::ValidationError("Username cannot be empty".to_string()));
    }
    if input.username.chars().count() > 50 {
        return Err(UserServiceError::ValidationError(
            "Username must be at most 50 characters".to_string(),
        ));
    }
    if input.email.is_empty() {
        return Err(UserServiceError::ValidationError("Email cannot be empty".to_string()));
    }
    if !input.email.contains('@') {
        return Err(UserServiceError::ValidationError("Invalid email format".to_string()));
    }
    if input.password.is_empty() {
        return Err(UserServiceError::ValidationError("Password cannot be empty".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

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
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
        )
    }

    #[tokio::test]
    async fn test_first_user_is_admin_then_visitors() {
        let service = setup_test_service().await;
        let admin = service
            .register(RegisterInput::new("admin", "admin@example.com", "pw"))
            .await
            .unwrap();
        assert_eq!(admin.role, UserRole::Admin);

        let second = service
            .register(RegisterInput::new("guest", "guest@example.com", "pw"))
            .await
            .unwrap();
        assert_eq!(second.role, UserRole::Visitor);
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() {
        let service = setup_test_service().await;
        let result = service.register(RegisterInput::new("  ", "a@b.c", "pw")).await;
        assert!(matches!(result, Err(UserServiceError::ValidationError(_))));

        let result = service.register(RegisterInput::new("a", "no-at-sign", "pw")).await;
        assert!(matches!(result, Err(UserServiceError::ValidationError(_))));

        service.register(RegisterInput::new("a", "a@b.c", "pw")).await.unwrap();
        let result = service.register(RegisterInput::new("a", "other@b.c", "pw")).await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
        let result = service.register(RegisterInput::new("b", "a@b.c", "pw")).await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_login_logout_session() {
        let service = setup_test_service().await;
        service.register(RegisterInput::new("ann", "ann@example.com", "secret")).await.unwrap();

        let wrong = service.login(LoginInput::new("ann", "nope")).await;
        assert!(matches!(wrong, Err(UserServiceError::AuthenticationError(_))));

        let session = service.login(LoginInput::new("ann@example.com", "secret")).await.unwrap();
        let user = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(user.username, "ann");

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            -1,
        );
        service.register(RegisterInput::new("ann", "ann@example.com", "secret")).await.unwrap();
        let session = service.login(LoginInput::new("ann", "secret")).await.unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_role_and_list() {
        let service = setup_test_service().await;
        service.register(RegisterInput::new("admin", "admin@example.com", "pw")).await.unwrap();
        let guest = service.register(RegisterInput::new("guest", "guest@example.com", "pw")).await.unwrap();

        let promoted = service.set_role(guest.id, UserRole::Member).await.unwrap();
        assert!(promoted.is_member());
        assert!(matches!(
            service.set_role(404, UserRole::Member).await,
            Err(UserServiceError::NotFound(404))
        ));

        let listed = service.list_users(&ListParams::default()).await.unwrap();
        assert_eq!(listed.total, 2);
    }
}
