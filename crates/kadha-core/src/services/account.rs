//! Signup and signin.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::User;
use crate::error::{DomainError, RepoError};
use crate::ports::{PasswordService, TokenService, UserRepository};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Signup form.
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// A freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub user_id: Uuid,
    pub token: String,
    pub expires_in: Option<i64>,
}

/// Account operations over the user store and the credential/token services.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    /// Register a user and sign them in.
    pub async fn signup(&self, input: SignupInput) -> Result<IssuedToken, DomainError> {
        let email = normalize_email(&input.email)?;
        validate_password(&input.password)?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("Name is required".to_string()));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(DomainError::EmailTaken);
        }

        let password_hash = self.passwords.hash(&input.password)?;
        let user = User::new(email, password_hash, name.to_string());

        // The unique index still catches a concurrent signup with the same email.
        let user = self.users.insert(user).await.map_err(|e| match e {
            RepoError::Constraint(_) => DomainError::EmailTaken,
            other => other.into(),
        })?;

        tracing::info!(user_id = %user.id, "User registered");
        self.issue(user.id)
    }

    /// Check credentials and issue a token.
    pub async fn signin(&self, email: &str, password: &str) -> Result<IssuedToken, DomainError> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(DomainError::InvalidCredentials)?;

        if !self.passwords.verify(password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Rejected signin with wrong password");
            return Err(DomainError::InvalidCredentials);
        }

        self.issue(user.id)
    }

    fn issue(&self, user_id: Uuid) -> Result<IssuedToken, DomainError> {
        let token = self.tokens.issue(user_id)?;
        Ok(IssuedToken {
            user_id,
            token,
            expires_in: self.tokens.expiration_seconds(),
        })
    }
}

fn normalize_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(email)
    } else {
        Err(DomainError::Validation("Invalid email address".to_string()))
    }
}

fn validate_password(password: &str) -> Result<(), DomainError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(DomainError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(DomainError::Validation(format!(
            "Password must be at most {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
