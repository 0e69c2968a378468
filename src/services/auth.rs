//! Authentication service: credentials, token issuance and verification

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult, AuthFailure},
    models::user::{NewUser, RegisterUser, User, UserClaims, UserSummary},
    repository::UserStore,
};

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, config: AuthConfig) -> Self {
        Self { users, config }
    }

    /// Token lifetime in seconds
    pub fn token_ttl_secs(&self) -> i64 {
        self.config.jwt_expiration_hours as i64 * 3600
    }

    /// Create the account and return a token for it
    pub async fn register(&self, request: RegisterUser) -> AppResult<(String, User)> {
        let new_user = NewUser {
            name: request.name,
            email: request.email,
            password_hash: hash_password(&request.password)?,
        };

        let user = self.users.create(&new_user).await?;
        tracing::info!(user_id = %user.id, "User registered");

        let token = self.issue_token(&user)?;
        Ok((token, user))
    }

    /// Authenticate by email and password and return a token
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AppError::Unauthenticated(AuthFailure::InvalidCredentials))?;

        if !verify_password(&user, password)? {
            tracing::debug!(user_id = %user.id, "Rejected login with wrong password");
            return Err(AppError::Unauthenticated(AuthFailure::InvalidCredentials));
        }

        let token = self.issue_token(&user)?;
        Ok((token, user))
    }

    fn issue_token(&self, user: &User) -> AppResult<String> {
        UserClaims::new(user.id, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify a bearer token and resolve the principal it names.
    ///
    /// The principal is looked up on every call; nothing is cached.
    pub async fn authenticate(&self, token: &str) -> AppResult<UserSummary> {
        let claims = UserClaims::from_token(token, &self.config.jwt_secret).map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            AppError::Unauthenticated(AuthFailure::InvalidToken)
        })?;

        let user_id = claims
            .user_id()
            .ok_or(AppError::Unauthenticated(AuthFailure::InvalidToken))?;

        self.users
            .get(user_id)
            .await?
            .map(UserSummary::from)
            .ok_or(AppError::Unauthenticated(AuthFailure::PrincipalNotFound))
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
