//! Registration, login, and token lifecycle.

use chrono::Utc;
use gophkeeper_core::{new_id, DomainError, PasswordHasher, TokenManager, ValidationError};

use crate::storage::{Storage, User};

/// Fresh access/refresh pair returned by login and refresh.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    storage: Storage,
    tokens: TokenManager,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(storage: Storage, tokens: TokenManager, hasher: PasswordHasher) -> Self {
        Self {
            storage,
            tokens,
            hasher,
        }
    }

    /// Register a new account and return its id.
    pub fn register(&self, login: &str, password: &str) -> Result<String, DomainError> {
        validate_credentials(login, password)?;

        // Hash before the existence lookup so a taken login costs the
        // same wall-clock as a fresh one.
        let password_hash = self
            .hasher
            .hash(password)
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        if self.storage.get_user_by_login(login).is_ok() {
            return Err(DomainError::UserAlreadyExists);
        }

        let now = Utc::now().timestamp();
        let user = User {
            id: new_id(),
            login: login.to_string(),
            password_hash,
            created_at: now,
            updated_at: now,
        };
        self.storage.create_user(&user)?;

        tracing::info!(user_id = %user.id, "registered user");
        Ok(user.id)
    }

    /// Authenticate and issue a fresh token pair.
    ///
    /// An unknown login and a wrong password are indistinguishable to the
    /// caller.
    pub fn login(&self, login: &str, password: &str) -> Result<(TokenPair, String), DomainError> {
        validate_credentials(login, password)?;

        let user = match self.storage.get_user_by_login(login) {
            Ok(user) => user,
            Err(DomainError::UserNotFound) => return Err(DomainError::InvalidCredentials),
            Err(e) => return Err(e),
        };

        if !self.hasher.verify(password, &user.password_hash) {
            return Err(DomainError::InvalidCredentials);
        }

        let pair = self.issue_pair(&user)?;
        Ok((pair, user.id))
    }

    /// Validate an access token and resolve its user.
    pub fn validate_token(&self, token: &str) -> Result<User, DomainError> {
        let claims = self.tokens.parse(token)?;
        if !claims.is_access() {
            return Err(DomainError::InvalidToken);
        }
        self.storage
            .get_user_by_id(&claims.user_id)
            .map_err(|_| DomainError::UserNotFound)
    }

    /// Rotate a refresh token into a fresh pair.
    ///
    /// The old refresh token stays valid until its expiry; no server-side
    /// registry tracks issued tokens.
    pub fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, DomainError> {
        let claims = self.tokens.parse(refresh_token)?;
        if !claims.is_refresh() {
            return Err(DomainError::InvalidToken);
        }
        let user = self
            .storage
            .get_user_by_id(&claims.user_id)
            .map_err(|_| DomainError::UserNotFound)?;
        self.issue_pair(&user)
    }

    fn issue_pair(&self, user: &User) -> Result<TokenPair, DomainError> {
        let access_token = self
            .tokens
            .issue_access(&user.id, &user.login)
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        let refresh_token = self
            .tokens
            .issue_refresh(&user.id)
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

fn validate_credentials(login: &str, password: &str) -> Result<(), DomainError> {
    if login.len() < 3 || login.len() > 50 {
        return Err(DomainError::Validation(ValidationError::new(
            "login",
            "must be 3-50 characters",
        )));
    }
    if !login.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DomainError::Validation(ValidationError::new(
            "login",
            "may contain only letters, digits and underscore",
        )));
    }
    if password.len() < 8 {
        return Err(DomainError::Validation(ValidationError::new(
            "password",
            "must be at least 8 characters",
        )));
    }
    Ok(())
}
