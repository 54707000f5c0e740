//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{RegisterUser, Role, UpdateUser, User, UserClaims, UserQuery, UserShort},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new account. New users start as USER with 0 loyalty points.
    pub async fn register(&self, user: RegisterUser) -> AppResult<User> {
        if self.repository.users.login_exists(&user.login, None).await? {
            return Err(AppError::Conflict("Login already exists".to_string()));
        }

        let password_hash = self.hash_password(&user.password)?;
        let created = self.repository.users.create(&user, &password_hash, Role::User).await?;

        tracing::info!("User {} registered (login={})", created.id, created.login);

        Ok(created)
    }

    /// Authenticate user by login and return a JWT token
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_login(login)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid login or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid login or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.login.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        if let Some(ref hash) = user.password {
            let parsed_hash = PasswordHash::new(hash)
                .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
            return Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok());
        }

        Ok(false)
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Search users
    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64)> {
        self.repository.users.search(query).await
    }

    /// Update an existing user (admin)
    pub async fn update_user(&self, id: i32, user: UpdateUser) -> AppResult<User> {
        // Check if user exists
        self.repository.users.get_by_id(id).await?;

        if let Some(ref login) = user.login {
            if self.repository.users.login_exists(login, Some(id)).await? {
                return Err(AppError::Conflict("Login already exists".to_string()));
            }
        }

        let password_hash = if let Some(ref password) = user.password {
            Some(self.hash_password(password)?)
        } else {
            None
        };

        self.repository.users.update(id, &user, password_hash).await
    }

    /// Delete a user. Blocked while open loans reference the user, so the
    /// loan ledger keeps its referential integrity.
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.repository.users.get_by_id(id).await?;

        let open_loans = self.repository.loans.count_open_for_user(id).await?;
        if open_loans > 0 {
            return Err(AppError::Conflict(format!(
                "User has {} open loan(s); return them before deletion",
                open_loans
            )));
        }

        self.repository.users.delete(id).await
    }
}
