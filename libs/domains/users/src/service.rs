use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{UserError, UserResult};
use crate::models::{
    AdminUpdateUser, ChangePasswordRequest, LoginRequest, MAX_ADDRESSES, MAX_PAGE_SIZE,
    RegisterRequest, Role, UpdateProfile, User, UserFilter, UserList, UserResponse,
    normalize_email,
};
use crate::repository::UserRepository;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Service layer for accounts and credentials
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Create a customer account
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterRequest) -> UserResult<UserResponse> {
        input
            .validate()
            .map_err(|e| UserError::Validation(e.to_string()))?;
        validate_password(&input.password)?;

        let email = normalize_email(&input.email);
        if self.repository.email_exists(&email).await? {
            return Err(UserError::DuplicateEmail(email));
        }

        let mut user = User::new(
            &email,
            &input.name,
            hash_password(&input.password)?,
            vec![Role::Customer],
        );
        user.phone = input
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        let created = self.repository.create(user).await?;
        tracing::info!(user_id = %created.id, "User registered");
        Ok(created.into())
    }

    /// Check credentials and stamp the login time
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn authenticate(&self, input: LoginRequest) -> UserResult<UserResponse> {
        let user = self
            .repository
            .get_by_email(&input.email)
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        if !verify_password(&input.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Failed login attempt");
            return Err(UserError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(UserError::AccountInactive);
        }

        self.repository.record_login(user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        let mut response = UserResponse::from(user);
        response.last_login_at = Some(chrono::Utc::now());
        Ok(response)
    }

    /// Get a user by ID
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> UserResult<UserResponse> {
        Ok(self.find(id).await?.into())
    }

    /// The caller's own account. Deactivated accounts are refused even while
    /// their token is still valid.
    #[instrument(skip(self))]
    pub async fn get_active_user(&self, id: Uuid) -> UserResult<UserResponse> {
        let user = self.find(id).await?;
        if !user.is_active {
            return Err(UserError::AccountInactive);
        }
        Ok(user.into())
    }

    #[instrument(skip(self, input))]
    pub async fn update_profile(&self, id: Uuid, input: UpdateProfile) -> UserResult<UserResponse> {
        input
            .validate()
            .map_err(|e| UserError::Validation(e.to_string()))?;
        if let Some(addresses) = &input.addresses {
            if addresses.len() > MAX_ADDRESSES {
                return Err(UserError::Validation(format!(
                    "At most {} addresses can be saved",
                    MAX_ADDRESSES
                )));
            }
            for address in addresses {
                address
                    .validate()
                    .map_err(|e| UserError::Validation(e.to_string()))?;
            }
        }

        let mut user = self.find(id).await?;
        user.apply_profile(input);
        let updated = self.repository.update(user).await?;
        tracing::info!(user_id = %id, "Profile updated");
        Ok(updated.into())
    }

    /// Change password; the current one must be supplied
    #[instrument(skip(self, input))]
    pub async fn change_password(&self, id: Uuid, input: ChangePasswordRequest) -> UserResult<()> {
        let mut user = self.find(id).await?;

        if !verify_password(&input.current_password, &user.password_hash)? {
            return Err(UserError::InvalidCredentials);
        }
        validate_password(&input.new_password)?;
        if input.new_password == input.current_password {
            return Err(UserError::Validation(
                "New password must differ from the current one".to_string(),
            ));
        }

        user.password_hash = hash_password(&input.new_password)?;
        user.updated_at = chrono::Utc::now();
        self.repository.update(user).await?;
        tracing::info!(user_id = %id, "Password changed");
        Ok(())
    }

    /// List users with filters
    #[instrument(skip(self))]
    pub async fn list_users(&self, mut filter: UserFilter) -> UserResult<UserList> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        let total = self.repository.count(filter.clone()).await?;
        let users = self.repository.list(filter.clone()).await?;
        Ok(UserList {
            data: users.into_iter().map(UserResponse::from).collect(),
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    /// Change roles or the active flag. Admins cannot demote or deactivate
    /// themselves.
    #[instrument(skip(self, input))]
    pub async fn admin_update_user(
        &self,
        actor: Uuid,
        id: Uuid,
        input: AdminUpdateUser,
    ) -> UserResult<UserResponse> {
        input
            .validate()
            .map_err(|e| UserError::Validation(e.to_string()))?;

        if actor == id {
            let drops_admin = input
                .roles
                .as_ref()
                .is_some_and(|roles| !roles.contains(&Role::Admin));
            if drops_admin || input.is_active == Some(false) {
                return Err(UserError::Validation(
                    "You cannot remove your own admin role or deactivate yourself".to_string(),
                ));
            }
        }

        let mut user = self.find(id).await?;
        user.apply_admin_update(input);
        let updated = self.repository.update(user).await?;
        tracing::info!(user_id = %id, actor = %actor, roles = ?updated.roles, active = updated.is_active, "User updated by admin");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, actor: Uuid, id: Uuid) -> UserResult<()> {
        if actor == id {
            return Err(UserError::Validation(
                "You cannot delete your own account".to_string(),
            ));
        }
        if !self.repository.delete(id).await? {
            return Err(UserError::NotFound(id));
        }
        tracing::info!(user_id = %id, actor = %actor, "User deleted by admin");
        Ok(())
    }

    /// Create the bootstrap admin unless the email is already registered.
    /// Returns whether an account was created.
    #[instrument(skip(self, password))]
    pub async fn ensure_admin(&self, email: &str, password: &str, name: &str) -> UserResult<bool> {
        let email = normalize_email(email);
        if let Some(existing) = self.repository.get_by_email(&email).await? {
            if !existing.is_admin() {
                tracing::warn!(user_id = %existing.id, "Seed admin email belongs to a non-admin account");
            }
            return Ok(false);
        }

        validate_password(password)?;
        let user = User::new(&email, name, hash_password(password)?, vec![Role::Admin]);
        let created = self.repository.create(user).await?;
        tracing::info!(user_id = %created.id, "Admin account seeded");
        Ok(true)
    }

    async fn find(&self, id: Uuid) -> UserResult<User> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }
}

/// 8 to 128 characters with at least one letter and one digit.
pub fn validate_password(password: &str) -> UserResult<()> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LEN {
        return Err(UserError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if length > MAX_PASSWORD_LEN {
        return Err(UserError::Validation(format!(
            "Password cannot exceed {} characters",
            MAX_PASSWORD_LEN
        )));
    }
    if !password.chars().any(char::is_alphabetic) {
        return Err(UserError::Validation(
            "Password must contain at least one letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(UserError::Validation(
            "Password must contain at least one digit".to_string(),
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> UserResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> UserResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| UserError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
