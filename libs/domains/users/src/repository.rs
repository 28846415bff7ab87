use async_trait::async_trait;
use uuid::Uuid;

use crate::error::UserResult;
use crate::models::{User, UserFilter};

/// Repository trait for User persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user; a taken email is a `DuplicateEmail` error
    async fn create(&self, user: User) -> UserResult<User>;

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    /// Lookup by normalized email
    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>>;

    /// List users with optional filters, newest first
    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>>;

    async fn count(&self, filter: UserFilter) -> UserResult<u64>;

    /// Replace the stored document
    async fn update(&self, user: User) -> UserResult<User>;

    async fn delete(&self, id: Uuid) -> UserResult<bool>;

    async fn email_exists(&self, email: &str) -> UserResult<bool>;

    /// Stamp `last_login_at`
    async fn record_login(&self, id: Uuid) -> UserResult<()>;
}
