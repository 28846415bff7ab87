use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CartResult;
use crate::models::Cart;

/// Persistence of per-user cart documents
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The user's cart, `None` before the first write
    async fn get(&self, user_id: Uuid) -> CartResult<Option<Cart>>;

    /// Write the whole document if the stored copy is still the one that was
    /// read: `expected` is its `updated_at`, or `None` when there was no
    /// document yet. Fails with `CartError::ConcurrentUpdate` otherwise.
    async fn save(&self, cart: Cart, expected: Option<DateTime<Utc>>) -> CartResult<Cart>;

    /// Drop the document; returns false when there was none
    async fn delete(&self, user_id: Uuid) -> CartResult<bool>;
}
