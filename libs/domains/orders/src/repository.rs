use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::OrderResult;
use crate::models::{Order, OrderFilter, OrderStatus};

/// Repository trait for Order persistence
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order; a taken order number gives `DuplicateOrderNumber`
    async fn create(&self, order: Order) -> OrderResult<Order>;

    async fn get_by_id(&self, id: Uuid) -> OrderResult<Option<Order>>;

    async fn get_by_number(&self, order_number: &str) -> OrderResult<Option<Order>>;

    /// Newest first
    async fn list(&self, filter: OrderFilter) -> OrderResult<Vec<Order>>;

    async fn count(&self, filter: OrderFilter) -> OrderResult<u64>;

    /// Replace the order if its status is still `expected_status`.
    /// Fails with `ConcurrentUpdate` when someone else changed it first.
    async fn update(&self, order: Order, expected_status: OrderStatus) -> OrderResult<Order>;

    /// Every order placed from `from` to `to` (whole days, inclusive),
    /// oldest first
    async fn created_between(&self, from: NaiveDate, to: NaiveDate) -> OrderResult<Vec<Order>>;

    /// Orders currently in `status`
    async fn count_by_status(&self, status: OrderStatus) -> OrderResult<u64>;
}
