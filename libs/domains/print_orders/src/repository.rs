use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::PrintOrderResult;
use crate::models::{PrintOrder, PrintOrderFilter, PrintStatus};

/// Repository trait for PrintOrder persistence
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait PrintOrderRepository: Send + Sync {
    /// Insert a new job; a taken reference gives `DuplicateReference`
    async fn create(&self, order: PrintOrder) -> PrintOrderResult<PrintOrder>;

    async fn get_by_id(&self, id: Uuid) -> PrintOrderResult<Option<PrintOrder>>;

    async fn get_by_reference(&self, reference: &str) -> PrintOrderResult<Option<PrintOrder>>;

    /// Newest first
    async fn list(&self, filter: PrintOrderFilter) -> PrintOrderResult<Vec<PrintOrder>>;

    async fn count(&self, filter: PrintOrderFilter) -> PrintOrderResult<u64>;

    /// Replace the job if its status is still `expected_status`
    async fn update(
        &self,
        order: PrintOrder,
        expected_status: PrintStatus,
    ) -> PrintOrderResult<PrintOrder>;

    /// Jobs submitted from `from` to `to` (whole days, inclusive), oldest first
    async fn created_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PrintOrderResult<Vec<PrintOrder>>;

    /// Jobs that are neither completed nor cancelled
    async fn count_open(&self) -> PrintOrderResult<u64>;
}
