//! Where report data comes from.

use async_trait::async_trait;
use chrono::NaiveDate;
use database::day_range;
use domain_orders::{MongoOrderRepository, Order, OrderRepository, OrderStatus};
use domain_print_orders::{MongoPrintOrderRepository, PrintOrder, PrintOrderRepository};
use domain_products::{MongoProductRepository, Product, ProductRepository};
use mongodb::{
    Collection, Database,
    bson::{Document, doc},
};
use tracing::instrument;

use crate::error::ReportResult;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Shop orders created on the days `from..=to`
    async fn orders_between(&self, from: NaiveDate, to: NaiveDate) -> ReportResult<Vec<Order>>;

    async fn print_orders_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ReportResult<Vec<PrintOrder>>;

    /// Customer accounts registered on the days `from..=to`
    async fn new_customers(&self, from: NaiveDate, to: NaiveDate) -> ReportResult<u64>;

    async fn low_stock(&self, threshold: i32, limit: i64) -> ReportResult<Vec<Product>>;

    async fn pending_orders(&self) -> ReportResult<u64>;

    async fn open_print_jobs(&self) -> ReportResult<u64>;
}

/// Reads the domain collections directly. User accounts are counted from the
/// raw `users` collection.
pub struct MongoReportSource {
    orders: MongoOrderRepository,
    print_orders: MongoPrintOrderRepository,
    products: MongoProductRepository,
    users: Collection<Document>,
}

impl MongoReportSource {
    pub fn new(db: &Database) -> Self {
        Self {
            orders: MongoOrderRepository::new(db),
            print_orders: MongoPrintOrderRepository::new(db),
            products: MongoProductRepository::new(db),
            users: db.collection::<Document>("users"),
        }
    }
}

#[async_trait]
impl ReportSource for MongoReportSource {
    #[instrument(skip(self))]
    async fn orders_between(&self, from: NaiveDate, to: NaiveDate) -> ReportResult<Vec<Order>> {
        Ok(self.orders.created_between(from, to).await?)
    }

    #[instrument(skip(self))]
    async fn print_orders_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ReportResult<Vec<PrintOrder>> {
        Ok(self.print_orders.created_between(from, to).await?)
    }

    #[instrument(skip(self))]
    async fn new_customers(&self, from: NaiveDate, to: NaiveDate) -> ReportResult<u64> {
        let mut filter = doc! { "roles": "customer" };
        if let Some(range) = day_range(Some(from), Some(to)) {
            filter.insert("created_at", range);
        }
        Ok(self.users.count_documents(filter).await?)
    }

    #[instrument(skip(self))]
    async fn low_stock(&self, threshold: i32, limit: i64) -> ReportResult<Vec<Product>> {
        Ok(self.products.get_low_stock(threshold, limit).await?)
    }

    #[instrument(skip(self))]
    async fn pending_orders(&self) -> ReportResult<u64> {
        Ok(self.orders.count_by_status(OrderStatus::Pending).await?)
    }

    #[instrument(skip(self))]
    async fn open_print_jobs(&self) -> ReportResult<u64> {
        Ok(self.print_orders.count_open().await?)
    }
}
