//! MongoDB implementation of OrderRepository

use async_trait::async_trait;
use chrono::NaiveDate;
use database::{contains_ci, day_range, id_bson, id_filter};
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document, doc},
    options::{FindOptions, IndexOptions},
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{OrderError, OrderResult};
use crate::models::{Order, OrderFilter, OrderStatus};
use crate::repository::OrderRepository;

pub struct MongoOrderRepository {
    collection: Collection<Order>,
}

impl MongoOrderRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Order>("orders"),
        }
    }

    pub async fn init_indexes(&self) -> OrderResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "order_number": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_order_number_unique".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "created_at": -1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "status": 1, "created_at": -1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "created_at": -1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "customer.email": 1 })
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Order indexes initialized");
        Ok(())
    }

    async fn find_many(&self, filter: Document, options: FindOptions) -> OrderResult<Vec<Order>> {
        let cursor = self.collection.find(filter).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }
}

fn build_filter(filter: &OrderFilter) -> Document {
    let mut query = doc! {};

    if let Some(user_id) = filter.user_id {
        query.insert("user_id", id_bson(user_id));
    }
    if let Some(status) = filter.status {
        query.insert("status", status.to_string());
    }
    if let Some(payment_status) = filter.payment_status {
        query.insert("payment_status", payment_status.to_string());
    }
    if let Some(range) = day_range(filter.from, filter.to) {
        query.insert("created_at", range);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query.insert(
            "$or",
            vec![
                doc! { "order_number": contains_ci(search) },
                doc! { "customer.email": contains_ci(search) },
            ],
        );
    }

    query
}

#[async_trait]
impl OrderRepository for MongoOrderRepository {
    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    async fn create(&self, order: Order) -> OrderResult<Order> {
        self.collection.insert_one(&order).await?;
        tracing::info!(order_id = %order.id, total = order.total, "Order created");
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> OrderResult<Option<Order>> {
        Ok(self.collection.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self))]
    async fn get_by_number(&self, order_number: &str) -> OrderResult<Option<Order>> {
        let filter = doc! { "order_number": order_number.trim().to_ascii_uppercase() };
        Ok(self.collection.find_one(filter).await?)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: OrderFilter) -> OrderResult<Vec<Order>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .limit(filter.limit)
            .skip(filter.offset)
            .build();
        self.find_many(build_filter(&filter), options).await
    }

    #[instrument(skip(self))]
    async fn count(&self, filter: OrderFilter) -> OrderResult<u64> {
        Ok(self.collection.count_documents(build_filter(&filter)).await?)
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, status = %order.status))]
    async fn update(&self, order: Order, expected_status: OrderStatus) -> OrderResult<Order> {
        let mut filter = id_filter(order.id);
        filter.insert("status", expected_status.to_string());

        let result = self.collection.replace_one(filter, &order).await?;
        if result.matched_count == 0 {
            return match self.get_by_id(order.id).await? {
                Some(_) => Err(OrderError::ConcurrentUpdate),
                None => Err(OrderError::NotFound(order.id)),
            };
        }
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn created_between(&self, from: NaiveDate, to: NaiveDate) -> OrderResult<Vec<Order>> {
        let mut filter = doc! {};
        if let Some(range) = day_range(Some(from), Some(to)) {
            filter.insert("created_at", range);
        }
        let options = FindOptions::builder().sort(doc! { "created_at": 1 }).build();
        self.find_many(filter, options).await
    }

    #[instrument(skip(self))]
    async fn count_by_status(&self, status: OrderStatus) -> OrderResult<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "status": status.to_string() })
            .await?)
    }
}
