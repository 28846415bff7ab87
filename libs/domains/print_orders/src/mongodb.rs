//! MongoDB implementation of PrintOrderRepository

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

use crate::error::{PrintOrderError, PrintOrderResult};
use crate::models::{PrintOrder, PrintOrderFilter, PrintStatus};
use crate::repository::PrintOrderRepository;

pub struct MongoPrintOrderRepository {
    collection: Collection<PrintOrder>,
}

impl MongoPrintOrderRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<PrintOrder>("print_orders"),
        }
    }

    pub async fn init_indexes(&self) -> PrintOrderResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "reference": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_reference_unique".to_string())
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
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Print order indexes initialized");
        Ok(())
    }

    async fn find_many(
        &self,
        filter: Document,
        options: FindOptions,
    ) -> PrintOrderResult<Vec<PrintOrder>> {
        let cursor = self.collection.find(filter).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }
}

fn build_filter(filter: &PrintOrderFilter) -> Document {
    let mut query = doc! {};

    if let Some(user_id) = filter.user_id {
        query.insert("user_id", id_bson(user_id));
    }
    if let Some(status) = filter.status {
        query.insert("status", status.to_string());
    }
    if let Some(range) = day_range(filter.from, filter.to) {
        query.insert("created_at", range);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query.insert(
            "$or",
            vec![
                doc! { "reference": contains_ci(search) },
                doc! { "contact.name": contains_ci(search) },
                doc! { "contact.email": contains_ci(search) },
            ],
        );
    }

    query
}

fn open_filter() -> Document {
    let open: Vec<String> = PrintStatus::OPEN.iter().map(|s| s.to_string()).collect();
    doc! { "status": { "$in": open } }
}

#[async_trait]
impl PrintOrderRepository for MongoPrintOrderRepository {
    #[instrument(skip(self, order), fields(reference = %order.reference))]
    async fn create(&self, order: PrintOrder) -> PrintOrderResult<PrintOrder> {
        self.collection.insert_one(&order).await?;
        tracing::info!(print_order_id = %order.id, "Print order created");
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> PrintOrderResult<Option<PrintOrder>> {
        Ok(self.collection.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self))]
    async fn get_by_reference(&self, reference: &str) -> PrintOrderResult<Option<PrintOrder>> {
        let filter = doc! { "reference": reference.trim().to_ascii_uppercase() };
        Ok(self.collection.find_one(filter).await?)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: PrintOrderFilter) -> PrintOrderResult<Vec<PrintOrder>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .limit(filter.limit)
            .skip(filter.offset)
            .build();
        self.find_many(build_filter(&filter), options).await
    }

    #[instrument(skip(self))]
    async fn count(&self, filter: PrintOrderFilter) -> PrintOrderResult<u64> {
        Ok(self.collection.count_documents(build_filter(&filter)).await?)
    }

    #[instrument(skip(self, order), fields(print_order_id = %order.id))]
    async fn update(
        &self,
        order: PrintOrder,
        expected_status: PrintStatus,
    ) -> PrintOrderResult<PrintOrder> {
        let mut filter = id_filter(order.id);
        filter.insert("status", expected_status.to_string());

        let result = self.collection.replace_one(filter, &order).await?;
        if result.matched_count == 0 {
            return match self.get_by_id(order.id).await? {
                Some(_) => Err(PrintOrderError::ConcurrentUpdate),
                None => Err(PrintOrderError::NotFound(order.id)),
            };
        }
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn created_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PrintOrderResult<Vec<PrintOrder>> {
        let mut filter = doc! {};
        if let Some(range) = day_range(Some(from), Some(to)) {
            filter.insert("created_at", range);
        }
        let options = FindOptions::builder().sort(doc! { "created_at": 1 }).build();
        self.find_many(filter, options).await
    }

    #[instrument(skip(self))]
    async fn count_open(&self) -> PrintOrderResult<u64> {
        Ok(self.collection.count_documents(open_filter()).await?)
    }
}
