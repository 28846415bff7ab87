//! MongoDB implementation of CartRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database::{id_filter, is_duplicate_key};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{doc, to_bson},
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{CartError, CartResult};
use crate::models::Cart;
use crate::repository::CartRepository;

pub struct MongoCartRepository {
    collection: Collection<Cart>,
}

impl MongoCartRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Cart>("carts"),
        }
    }

    /// `_id` is the user id, so only secondary indexes are needed.
    pub async fn init_indexes(&self) -> CartResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "items.product_id": 1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "updated_at": -1 })
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Cart indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl CartRepository for MongoCartRepository {
    #[instrument(skip(self))]
    async fn get(&self, user_id: Uuid) -> CartResult<Option<Cart>> {
        Ok(self.collection.find_one(id_filter(user_id)).await?)
    }

    #[instrument(skip(self, cart), fields(user_id = %cart.user_id, lines = cart.items.len()))]
    async fn save(&self, cart: Cart, expected: Option<DateTime<Utc>>) -> CartResult<Cart> {
        let Some(expected) = expected else {
            return match self.collection.insert_one(&cart).await {
                Ok(_) => Ok(cart),
                Err(e) if is_duplicate_key(&e) => Err(CartError::ConcurrentUpdate),
                Err(e) => Err(e.into()),
            };
        };

        let mut filter = id_filter(cart.user_id);
        filter.insert(
            "updated_at",
            to_bson(&expected).map_err(|e| CartError::Database(e.to_string()))?,
        );
        let result = self.collection.replace_one(filter, &cart).await?;
        if result.matched_count == 0 {
            return Err(CartError::ConcurrentUpdate);
        }
        Ok(cart)
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: Uuid) -> CartResult<bool> {
        let result = self.collection.delete_one(id_filter(user_id)).await?;
        Ok(result.deleted_count > 0)
    }
}
