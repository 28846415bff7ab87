//! MongoDB implementation of ThreadRepository

use async_trait::async_trait;
use database::{contains_ci, id_bson, id_filter};
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document, doc, to_bson},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::MessageResult;
use crate::models::{MAX_MESSAGES, Message, Side, Thread, ThreadFilter, ThreadStatus};
use crate::repository::ThreadRepository;

pub struct MongoThreadRepository {
    collection: Collection<Thread>,
}

impl MongoThreadRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Thread>("message_threads"),
        }
    }

    pub async fn init_indexes(&self) -> MessageResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "last_message_at": -1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "status": 1, "last_message_at": -1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "unread_by_admin": 1 })
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Message thread indexes initialized");
        Ok(())
    }

    fn after_update() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build()
    }
}

fn build_filter(filter: &ThreadFilter) -> Document {
    let mut query = doc! {};
    if let Some(status) = filter.status {
        query.insert("status", status.to_string());
    }
    if filter.unread_only {
        query.insert("unread_by_admin", true);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = contains_ci(search);
        query.insert(
            "$or",
            vec![
                doc! { "subject": pattern.clone() },
                doc! { "name": pattern.clone() },
                doc! { "email": pattern },
            ],
        );
    }
    query
}

/// Open threads whose message list still has room
fn open_with_room(id: Uuid) -> Document {
    let mut filter = id_filter(id);
    filter.insert("status", ThreadStatus::Open.to_string());
    filter.insert(
        format!("messages.{}", MAX_MESSAGES - 1),
        doc! { "$exists": false },
    );
    filter
}

#[async_trait]
impl ThreadRepository for MongoThreadRepository {
    #[instrument(skip(self, thread), fields(thread_id = %thread.id))]
    async fn create(&self, thread: Thread) -> MessageResult<Thread> {
        self.collection.insert_one(&thread).await?;
        tracing::info!(thread_id = %thread.id, guest = thread.user_id.is_none(), "Thread opened");
        Ok(thread)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> MessageResult<Option<Thread>> {
        Ok(self.collection.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: Uuid) -> MessageResult<Vec<Thread>> {
        let cursor = self
            .collection
            .find(doc! { "user_id": id_bson(user_id) })
            .sort(doc! { "last_message_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: ThreadFilter) -> MessageResult<Vec<Thread>> {
        let options = FindOptions::builder()
            .sort(doc! { "last_message_at": -1 })
            .limit(filter.limit)
            .skip(filter.offset)
            .build();
        let cursor = self
            .collection
            .find(build_filter(&filter))
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    #[instrument(skip(self))]
    async fn count(&self, filter: ThreadFilter) -> MessageResult<u64> {
        Ok(self.collection.count_documents(build_filter(&filter)).await?)
    }

    #[instrument(skip(self, message), fields(author = %message.author))]
    async fn append_message(
        &self,
        id: Uuid,
        message: Message,
    ) -> MessageResult<Option<Thread>> {
        let sent_at = to_bson(&message.sent_at)?;
        let mut set = doc! {
            "last_message_at": sent_at.clone(),
            "updated_at": sent_at,
        };
        set.insert(message.author.other().unread_field(), true);
        set.insert(message.author.unread_field(), false);

        let update = doc! {
            "$push": { "messages": to_bson(&message)? },
            "$set": set,
        };
        let thread = self
            .collection
            .find_one_and_update(open_with_room(id), update)
            .with_options(Self::after_update())
            .await?;
        if thread.is_some() {
            tracing::info!(thread_id = %id, author = %message.author, "Message posted");
        }
        Ok(thread)
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, id: Uuid, side: Side) -> MessageResult<()> {
        let mut set = Document::new();
        set.insert(side.unread_field(), false);
        self.collection
            .update_one(id_filter(id), doc! { "$set": set })
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn count_unread(&self, side: Side, user_id: Option<Uuid>) -> MessageResult<u64> {
        let mut filter = Document::new();
        filter.insert(side.unread_field(), true);
        if let Some(user_id) = user_id {
            filter.insert("user_id", id_bson(user_id));
        }
        Ok(self.collection.count_documents(filter).await?)
    }

    #[instrument(skip(self))]
    async fn set_status(&self, id: Uuid, status: ThreadStatus) -> MessageResult<Option<Thread>> {
        let update = doc! {
            "$set": {
                "status": status.to_string(),
                "updated_at": to_bson(&chrono::Utc::now())?,
            }
        };
        let thread = self
            .collection
            .find_one_and_update(id_filter(id), update)
            .with_options(Self::after_update())
            .await?;
        if thread.is_some() {
            tracing::info!(thread_id = %id, %status, "Thread status changed");
        }
        Ok(thread)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> MessageResult<bool> {
        let result = self.collection.delete_one(id_filter(id)).await?;
        if result.deleted_count > 0 {
            tracing::info!(thread_id = %id, "Thread deleted");
        }
        Ok(result.deleted_count > 0)
    }
}
