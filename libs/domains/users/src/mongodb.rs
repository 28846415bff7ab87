//! MongoDB implementation of UserRepository

use async_trait::async_trait;
use database::{contains_ci, id_filter};
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document, doc},
    options::{FindOptions, IndexOptions},
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{MAX_PAGE_SIZE, User, UserFilter, normalize_email};
use crate::repository::UserRepository;

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<User>("users"),
        }
    }

    pub async fn init_indexes(&self) -> UserResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            IndexModel::builder().keys(doc! { "roles": 1 }).build(),
            IndexModel::builder()
                .keys(doc! { "created_at": -1 })
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("User indexes initialized");
        Ok(())
    }
}

fn build_filter(filter: &UserFilter) -> Document {
    let mut query = doc! {};

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query.insert(
            "$or",
            vec![
                doc! { "email": contains_ci(search) },
                doc! { "name": contains_ci(search) },
            ],
        );
    }
    if let Some(role) = filter.role {
        query.insert("roles", role.to_string());
    }
    if let Some(active) = filter.is_active {
        query.insert("is_active", active);
    }

    query
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create(&self, user: User) -> UserResult<User> {
        self.collection.insert_one(&user).await.map_err(|e| {
            if database::is_duplicate_key(&e) {
                UserError::DuplicateEmail(user.email.clone())
            } else {
                e.into()
            }
        })?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        Ok(self.collection.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self))]
    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        Ok(self
            .collection
            .find_one(doc! { "email": normalize_email(email) })
            .await?)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .limit(filter.limit.clamp(1, MAX_PAGE_SIZE))
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
    async fn count(&self, filter: UserFilter) -> UserResult<u64> {
        Ok(self
            .collection
            .count_documents(build_filter(&filter))
            .await?)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update(&self, user: User) -> UserResult<User> {
        let result = self
            .collection
            .replace_one(id_filter(user.id), &user)
            .await
            .map_err(|e| {
                if database::is_duplicate_key(&e) {
                    UserError::DuplicateEmail(user.email.clone())
                } else {
                    e.into()
                }
            })?;

        if result.matched_count == 0 {
            return Err(UserError::NotFound(user.id));
        }
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let result = self.collection.delete_one(id_filter(id)).await?;
        if result.deleted_count > 0 {
            tracing::info!(user_id = %id, "User deleted");
        }
        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self))]
    async fn email_exists(&self, email: &str) -> UserResult<bool> {
        let count = self
            .collection
            .count_documents(doc! { "email": normalize_email(email) })
            .await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn record_login(&self, id: Uuid) -> UserResult<()> {
        self.collection
            .update_one(
                id_filter(id),
                doc! { "$set": { "last_login_at": chrono::Utc::now().to_rfc3339() } },
            )
            .await?;
        Ok(())
    }
}
