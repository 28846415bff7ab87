use mongodb::bson::doc;
use mongodb::{Client, Database, options::ClientOptions};
use tracing::{info, instrument};

use crate::{DatabaseError, DatabaseResult, MongoConfig, RetryConfig, retry_with_backoff};

/// Connect, verify the server answers a ping, and return the configured database.
#[instrument(skip(config), fields(database = %config.database))]
pub async fn connect(config: &MongoConfig) -> DatabaseResult<Database> {
    let mut options = ClientOptions::parse(&config.url).await?;
    options.max_pool_size = Some(config.max_pool_size);
    options.min_pool_size = Some(config.min_pool_size);
    options.connect_timeout = Some(config.connect_timeout);
    options.server_selection_timeout = Some(config.server_selection_timeout);
    options.app_name = config.app_name.clone();

    let client = Client::with_options(options)?;
    let database = client.database(&config.database);

    database
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    info!("Connected to MongoDB");
    Ok(database)
}

/// [`connect`] with exponential backoff, for containers that start before MongoDB.
pub async fn connect_with_retry(
    config: &MongoConfig,
    retry: RetryConfig,
) -> DatabaseResult<Database> {
    retry_with_backoff(|| connect(config), retry).await
}
