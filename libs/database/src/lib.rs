//! MongoDB connection management shared by every domain crate.
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::{MongoConfig, connect_with_retry, RetryConfig};
//!
//! let config = MongoConfig::from_env()?;
//! let db = connect_with_retry(&config, RetryConfig::default()).await?;
//! let products = db.collection::<Product>("products");
//! ```

mod config;
mod connector;
mod error;
mod health;
mod query;
mod retry;

pub use config::MongoConfig;
pub use connector::{connect, connect_with_retry};
pub use error::{DUPLICATE_KEY_CODE, DatabaseError, DatabaseResult, is_duplicate_key};
pub use health::{HealthStatus, check_health, check_health_detailed};
pub use query::{contains_ci, day_range, escape_regex, id_bson, id_filter, ids_in};
pub use retry::{RetryConfig, retry_with_backoff};

pub use mongodb::{Client, Collection, Database};
