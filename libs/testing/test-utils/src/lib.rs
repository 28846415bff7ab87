//! Shared test utilities for domain testing
//!
//! - `TestMongo`: MongoDB container with automatic cleanup
//! - `http`: auth claims and multipart bodies for handler tests
//! - `TestDataBuilder`: deterministic test data generation
//! - `assertions`: custom assertion helpers
//!
//! ```rust,no_run
//! use test_utils::{TestDataBuilder, TestMongo};
//!
//! #[tokio::test]
//! async fn my_mongo_test() {
//!     let mongo = TestMongo::new().await;
//!     let db = mongo.fresh_database();
//!     let builder = TestDataBuilder::from_test_name("my_mongo_test");
//!
//!     let email = builder.email("buyer");
//!     let sku = builder.sku("BC");
//! }
//! ```

use uuid::Uuid;

pub mod http;
mod mongo;

pub use http::{Part, admin_claims, customer_claims, multipart_body, user_claims};
pub use mongo::TestMongo;

/// Builder for test data with deterministic randomization
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from the test name so every test gets its own stable values.
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_create_product");
    /// assert_eq!(builder.user_id(), TestDataBuilder::from_test_name("test_create_product").user_id());
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    pub fn user_id(&self) -> Uuid {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        Uuid::from_bytes(uuid_bytes)
    }

    /// `test-{prefix}-{seed}-{suffix}`
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    pub fn email(&self, local: &str) -> String {
        format!("{}.{}@example.com", local, self.seed)
    }

    /// Upper-case SKU such as `BC-1A2B3C4D`.
    pub fn sku(&self, prefix: &str) -> String {
        format!("{}-{:08X}", prefix, self.seed as u32)
    }
}

/// Test assertion helpers
pub mod assertions {
    use uuid::Uuid;

    pub fn assert_uuid_eq(actual: Uuid, expected: Uuid, context: &str) {
        assert_eq!(
            actual, expected,
            "{}: expected UUID {}, got {}",
            context, expected, actual
        );
    }

    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert a cents amount, printing both sides as currency on failure.
    pub fn assert_cents(actual: i64, expected: i64, context: &str) {
        assert_eq!(
            actual,
            expected,
            "{}: expected {}.{:02}, got {}.{:02}",
            context,
            expected / 100,
            expected % 100,
            actual / 100,
            actual % 100
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let a = TestDataBuilder::new(42);
        let b = TestDataBuilder::new(42);

        assert_eq!(a.user_id(), b.user_id());
        assert_eq!(a.name("product", "main"), b.name("product", "main"));
        assert_eq!(a.email("buyer"), "buyer.42@example.com");
        assert_eq!(a.sku("BC"), "BC-0000002A");
    }

    #[test]
    fn test_data_builder_different_names() {
        let a = TestDataBuilder::from_test_name("test1");
        let b = TestDataBuilder::from_test_name("test2");
        assert_ne!(a.user_id(), b.user_id());
    }
}
