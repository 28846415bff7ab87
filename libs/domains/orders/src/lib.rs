//! Orders Domain
//!
//! Checkout turns a list of product lines into an order: every line is
//! re-priced from the catalog, stock is taken with per-product conditional
//! updates (and put back if a later line runs short), and the order gets a
//! human friendly `ORD-YYYYMMDD-XXXXXX` number.
//!
//! ```text
//! pending -> confirmed -> processing -> shipped -> delivered
//!    |           |            |
//!    +-----------+------------+--> cancelled (stock returned)
//! ```
//!
//! Customers can cancel while an order is pending or confirmed. Payment is
//! tracked separately (`unpaid`, `paid`, `refunded`) and settled offline.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;

pub use config::PricingConfig;
pub use error::{OrderError, OrderResult};
pub use handlers::ApiDoc;
pub use models::{
    CancelOrderRequest, CustomerInfo, Order, OrderFilter, OrderItem, OrderLineInput, OrderList,
    OrderStatus, OrderTotals, PaymentMethod, PaymentStatus, PlaceOrderRequest, ShippingAddress,
    ShippingMethod, StatusChange, UpdatePaymentRequest, UpdateStatusRequest, compute_totals,
};
pub use mongodb::MongoOrderRepository;
#[cfg(any(test, feature = "mock"))]
pub use repository::MockOrderRepository;
pub use repository::OrderRepository;
pub use service::OrderService;
