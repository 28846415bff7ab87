use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::config::PricingConfig;

pub const MAX_PAGE_SIZE: i64 = 100;

/// Order lifecycle
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Statuses reachable from `self` in one step
    pub fn next_statuses(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Processing, Cancelled],
            Processing => &[Shipped, Cancelled],
            Shipped => &[Delivered],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        self.next_statuses().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.next_statuses().is_empty()
    }

    /// Customers may cancel their own order only before processing starts
    pub fn customer_cancellable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn can_change_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!((self, next), (Unpaid, Paid) | (Paid, Unpaid) | (Paid, Refunded))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    BankTransfer,
    PayOnPickup,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
    Pickup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 100))]
    pub recipient: String,
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    #[validate(length(max = 200))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 2, max = 56))]
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Order line priced from the catalog at checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    /// Cents
    pub unit_price: i64,
    pub quantity: i32,
    /// Cents
    pub line_total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub note: Option<String>,
    /// Who made the change; `None` for the customer placing the order
    pub by: Option<Uuid>,
    pub at: DateTime<Utc>,
}

/// Order entity as stored in MongoDB
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    /// `ORD-YYYYMMDD-XXXXXX`
    pub order_number: String,
    pub user_id: Uuid,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub tax: i64,
    pub total: i64,
    pub shipping_method: ShippingMethod,
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub status_history: Vec<StatusChange>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The result of pricing a set of order lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub tax: i64,
    pub total: i64,
}

/// Price order lines.
///
/// Standard shipping is free once the subtotal reaches the threshold (a zero
/// threshold never makes it free), express always pays the express fee and
/// pickup is free. Tax applies to the subtotal, rounded half up.
pub fn compute_totals(
    items: &[OrderItem],
    method: ShippingMethod,
    config: &PricingConfig,
) -> OrderTotals {
    let subtotal: i64 = items.iter().map(|i| i.line_total).sum();

    let shipping_fee = match method {
        ShippingMethod::Pickup => 0,
        ShippingMethod::Express => config.express_shipping_fee,
        ShippingMethod::Standard
            if config.free_shipping_threshold > 0 && subtotal >= config.free_shipping_threshold =>
        {
            0
        }
        ShippingMethod::Standard => config.shipping_fee,
    };

    let tax = (subtotal * i64::from(config.tax_rate_bps) + 5_000) / 10_000;

    OrderTotals {
        subtotal,
        shipping_fee,
        tax,
        total: subtotal + shipping_fee + tax,
    }
}

/// `ORD-20240501-3FA9C2`: creation date plus six random hex digits. The
/// unique index on `order_number` catches the rare collision.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "ORD-{}-{}",
        now.format("%Y%m%d"),
        random[..6].to_ascii_uppercase()
    )
}

impl Order {
    /// Move to `next`, recording who did it. Returns false when the
    /// transition is not allowed.
    pub fn transition(&mut self, next: OrderStatus, note: Option<String>, by: Option<Uuid>) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        let now = Utc::now();
        self.status = next;
        self.status_history.push(StatusChange {
            status: next,
            note,
            by,
            at: now,
        });
        self.updated_at = now;
        true
    }

    /// `(product_id, quantity)` of every line
    pub fn stock_lines(&self) -> Vec<(Uuid, i32)> {
        self.items.iter().map(|i| (i.product_id, i.quantity)).collect()
    }
}

/// One requested line at checkout; prices always come from the catalog
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 999))]
    pub quantity: i32,
}

/// Checkout request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_checkout"))]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, max = 100), nested)]
    pub items: Vec<OrderLineInput>,
    #[serde(default)]
    pub shipping_method: ShippingMethod,
    /// Required unless `shipping_method` is `pickup`
    #[validate(nested)]
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: PaymentMethod,
    /// Name on the order; the account name when omitted
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

fn validate_checkout(input: &PlaceOrderRequest) -> Result<(), ValidationError> {
    let pickup = input.shipping_method == ShippingMethod::Pickup;
    if !pickup && input.shipping_address.is_none() {
        return Err(ValidationError::new("shipping_address_required")
            .with_message("A shipping address is required for delivery".into()));
    }
    match input.payment_method {
        PaymentMethod::PayOnPickup if !pickup => {
            Err(ValidationError::new("payment_method")
                .with_message("Pay on pickup is only available for pickup orders".into()))
        }
        PaymentMethod::CashOnDelivery if pickup => {
            Err(ValidationError::new("payment_method")
                .with_message("Cash on delivery is not available for pickup orders".into()))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CancelOrderRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePaymentRequest {
    pub payment_status: PaymentStatus,
}

/// Admin order filters
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Placed on or after this day
    pub from: Option<NaiveDate>,
    /// Placed on or before this day
    pub to: Option<NaiveDate>,
    /// Order number or customer email, case-insensitive
    pub search: Option<String>,
    /// Restrict to one customer
    #[serde(skip)]
    pub user_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: u64,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            status: None,
            payment_status: None,
            from: None,
            to: None,
            search: None,
            user_id: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl OrderFilter {
    pub fn for_user(user_id: Uuid, limit: i64, offset: u64) -> Self {
        Self {
            user_id: Some(user_id),
            limit,
            offset,
            ..Self::default()
        }
    }

    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        self
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> i64 {
    20
}

/// Page of orders with the total matching the filter
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderList {
    pub data: Vec<Order>,
    pub total: u64,
    pub limit: i64,
    pub offset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(line_total: i64) -> OrderItem {
        OrderItem {
            product_id: Uuid::now_v7(),
            name: "Poster".to_string(),
            sku: None,
            unit_price: line_total,
            quantity: 1,
            line_total,
        }
    }

    #[test]
    fn test_status_machine() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Shipped));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Delivered.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(Confirmed.customer_cancellable());
        assert!(!Processing.customer_cancellable());
    }

    #[test]
    fn test_payment_changes() {
        use PaymentStatus::*;
        assert!(Unpaid.can_change_to(Paid));
        assert!(Paid.can_change_to(Refunded));
        assert!(!Unpaid.can_change_to(Refunded));
        assert!(!Refunded.can_change_to(Paid));
    }

    #[test]
    fn test_totals_standard_shipping() {
        let config = PricingConfig::default();
        let totals = compute_totals(&[item(1200), item(800)], ShippingMethod::Standard, &config);
        assert_eq!(
            totals,
            OrderTotals {
                subtotal: 2000,
                shipping_fee: 500,
                tax: 0,
                total: 2500
            }
        );

        let free = compute_totals(&[item(5000)], ShippingMethod::Standard, &config);
        assert_eq!(free.shipping_fee, 0);
    }

    #[test]
    fn test_totals_express_pickup_and_tax() {
        let config = PricingConfig {
            tax_rate_bps: 825,
            free_shipping_threshold: 0,
            ..PricingConfig::default()
        };

        let express = compute_totals(&[item(9999)], ShippingMethod::Express, &config);
        assert_eq!(express.shipping_fee, 1500);
        // 9999 * 8.25% = 824.9175
        assert_eq!(express.tax, 825);
        assert_eq!(express.total, 9999 + 1500 + 825);

        let pickup = compute_totals(&[item(100)], ShippingMethod::Pickup, &config);
        assert_eq!(pickup.shipping_fee, 0);

        let never_free = compute_totals(&[item(1_000_000)], ShippingMethod::Standard, &config);
        assert_eq!(never_free.shipping_fee, 500);
    }

    #[test]
    fn test_order_number_format() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let number = generate_order_number(now);
        assert_eq!(number.len(), "ORD-20240501-XXXXXX".len());
        assert!(number.starts_with("ORD-20240501-"));
        assert!(number[13..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_checkout_validation() {
        let request = |method, address: Option<ShippingAddress>, payment| PlaceOrderRequest {
            items: vec![OrderLineInput {
                product_id: Uuid::now_v7(),
                quantity: 1,
            }],
            shipping_method: method,
            shipping_address: address,
            payment_method: payment,
            name: None,
            phone: None,
            notes: None,
        };
        let address = ShippingAddress {
            recipient: "Ann".into(),
            line1: "1 Main St".into(),
            line2: None,
            city: "Springfield".into(),
            state: None,
            postal_code: "12345".into(),
            country: "US".into(),
        };

        assert!(
            request(ShippingMethod::Standard, None, PaymentMethod::BankTransfer)
                .validate()
                .is_err()
        );
        assert!(
            request(ShippingMethod::Pickup, None, PaymentMethod::PayOnPickup)
                .validate()
                .is_ok()
        );
        assert!(
            request(ShippingMethod::Pickup, None, PaymentMethod::CashOnDelivery)
                .validate()
                .is_err()
        );
        assert!(
            request(
                ShippingMethod::Express,
                Some(address),
                PaymentMethod::CashOnDelivery
            )
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn test_transition_records_history() {
        let mut order = Order {
            id: Uuid::now_v7(),
            order_number: "ORD-20240501-ABCDEF".into(),
            user_id: Uuid::now_v7(),
            customer: CustomerInfo {
                name: "Ann".into(),
                email: "ann@example.com".into(),
                phone: None,
            },
            items: vec![item(100)],
            subtotal: 100,
            shipping_fee: 0,
            tax: 0,
            total: 100,
            shipping_method: ShippingMethod::Pickup,
            shipping_address: None,
            payment_method: PaymentMethod::PayOnPickup,
            payment_status: PaymentStatus::Unpaid,
            status: OrderStatus::Pending,
            status_history: vec![],
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(order.transition(OrderStatus::Confirmed, None, None));
        assert!(!order.transition(OrderStatus::Delivered, None, None));
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.status_history.len(), 1);
    }
}
