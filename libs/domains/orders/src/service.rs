//! Order Service - checkout and order lifecycle

use chrono::Utc;
use domain_products::{Product, ProductRepository};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::config::PricingConfig;
use crate::error::{OrderError, OrderResult};
use crate::models::{
    CancelOrderRequest, CustomerInfo, Order, OrderFilter, OrderItem, OrderList, OrderStatus,
    PaymentStatus, PlaceOrderRequest, StatusChange, UpdatePaymentRequest, UpdateStatusRequest,
    compute_totals, generate_order_number,
};
use crate::repository::OrderRepository;

/// Attempts at finding a free order number before giving up
const ORDER_NUMBER_ATTEMPTS: usize = 3;

pub struct OrderService<R: OrderRepository, P: ProductRepository> {
    orders: Arc<R>,
    products: Arc<P>,
    pricing: PricingConfig,
}

impl<R: OrderRepository, P: ProductRepository> Clone for OrderService<R, P> {
    fn clone(&self) -> Self {
        Self {
            orders: Arc::clone(&self.orders),
            products: Arc::clone(&self.products),
            pricing: self.pricing.clone(),
        }
    }
}

impl<R: OrderRepository, P: ProductRepository> OrderService<R, P> {
    pub fn new(orders: R, products: P, pricing: PricingConfig) -> Self {
        Self {
            orders: Arc::new(orders),
            products: Arc::new(products),
            pricing,
        }
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Place an order for `user_id`.
    ///
    /// Lines for the same product are merged and priced from the catalog.
    /// Stock is taken one product at a time with a conditional update; if any
    /// product runs short, everything already taken is put back.
    #[instrument(skip(self, customer, input), fields(lines = input.items.len()))]
    pub async fn place_order(
        &self,
        user_id: Uuid,
        customer: CustomerInfo,
        input: PlaceOrderRequest,
    ) -> OrderResult<Order> {
        input
            .validate()
            .map_err(|e| OrderError::Validation(e.to_string()))?;

        let mut lines: Vec<(Uuid, i32)> = Vec::new();
        for line in &input.items {
            match lines.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, q)) => *q = q.saturating_add(line.quantity),
                None => lines.push((line.product_id, line.quantity)),
            }
        }

        let ids: Vec<Uuid> = lines.iter().map(|(id, _)| *id).collect();
        let products: HashMap<Uuid, Product> = self
            .products
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let items = lines
            .iter()
            .map(|&(product_id, quantity)| {
                let product = products
                    .get(&product_id)
                    .ok_or(OrderError::ProductNotFound(product_id))?;
                order_item(product, quantity)
            })
            .collect::<OrderResult<Vec<_>>>()?;

        self.take_stock(&items).await?;

        let totals = compute_totals(&items, input.shipping_method, &self.pricing);
        let now = Utc::now();
        let mut order = Order {
            id: Uuid::now_v7(),
            order_number: generate_order_number(now),
            user_id,
            customer: CustomerInfo {
                name: input.name.unwrap_or(customer.name),
                email: customer.email,
                phone: input.phone.or(customer.phone),
            },
            items,
            subtotal: totals.subtotal,
            shipping_fee: totals.shipping_fee,
            tax: totals.tax,
            total: totals.total,
            shipping_method: input.shipping_method,
            shipping_address: input.shipping_address,
            payment_method: input.payment_method,
            payment_status: PaymentStatus::Unpaid,
            status: OrderStatus::Pending,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                note: None,
                by: None,
                at: now,
            }],
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        let mut attempt = 1;
        loop {
            match self.orders.create(order.clone()).await {
                Ok(created) => {
                    tracing::info!(
                        order_id = %created.id,
                        order_number = %created.order_number,
                        %user_id,
                        total = created.total,
                        "Order placed"
                    );
                    return Ok(created);
                }
                Err(OrderError::DuplicateOrderNumber) if attempt < ORDER_NUMBER_ATTEMPTS => {
                    attempt += 1;
                    order.order_number = generate_order_number(now);
                }
                Err(e) => {
                    self.restore_stock(&order).await;
                    return Err(e);
                }
            }
        }
    }

    /// Take stock for every item, putting back what was taken on failure.
    async fn take_stock(&self, items: &[OrderItem]) -> OrderResult<()> {
        let mut taken: Vec<&OrderItem> = Vec::with_capacity(items.len());

        for item in items {
            let outcome = self.products.take_stock(item.product_id, item.quantity).await;
            let failure = match outcome {
                Ok(Some(_)) => {
                    taken.push(item);
                    continue;
                }
                Ok(None) => {
                    let available = match self.products.get_by_id(item.product_id).await {
                        Ok(Some(p)) => p.stock,
                        _ => 0,
                    };
                    OrderError::InsufficientStock {
                        name: item.name.clone(),
                        available,
                        requested: item.quantity,
                    }
                }
                Err(e) => e.into(),
            };

            for done in taken {
                self.put_back(done.product_id, done.quantity).await;
            }
            return Err(failure);
        }

        Ok(())
    }

    async fn restore_stock(&self, order: &Order) {
        for (product_id, quantity) in order.stock_lines() {
            self.put_back(product_id, quantity).await;
        }
    }

    async fn put_back(&self, product_id: Uuid, quantity: i32) {
        if let Err(e) = self.products.update_stock(product_id, quantity).await {
            tracing::error!(%product_id, quantity, error = %e, "Failed to restore stock");
        }
    }

    /// The caller's orders, newest first
    #[instrument(skip(self))]
    pub async fn list_my_orders(&self, user_id: Uuid, limit: i64, offset: u64) -> OrderResult<OrderList> {
        self.list_orders(OrderFilter::for_user(user_id, limit, offset)).await
    }

    /// One of the caller's orders; other users' orders look missing
    #[instrument(skip(self))]
    pub async fn get_my_order(&self, user_id: Uuid, id: Uuid) -> OrderResult<Order> {
        let order = self.get_order(id).await?;
        if order.user_id != user_id {
            return Err(OrderError::NotFound(id));
        }
        Ok(order)
    }

    /// Cancel one of the caller's orders while it is pending or confirmed
    #[instrument(skip(self, input))]
    pub async fn cancel_my_order(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: CancelOrderRequest,
    ) -> OrderResult<Order> {
        input
            .validate()
            .map_err(|e| OrderError::Validation(e.to_string()))?;

        let order = self.get_my_order(user_id, id).await?;
        if !order.status.customer_cancellable() {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }
        let note = input.reason.or_else(|| Some("Cancelled by customer".to_string()));
        self.change_status(order, OrderStatus::Cancelled, note, Some(user_id))
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_orders(&self, filter: OrderFilter) -> OrderResult<OrderList> {
        let filter = filter.normalized();
        let total = self.orders.count(filter.clone()).await?;
        let (limit, offset) = (filter.limit, filter.offset);
        let data = self.orders.list(filter).await?;
        Ok(OrderList {
            data,
            total,
            limit,
            offset,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, id: Uuid) -> OrderResult<Order> {
        self.orders
            .get_by_id(id)
            .await?
            .ok_or(OrderError::NotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn get_by_number(&self, order_number: &str) -> OrderResult<Order> {
        self.orders
            .get_by_number(order_number)
            .await?
            .ok_or_else(|| OrderError::NumberNotFound(order_number.to_string()))
    }

    /// Admin status change along the order lifecycle
    #[instrument(skip(self, input), fields(status = %input.status))]
    pub async fn update_status(
        &self,
        admin_id: Uuid,
        id: Uuid,
        input: UpdateStatusRequest,
    ) -> OrderResult<Order> {
        input
            .validate()
            .map_err(|e| OrderError::Validation(e.to_string()))?;

        let order = self.get_order(id).await?;
        self.change_status(order, input.status, input.note, Some(admin_id))
            .await
    }

    async fn change_status(
        &self,
        mut order: Order,
        next: OrderStatus,
        note: Option<String>,
        by: Option<Uuid>,
    ) -> OrderResult<Order> {
        let previous = order.status;
        if !order.transition(next, note, by) {
            return Err(OrderError::InvalidTransition {
                from: previous,
                to: next,
            });
        }

        let order = self.orders.update(order, previous).await?;
        if next == OrderStatus::Cancelled {
            self.restore_stock(&order).await;
        }

        tracing::info!(order_id = %order.id, from = %previous, to = %next, "Order status changed");
        Ok(order)
    }

    /// Admin payment status change (payments are settled outside the system)
    #[instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        id: Uuid,
        input: UpdatePaymentRequest,
    ) -> OrderResult<Order> {
        let mut order = self.get_order(id).await?;
        let current = order.payment_status;
        if current == input.payment_status {
            return Ok(order);
        }
        if !current.can_change_to(input.payment_status) {
            return Err(OrderError::InvalidPaymentChange {
                from: current,
                to: input.payment_status,
            });
        }

        order.payment_status = input.payment_status;
        order.updated_at = Utc::now();
        let status = order.status;
        let order = self.orders.update(order, status).await?;

        tracing::info!(order_id = %order.id, from = %current, to = %order.payment_status, "Payment status changed");
        Ok(order)
    }
}

/// Price one merged line, enforcing availability and the minimum quantity
fn order_item(product: &Product, quantity: i32) -> OrderResult<OrderItem> {
    if !product.is_purchasable() {
        return Err(OrderError::ProductUnavailable(product.name.clone()));
    }
    if quantity < product.min_order_quantity {
        return Err(OrderError::BelowMinimum {
            name: product.name.clone(),
            minimum: product.min_order_quantity,
        });
    }
    if quantity > product.stock {
        return Err(OrderError::InsufficientStock {
            name: product.name.clone(),
            available: product.stock,
            requested: quantity,
        });
    }

    Ok(OrderItem {
        product_id: product.id,
        name: product.name.clone(),
        sku: product.sku.clone(),
        unit_price: product.price,
        quantity,
        line_total: product.price * i64::from(quantity),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderLineInput, PaymentMethod, ShippingMethod};
    use crate::repository::MockOrderRepository;
    use domain_products::{
        CreateProduct, MockProductRepository, ProductCategory, ProductError, ProductStatus,
    };
    use mockall::predicate::*;

    fn product(name: &str, price: i64, stock: i32, min: i32) -> Product {
        Product::new(CreateProduct {
            name: name.to_string(),
            description: String::new(),
            price,
            compare_at_price: None,
            stock,
            category: ProductCategory::BusinessCards,
            status: ProductStatus::Active,
            images: vec![],
            sku: None,
            brand: None,
            tags: vec![],
            attributes: Default::default(),
            featured: false,
            min_order_quantity: min,
        })
    }

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Ann".into(),
            email: "ann@example.com".into(),
            phone: None,
        }
    }

    fn pickup(lines: &[(Uuid, i32)]) -> PlaceOrderRequest {
        PlaceOrderRequest {
            items: lines
                .iter()
                .map(|&(product_id, quantity)| OrderLineInput {
                    product_id,
                    quantity,
                })
                .collect(),
            shipping_method: ShippingMethod::Pickup,
            shipping_address: None,
            payment_method: PaymentMethod::PayOnPickup,
            name: None,
            phone: Some("555-0100".into()),
            notes: None,
        }
    }

    fn catalog(products: Vec<Product>) -> MockProductRepository {
        let mut mock = MockProductRepository::new();
        let all = products.clone();
        mock.expect_get_by_ids().returning(move |ids| {
            Ok(all.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
        });
        mock.expect_get_by_id()
            .returning(move |id| Ok(products.iter().find(|p| p.id == id).cloned()));
        mock
    }

    #[tokio::test]
    async fn test_place_order_merges_and_prices_lines() {
        let cards = product("Cards", 2500, 50, 1);
        let mut products = catalog(vec![cards.clone()]);
        let taken = cards.clone();
        products
            .expect_take_stock()
            .with(eq(cards.id), eq(3))
            .times(1)
            .returning(move |_, _| Ok(Some(taken.clone())));

        let mut orders = MockOrderRepository::new();
        orders.expect_create().times(1).returning(Ok);

        let service = OrderService::new(orders, products, PricingConfig::default());
        let order = service
            .place_order(Uuid::now_v7(), customer(), pickup(&[(cards.id, 1), (cards.id, 2)]))
            .await
            .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].line_total, 7500);
        assert_eq!(order.shipping_fee, 0);
        assert_eq!(order.total, 7500);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.customer.phone.as_deref(), Some("555-0100"));
        assert!(order.order_number.starts_with("ORD-"));
    }

    #[tokio::test]
    async fn test_place_order_enforces_minimum() {
        let cards = product("Cards", 10, 1000, 100);
        let mut products = catalog(vec![cards.clone()]);
        products.expect_take_stock().never();
        let mut orders = MockOrderRepository::new();
        orders.expect_create().never();

        let service = OrderService::new(orders, products, PricingConfig::default());
        let result = service
            .place_order(Uuid::now_v7(), customer(), pickup(&[(cards.id, 50)]))
            .await;
        assert!(matches!(result, Err(OrderError::BelowMinimum { minimum: 100, .. })));
    }

    #[tokio::test]
    async fn test_place_order_compensates_when_stock_runs_out() {
        let cards = product("Cards", 100, 10, 1);
        let flyers = product("Flyers", 50, 10, 1);
        let mut products = catalog(vec![cards.clone(), flyers.clone()]);

        let taken = cards.clone();
        products
            .expect_take_stock()
            .with(eq(cards.id), eq(2))
            .returning(move |_, _| Ok(Some(taken.clone())));
        // Someone else bought the flyers in the meantime
        products
            .expect_take_stock()
            .with(eq(flyers.id), eq(5))
            .returning(|_, _| Ok(None));
        let restored = cards.clone();
        products
            .expect_update_stock()
            .with(eq(cards.id), eq(2))
            .times(1)
            .returning(move |_, _| Ok(restored.clone()));

        let mut orders = MockOrderRepository::new();
        orders.expect_create().never();

        let service = OrderService::new(orders, products, PricingConfig::default());
        let result = service
            .place_order(
                Uuid::now_v7(),
                customer(),
                pickup(&[(cards.id, 2), (flyers.id, 5)]),
            )
            .await;
        assert!(matches!(result, Err(OrderError::InsufficientStock { .. })));
    }

    #[tokio::test]
    async fn test_place_order_unknown_product() {
        let products = catalog(vec![]);
        let service = OrderService::new(MockOrderRepository::new(), products, PricingConfig::default());

        let id = Uuid::now_v7();
        let result = service
            .place_order(Uuid::now_v7(), customer(), pickup(&[(id, 1)]))
            .await;
        assert!(matches!(result, Err(OrderError::ProductNotFound(pid)) if pid == id));
    }

    #[tokio::test]
    async fn test_place_order_propagates_catalog_errors() {
        let cards = product("Cards", 100, 10, 1);
        let mut products = catalog(vec![cards.clone()]);
        products
            .expect_take_stock()
            .returning(|_, _| Err(ProductError::Database("down".into())));

        let service = OrderService::new(MockOrderRepository::new(), products, PricingConfig::default());
        let result = service
            .place_order(Uuid::now_v7(), customer(), pickup(&[(cards.id, 1)]))
            .await;
        assert!(matches!(result, Err(OrderError::Catalog(ProductError::Database(_)))));
    }

    fn placed_order(user_id: Uuid, status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::now_v7(),
            order_number: generate_order_number(now),
            user_id,
            customer: customer(),
            items: vec![OrderItem {
                product_id: Uuid::now_v7(),
                name: "Cards".into(),
                sku: None,
                unit_price: 100,
                quantity: 4,
                line_total: 400,
            }],
            subtotal: 400,
            shipping_fee: 0,
            tax: 0,
            total: 400,
            shipping_method: ShippingMethod::Pickup,
            shipping_address: None,
            payment_method: PaymentMethod::PayOnPickup,
            payment_status: PaymentStatus::Unpaid,
            status,
            status_history: vec![],
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let user_id = Uuid::now_v7();
        let order = placed_order(user_id, OrderStatus::Confirmed);
        let product_id = order.items[0].product_id;
        let order_id = order.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_get_by_id()
            .with(eq(order_id))
            .returning(move |_| Ok(Some(order.clone())));
        orders
            .expect_update()
            .withf(|o, expected| {
                o.status == OrderStatus::Cancelled && *expected == OrderStatus::Confirmed
            })
            .times(1)
            .returning(|o, _| Ok(o));

        let mut products = MockProductRepository::new();
        let restocked = product("Cards", 100, 4, 1);
        products
            .expect_update_stock()
            .with(eq(product_id), eq(4))
            .times(1)
            .returning(move |_, _| Ok(restocked.clone()));

        let service = OrderService::new(orders, products, PricingConfig::default());
        let cancelled = service
            .cancel_my_order(user_id, order_id, CancelOrderRequest::default())
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(
            cancelled.status_history.last().unwrap().note.as_deref(),
            Some("Cancelled by customer")
        );
    }

    #[tokio::test]
    async fn test_customer_cannot_cancel_processing_or_foreign_orders() {
        let user_id = Uuid::now_v7();
        let processing = placed_order(user_id, OrderStatus::Processing);
        let foreign = placed_order(Uuid::now_v7(), OrderStatus::Pending);
        let (processing_id, foreign_id) = (processing.id, foreign.id);

        let mut orders = MockOrderRepository::new();
        orders.expect_get_by_id().returning(move |id| {
            Ok([&processing, &foreign]
                .into_iter()
                .find(|o| o.id == id)
                .cloned())
        });
        orders.expect_update().never();

        let service =
            OrderService::new(orders, MockProductRepository::new(), PricingConfig::default());
        let result = service
            .cancel_my_order(user_id, processing_id, CancelOrderRequest::default())
            .await;
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));

        let result = service
            .cancel_my_order(user_id, foreign_id, CancelOrderRequest::default())
            .await;
        assert!(matches!(result, Err(OrderError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_admin_status_flow_rejects_skips() {
        let order = placed_order(Uuid::now_v7(), OrderStatus::Pending);
        let id = order.id;
        let mut orders = MockOrderRepository::new();
        orders
            .expect_get_by_id()
            .returning(move |_| Ok(Some(order.clone())));

        let service =
            OrderService::new(orders, MockProductRepository::new(), PricingConfig::default());
        let result = service
            .update_status(
                Uuid::now_v7(),
                id,
                UpdateStatusRequest {
                    status: OrderStatus::Shipped,
                    note: None,
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Shipped
            })
        ));
    }

    #[tokio::test]
    async fn test_payment_status_rules() {
        let order = placed_order(Uuid::now_v7(), OrderStatus::Delivered);
        let id = order.id;
        let mut orders = MockOrderRepository::new();
        orders
            .expect_get_by_id()
            .returning(move |_| Ok(Some(order.clone())));
        orders
            .expect_update()
            .withf(|o, expected| {
                o.payment_status == PaymentStatus::Paid && *expected == OrderStatus::Delivered
            })
            .times(1)
            .returning(|o, _| Ok(o));

        let service =
            OrderService::new(orders, MockProductRepository::new(), PricingConfig::default());
        let refund = service
            .update_payment_status(
                id,
                UpdatePaymentRequest {
                    payment_status: PaymentStatus::Refunded,
                },
            )
            .await;
        assert!(matches!(refund, Err(OrderError::InvalidPaymentChange { .. })));

        let paid = service
            .update_payment_status(
                id,
                UpdatePaymentRequest {
                    payment_status: PaymentStatus::Paid,
                },
            )
            .await
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
    }
}
