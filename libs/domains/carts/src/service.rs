//! Cart Service - Business logic layer

use domain_products::{Product, ProductRepository};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{CartError, CartResult};
use crate::models::{
    AddItemRequest, Cart, CartLinesRequest, MAX_CART_LINES, MAX_LINE_QUANTITY,
    MAX_WISHLIST_ITEMS, MergeIssue, MergeIssueKind, MergeResult, MoveToCartRequest, PricedCart,
    SetQuantityRequest, WishlistView, merge_lines, price_cart, wishlist_view,
};
use crate::repository::CartRepository;

/// Reads and writes of one cart that may race with another request of the
/// same user before the conflict is returned.
const SAVE_ATTEMPTS: usize = 3;

/// Server-side cart and wishlist, priced from the live catalog on every read
pub struct CartService<R: CartRepository, P: ProductRepository> {
    carts: Arc<R>,
    products: Arc<P>,
}

impl<R: CartRepository, P: ProductRepository> Clone for CartService<R, P> {
    fn clone(&self) -> Self {
        Self {
            carts: Arc::clone(&self.carts),
            products: Arc::clone(&self.products),
        }
    }
}

impl<R: CartRepository, P: ProductRepository> CartService<R, P> {
    pub fn new(carts: R, products: P) -> Self {
        Self {
            carts: Arc::new(carts),
            products: Arc::new(products),
        }
    }

    async fn load(&self, user_id: Uuid) -> CartResult<Cart> {
        Ok(self
            .carts
            .get(user_id)
            .await?
            .unwrap_or_else(|| Cart::new(user_id)))
    }

    /// Apply `change` to the stored cart and save it, starting over from a
    /// fresh read when another request saved the cart in between.
    async fn modify<T>(
        &self,
        user_id: Uuid,
        mut change: impl FnMut(&mut Cart) -> CartResult<T>,
    ) -> CartResult<(Cart, T)> {
        let mut attempt = 1;
        loop {
            let stored = self.carts.get(user_id).await?;
            let expected = stored.as_ref().map(|c| c.updated_at);
            let mut cart = stored.unwrap_or_else(|| Cart::new(user_id));
            let output = change(&mut cart)?;

            match self.carts.save(cart, expected).await {
                Ok(cart) => return Ok((cart, output)),
                Err(CartError::ConcurrentUpdate) if attempt < SAVE_ATTEMPTS => {
                    tracing::debug!(%user_id, attempt, "Cart changed underneath, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn catalog(&self, ids: &[Uuid]) -> CartResult<HashMap<Uuid, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let products = self.products.get_by_ids(ids).await?;
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }

    async fn product(&self, id: Uuid) -> CartResult<Product> {
        self.products
            .get_by_id(id)
            .await?
            .ok_or(CartError::ProductNotFound(id))
    }

    async fn priced(&self, cart: &Cart) -> CartResult<PricedCart> {
        let lines = cart.lines();
        let ids: Vec<Uuid> = lines.iter().map(|(id, _)| *id).collect();
        let products = self.catalog(&ids).await?;
        Ok(price_cart(&lines, &products))
    }

    /// The user's cart priced against the current catalog
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> CartResult<PricedCart> {
        let cart = self.load(user_id).await?;
        self.priced(&cart).await
    }

    /// Add `quantity` units, merging with an existing line
    #[instrument(skip(self, input), fields(product_id = %input.product_id))]
    pub async fn add_item(&self, user_id: Uuid, input: AddItemRequest) -> CartResult<PricedCart> {
        input
            .validate()
            .map_err(|e| CartError::Validation(e.to_string()))?;

        let product = self.product(input.product_id).await?;
        let (cart, ()) = self
            .modify(user_id, |cart| add_units(cart, &product, input.quantity))
            .await?;
        tracing::info!(%user_id, product_id = %product.id, quantity = input.quantity, "Cart item added");
        self.priced(&cart).await
    }

    /// Replace a line's quantity; 0 removes the line
    #[instrument(skip(self, input))]
    pub async fn set_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        input: SetQuantityRequest,
    ) -> CartResult<PricedCart> {
        input
            .validate()
            .map_err(|e| CartError::Validation(e.to_string()))?;

        let product = if input.quantity > 0 {
            Some(self.product(product_id).await?)
        } else {
            None
        };
        let (cart, ()) = self
            .modify(user_id, |cart| {
                if !cart.contains(product_id) {
                    return Err(CartError::ItemNotFound(product_id));
                }
                if let Some(product) = &product {
                    check_purchase(product, input.quantity)?;
                }
                cart.set_quantity(product_id, input.quantity);
                Ok(())
            })
            .await?;
        self.priced(&cart).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> CartResult<PricedCart> {
        let (cart, ()) = self
            .modify(user_id, |cart| {
                if cart.remove(product_id) {
                    Ok(())
                } else {
                    Err(CartError::ItemNotFound(product_id))
                }
            })
            .await?;
        self.priced(&cart).await
    }

    /// Empty the cart; the wishlist is kept
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> CartResult<()> {
        if self.carts.get(user_id).await?.is_none() {
            return Ok(());
        }
        self.modify(user_id, |cart| {
            cart.clear();
            Ok(())
        })
        .await?;
        tracing::info!(%user_id, "Cart cleared");
        Ok(())
    }

    /// Merge a cart kept by the client before sign-in.
    ///
    /// Quantities add up and are capped by stock and the per-line limit.
    /// Lines that cannot be taken are reported instead of failing the merge.
    #[instrument(skip(self, input), fields(lines = input.items.len()))]
    pub async fn merge(&self, user_id: Uuid, input: CartLinesRequest) -> CartResult<MergeResult> {
        input
            .validate()
            .map_err(|e| CartError::Validation(e.to_string()))?;

        let incoming = merge_lines(input.items.iter().map(|l| (l.product_id, l.quantity)));
        let ids: Vec<Uuid> = incoming.iter().map(|(id, _)| *id).collect();
        let products = self.catalog(&ids).await?;
        let (cart, issues) = self
            .modify(user_id, |cart| Ok(merge_into(cart, &incoming, &products)))
            .await?;

        tracing::info!(%user_id, issues = issues.len(), "Client cart merged");
        Ok(MergeResult {
            cart: self.priced(&cart).await?,
            issues,
        })
    }

    /// Price a cart that only exists on the client
    #[instrument(skip(self, input), fields(lines = input.items.len()))]
    pub async fn quote(&self, input: CartLinesRequest) -> CartResult<PricedCart> {
        input
            .validate()
            .map_err(|e| CartError::Validation(e.to_string()))?;

        let lines = merge_lines(input.items.iter().map(|l| (l.product_id, l.quantity)));
        let ids: Vec<Uuid> = lines.iter().map(|(id, _)| *id).collect();
        let products = self.catalog(&ids).await?;
        Ok(price_cart(&lines, &products))
    }

    #[instrument(skip(self))]
    pub async fn wishlist(&self, user_id: Uuid) -> CartResult<WishlistView> {
        let cart = self.load(user_id).await?;
        self.wishlist_of(&cart).await
    }

    async fn wishlist_of(&self, cart: &Cart) -> CartResult<WishlistView> {
        let ids: Vec<Uuid> = cart.wishlist.iter().map(|i| i.product_id).collect();
        let products = self.catalog(&ids).await?;
        Ok(wishlist_view(&cart.wishlist, &products))
    }

    /// Add a product to the wishlist; adding it twice is a no-op
    #[instrument(skip(self))]
    pub async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> CartResult<WishlistView> {
        self.product(product_id).await?;

        let (cart, ()) = self
            .modify(user_id, |cart| {
                if !cart.in_wishlist(product_id) && cart.wishlist.len() >= MAX_WISHLIST_ITEMS {
                    return Err(CartError::WishlistFull(MAX_WISHLIST_ITEMS));
                }
                cart.wish(product_id);
                Ok(())
            })
            .await?;
        self.wishlist_of(&cart).await
    }

    #[instrument(skip(self))]
    pub async fn remove_from_wishlist(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> CartResult<WishlistView> {
        let (cart, ()) = self
            .modify(user_id, |cart| {
                if cart.unwish(product_id) {
                    Ok(())
                } else {
                    Err(CartError::WishlistItemNotFound(product_id))
                }
            })
            .await?;
        self.wishlist_of(&cart).await
    }

    /// Put a wishlist product in the cart and take it off the wishlist
    #[instrument(skip(self, input))]
    pub async fn move_to_cart(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        input: MoveToCartRequest,
    ) -> CartResult<PricedCart> {
        input
            .validate()
            .map_err(|e| CartError::Validation(e.to_string()))?;

        if !self.load(user_id).await?.in_wishlist(product_id) {
            return Err(CartError::WishlistItemNotFound(product_id));
        }

        let product = self.product(product_id).await?;
        let (cart, ()) = self
            .modify(user_id, |cart| {
                if !cart.in_wishlist(product_id) {
                    return Err(CartError::WishlistItemNotFound(product_id));
                }
                add_units(cart, &product, input.quantity.unwrap_or(1))?;
                cart.unwish(product_id);
                Ok(())
            })
            .await?;
        tracing::info!(%user_id, %product_id, "Wishlist item moved to cart");
        self.priced(&cart).await
    }
}

/// Fold client lines into `cart`, reporting the ones that could not be
/// taken in full
fn merge_into(
    cart: &mut Cart,
    incoming: &[(Uuid, i32)],
    products: &HashMap<Uuid, Product>,
) -> Vec<MergeIssue> {
    let mut issues = Vec::new();
    for &(product_id, quantity) in incoming {
        let issue = |kind, requested, accepted| MergeIssue {
            product_id,
            kind,
            requested,
            accepted,
        };

        let Some(product) = products.get(&product_id) else {
            issues.push(issue(MergeIssueKind::NotFound, quantity, 0));
            continue;
        };
        if !product.is_purchasable() {
            issues.push(issue(MergeIssueKind::Unavailable, quantity, 0));
            continue;
        }

        let existing = cart.quantity_of(product_id);
        if existing == 0 && cart.items.len() >= MAX_CART_LINES {
            issues.push(issue(MergeIssueKind::CartFull, quantity, 0));
            continue;
        }

        let requested = existing.saturating_add(quantity);
        let accepted = requested.min(MAX_LINE_QUANTITY).min(product.stock);
        if accepted < requested {
            issues.push(issue(MergeIssueKind::Capped, requested, accepted));
        }
        cart.set_quantity(product_id, accepted);
    }
    issues
}

fn check_purchase(product: &Product, quantity: i32) -> CartResult<()> {
    if !product.is_purchasable() {
        return Err(CartError::ProductUnavailable(product.id));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(CartError::QuantityLimit(MAX_LINE_QUANTITY));
    }
    if quantity > product.stock {
        return Err(CartError::InsufficientStock {
            available: product.stock,
            requested: quantity,
        });
    }
    Ok(())
}

fn add_units(cart: &mut Cart, product: &Product, quantity: i32) -> CartResult<()> {
    let existing = cart.quantity_of(product.id);
    if existing == 0 && cart.items.len() >= MAX_CART_LINES {
        return Err(CartError::CartFull(MAX_CART_LINES));
    }
    let total = existing.saturating_add(quantity);
    check_purchase(product, total)?;
    cart.set_quantity(product.id, total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CartLineInput;
    use crate::repository::MockCartRepository;
    use domain_products::{
        CreateProduct, MockProductRepository, ProductCategory, ProductStatus,
    };
    use chrono::Duration;
    use mockall::Sequence;
    use mockall::predicate::*;

    fn product(stock: i32) -> Product {
        Product::new(CreateProduct {
            name: "Letterhead".to_string(),
            description: String::new(),
            price: 1500,
            compare_at_price: None,
            stock,
            category: ProductCategory::Stationery,
            status: ProductStatus::Active,
            images: vec![],
            sku: Some("LH-1".to_string()),
            brand: None,
            tags: vec![],
            attributes: Default::default(),
            featured: false,
            min_order_quantity: 1,
        })
    }

    fn catalog_with(products: Vec<Product>) -> MockProductRepository {
        let mut mock = MockProductRepository::new();
        let by_id = products.clone();
        mock.expect_get_by_id()
            .returning(move |id| Ok(by_id.iter().find(|p| p.id == id).cloned()));
        mock.expect_get_by_ids().returning(move |ids| {
            Ok(products
                .iter()
                .filter(|p| ids.contains(&p.id))
                .cloned()
                .collect())
        });
        mock
    }

    fn saving_carts(existing: Option<Cart>) -> MockCartRepository {
        let mut carts = MockCartRepository::new();
        carts.expect_get().returning(move |_| Ok(existing.clone()));
        carts.expect_save().returning(|cart, _| Ok(cart));
        carts
    }

    #[tokio::test]
    async fn test_add_item_merges_quantities() {
        let user_id = Uuid::now_v7();
        let p = product(10);
        let mut cart = Cart::new(user_id);
        cart.set_quantity(p.id, 3);

        let service = CartService::new(saving_carts(Some(cart)), catalog_with(vec![p.clone()]));
        let priced = service
            .add_item(
                user_id,
                AddItemRequest {
                    product_id: p.id,
                    quantity: 2,
                },
            )
            .await
            .unwrap();

        assert_eq!(priced.lines[0].quantity, 5);
        assert_eq!(priced.subtotal, 7500);
    }

    #[tokio::test]
    async fn test_add_item_respects_stock() {
        let p = product(2);
        let service = CartService::new(saving_carts(None), catalog_with(vec![p.clone()]));

        let result = service
            .add_item(
                Uuid::now_v7(),
                AddItemRequest {
                    product_id: p.id,
                    quantity: 3,
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(CartError::InsufficientStock {
                available: 2,
                requested: 3
            })
        ));
    }

    #[tokio::test]
    async fn test_add_item_unknown_product() {
        let mut carts = MockCartRepository::new();
        carts.expect_save().never();
        let service = CartService::new(carts, catalog_with(vec![]));

        let id = Uuid::now_v7();
        let result = service
            .add_item(
                Uuid::now_v7(),
                AddItemRequest {
                    product_id: id,
                    quantity: 1,
                },
            )
            .await;
        assert!(matches!(result, Err(CartError::ProductNotFound(pid)) if pid == id));
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes_line() {
        let user_id = Uuid::now_v7();
        let p = product(5);
        let mut cart = Cart::new(user_id);
        cart.set_quantity(p.id, 2);

        let service = CartService::new(saving_carts(Some(cart)), catalog_with(vec![p.clone()]));
        let priced = service
            .set_quantity(user_id, p.id, SetQuantityRequest { quantity: 0 })
            .await
            .unwrap();
        assert!(priced.lines.is_empty());

        let missing = service
            .set_quantity(user_id, Uuid::now_v7(), SetQuantityRequest { quantity: 1 })
            .await;
        assert!(matches!(missing, Err(CartError::ItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_merge_caps_and_reports() {
        let user_id = Uuid::now_v7();
        let plenty = product(100);
        let scarce = product(4);
        let mut retired = product(10);
        retired.status = ProductStatus::Discontinued;
        let unknown = Uuid::now_v7();

        let mut cart = Cart::new(user_id);
        cart.set_quantity(scarce.id, 3);

        let mut carts = MockCartRepository::new();
        carts
            .expect_get()
            .with(eq(user_id))
            .returning(move |_| Ok(Some(cart.clone())));
        carts.expect_save().times(1).returning(|cart, _| Ok(cart));

        let service = CartService::new(
            carts,
            catalog_with(vec![plenty.clone(), scarce.clone(), retired.clone()]),
        );
        let lines = [(plenty.id, 2), (scarce.id, 5), (retired.id, 1), (unknown, 1), (plenty.id, 1)];
        let result = service
            .merge(
                user_id,
                CartLinesRequest {
                    items: lines
                        .iter()
                        .map(|&(product_id, quantity)| CartLineInput {
                            product_id,
                            quantity,
                        })
                        .collect(),
                },
            )
            .await
            .unwrap();

        let quantities: HashMap<Uuid, i32> = result
            .cart
            .lines
            .iter()
            .map(|l| (l.product_id, l.quantity))
            .collect();
        assert_eq!(quantities[&plenty.id], 3);
        assert_eq!(quantities[&scarce.id], 4);
        assert_eq!(result.issues.len(), 3);

        let capped = result
            .issues
            .iter()
            .find(|i| i.kind == MergeIssueKind::Capped)
            .unwrap();
        assert_eq!((capped.requested, capped.accepted), (8, 4));
        assert!(result.issues.iter().any(|i| i.product_id == unknown && i.kind == MergeIssueKind::NotFound));
        assert!(result.issues.iter().any(|i| i.product_id == retired.id && i.kind == MergeIssueKind::Unavailable));
    }

    #[tokio::test]
    async fn test_quote_does_not_touch_storage() {
        let mut carts = MockCartRepository::new();
        carts.expect_get().never();
        carts.expect_save().never();
        let p = product(10);

        let service = CartService::new(carts, catalog_with(vec![p.clone()]));
        let priced = service
            .quote(CartLinesRequest {
                items: vec![
                    CartLineInput {
                        product_id: p.id,
                        quantity: 1,
                    },
                    CartLineInput {
                        product_id: p.id,
                        quantity: 2,
                    },
                ],
            })
            .await
            .unwrap();
        assert_eq!(priced.lines.len(), 1);
        assert_eq!(priced.subtotal, 4500);
    }

    #[tokio::test]
    async fn test_move_to_cart() {
        let user_id = Uuid::now_v7();
        let p = product(10);
        let mut cart = Cart::new(user_id);
        cart.wish(p.id);

        let mut carts = MockCartRepository::new();
        carts.expect_get().returning(move |_| Ok(Some(cart.clone())));
        carts
            .expect_save()
            .withf(|c, _| c.wishlist.is_empty() && c.items.len() == 1)
            .returning(|cart, _| Ok(cart));

        let service = CartService::new(carts, catalog_with(vec![p.clone()]));
        let priced = service
            .move_to_cart(user_id, p.id, MoveToCartRequest { quantity: Some(2) })
            .await
            .unwrap();
        assert_eq!(priced.item_count, 2);

        let not_wished = service
            .move_to_cart(user_id, Uuid::now_v7(), MoveToCartRequest::default())
            .await;
        assert!(matches!(not_wished, Err(CartError::WishlistItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_add_item_retries_on_concurrent_save() {
        let user_id = Uuid::now_v7();
        let pens = product(10);
        let paper = product(10);

        // another request adds paper between our read and our write
        let mut first = Cart::new(user_id);
        first.set_quantity(pens.id, 1);
        let mut second = first.clone();
        second.set_quantity(paper.id, 2);
        second.updated_at = first.updated_at + Duration::milliseconds(5);
        let (seen_first, seen_second) = (first.updated_at, second.updated_at);

        let mut seq = Sequence::new();
        let mut carts = MockCartRepository::new();
        carts
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(first.clone())));
        carts
            .expect_save()
            .withf(move |_, expected| *expected == Some(seen_first))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(CartError::ConcurrentUpdate));
        carts
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(second.clone())));
        carts
            .expect_save()
            .withf(move |_, expected| *expected == Some(seen_second))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|cart, _| Ok(cart));

        let service = CartService::new(carts, catalog_with(vec![pens.clone(), paper.clone()]));
        let priced = service
            .add_item(
                user_id,
                AddItemRequest {
                    product_id: pens.id,
                    quantity: 2,
                },
            )
            .await
            .unwrap();

        let quantities: HashMap<Uuid, i32> = priced
            .lines
            .iter()
            .map(|l| (l.product_id, l.quantity))
            .collect();
        assert_eq!(quantities[&pens.id], 3);
        assert_eq!(quantities[&paper.id], 2);
    }

    #[tokio::test]
    async fn test_persistent_conflict_is_returned() {
        let user_id = Uuid::now_v7();
        let p = product(10);

        let mut carts = MockCartRepository::new();
        carts.expect_get().times(SAVE_ATTEMPTS).returning(|_| Ok(None));
        carts
            .expect_save()
            .withf(|_, expected| expected.is_none())
            .times(SAVE_ATTEMPTS)
            .returning(|_, _| Err(CartError::ConcurrentUpdate));

        let service = CartService::new(carts, catalog_with(vec![p.clone()]));
        let result = service.add_to_wishlist(user_id, p.id).await;
        assert!(matches!(result, Err(CartError::ConcurrentUpdate)));
    }
}
