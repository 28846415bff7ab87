use chrono::{DateTime, Utc};
use domain_products::Product;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Largest quantity of one product in a cart
pub const MAX_LINE_QUANTITY: i32 = 999;
/// Largest number of distinct products in a cart
pub const MAX_CART_LINES: usize = 100;
pub const MAX_WISHLIST_ITEMS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WishlistItem {
    pub product_id: Uuid,
    pub added_at: DateTime<Utc>,
}

/// Cart and wishlist of one user, stored as a single document keyed by the
/// user id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    #[serde(rename = "_id", alias = "user_id")]
    pub user_id: Uuid,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub wishlist: Vec<WishlistItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            items: Vec::new(),
            wishlist: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn quantity_of(&self, product_id: Uuid) -> i32 {
        self.items
            .iter()
            .find(|i| i.product_id == product_id)
            .map(|i| i.quantity)
            .unwrap_or(0)
    }

    pub fn contains(&self, product_id: Uuid) -> bool {
        self.items.iter().any(|i| i.product_id == product_id)
    }

    /// Set the quantity of a line, adding it when missing and removing it at 0.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: i32) {
        if quantity <= 0 {
            self.items.retain(|i| i.product_id != product_id);
        } else if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity = quantity;
        } else {
            self.items.push(CartItem {
                product_id,
                quantity,
                added_at: Utc::now(),
            });
        }
        self.touch();
    }

    /// Returns false when the product was not in the cart.
    pub fn remove(&mut self, product_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        let removed = self.items.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.touch();
    }

    pub fn in_wishlist(&self, product_id: Uuid) -> bool {
        self.wishlist.iter().any(|i| i.product_id == product_id)
    }

    /// Add to the wishlist; adding twice keeps the first entry.
    pub fn wish(&mut self, product_id: Uuid) {
        if !self.in_wishlist(product_id) {
            self.wishlist.push(WishlistItem {
                product_id,
                added_at: Utc::now(),
            });
            self.touch();
        }
    }

    pub fn unwish(&mut self, product_id: Uuid) -> bool {
        let before = self.wishlist.len();
        self.wishlist.retain(|i| i.product_id != product_id);
        let removed = self.wishlist.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// `(product_id, quantity)` pairs in cart order
    pub fn lines(&self) -> Vec<(Uuid, i32)> {
        self.items.iter().map(|i| (i.product_id, i.quantity)).collect()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Add a product to the cart
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 999))]
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

/// Replace the quantity of a cart line; 0 removes it
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetQuantityRequest {
    #[validate(range(min = 0, max = 999))]
    pub quantity: i32,
}

/// Line of a client-side cart
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CartLineInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 999))]
    pub quantity: i32,
}

/// Client-side cart to price (anonymous quote) or to merge into the server
/// cart after sign-in
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CartLinesRequest {
    #[validate(length(max = 100), nested)]
    pub items: Vec<CartLineInput>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WishlistRequest {
    pub product_id: Uuid,
}

/// Move a wishlist item into the cart
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct MoveToCartRequest {
    #[validate(range(min = 1, max = 999))]
    pub quantity: Option<i32>,
}

fn default_quantity() -> i32 {
    1
}

/// Cart line priced from the current catalog
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub image: Option<String>,
    /// Cents
    pub unit_price: i64,
    pub quantity: i32,
    /// Cents
    pub line_total: i64,
    pub available_stock: i32,
    /// Purchasable and enough stock for the requested quantity
    pub available: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    /// Sum of quantities over every line
    pub item_count: i32,
    /// Cents, available lines only
    pub subtotal: i64,
    /// Products that are missing, not purchasable or short on stock
    pub unavailable: Vec<Uuid>,
}

/// Why a line of a merged cart was dropped or reduced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MergeIssueKind {
    NotFound,
    Unavailable,
    /// Kept with a quantity reduced to the available stock
    Capped,
    CartFull,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MergeIssue {
    pub product_id: Uuid,
    pub kind: MergeIssueKind,
    pub requested: i32,
    pub accepted: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MergeResult {
    pub cart: PricedCart,
    pub issues: Vec<MergeIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WishlistLine {
    pub product_id: Uuid,
    pub added_at: DateTime<Utc>,
    /// `None` when the product no longer exists
    pub name: Option<String>,
    pub price: Option<i64>,
    pub image: Option<String>,
    pub available: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct WishlistView {
    pub items: Vec<WishlistLine>,
}

/// Sum quantities of repeated products, keeping first-seen order.
pub fn merge_lines(lines: impl IntoIterator<Item = (Uuid, i32)>) -> Vec<(Uuid, i32)> {
    let mut merged: Vec<(Uuid, i32)> = Vec::new();
    for (product_id, quantity) in lines {
        match merged.iter_mut().find(|(id, _)| *id == product_id) {
            Some((_, q)) => *q = q.saturating_add(quantity),
            None => merged.push((product_id, quantity)),
        }
    }
    merged
}

/// Price `lines` against the loaded `products`.
///
/// Missing products are left out of `lines` and listed in `unavailable`.
pub fn price_cart(lines: &[(Uuid, i32)], products: &HashMap<Uuid, Product>) -> PricedCart {
    let mut cart = PricedCart::default();

    for &(product_id, quantity) in lines {
        let Some(product) = products.get(&product_id) else {
            cart.unavailable.push(product_id);
            continue;
        };

        let available = product.is_purchasable() && quantity <= product.stock;
        let line_total = product.price * i64::from(quantity);
        if available {
            cart.subtotal += line_total;
        } else {
            cart.unavailable.push(product_id);
        }
        cart.item_count += quantity;

        cart.lines.push(PricedLine {
            product_id,
            name: product.name.clone(),
            sku: product.sku.clone(),
            image: product.primary_image().map(|i| i.url.clone()),
            unit_price: product.price,
            quantity,
            line_total,
            available_stock: product.stock,
            available,
        });
    }

    cart
}

pub fn wishlist_view(items: &[WishlistItem], products: &HashMap<Uuid, Product>) -> WishlistView {
    let items = items
        .iter()
        .map(|item| {
            let product = products.get(&item.product_id);
            WishlistLine {
                product_id: item.product_id,
                added_at: item.added_at,
                name: product.map(|p| p.name.clone()),
                price: product.map(|p| p.price),
                image: product.and_then(|p| p.primary_image().map(|i| i.url.clone())),
                available: product.is_some_and(Product::is_purchasable),
            }
        })
        .collect();
    WishlistView { items }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_products::{CreateProduct, ProductCategory, ProductStatus};

    fn product(name: &str, price: i64, stock: i32) -> Product {
        Product::new(CreateProduct {
            name: name.to_string(),
            description: String::new(),
            price,
            compare_at_price: None,
            stock,
            category: ProductCategory::Stationery,
            status: ProductStatus::Active,
            images: vec![],
            sku: None,
            brand: None,
            tags: vec![],
            attributes: Default::default(),
            featured: false,
            min_order_quantity: 1,
        })
    }

    #[test]
    fn test_set_quantity_adds_updates_and_removes() {
        let mut cart = Cart::new(Uuid::now_v7());
        let id = Uuid::now_v7();

        cart.set_quantity(id, 2);
        assert_eq!(cart.quantity_of(id), 2);
        cart.set_quantity(id, 5);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.quantity_of(id), 5);
        cart.set_quantity(id, 0);
        assert!(cart.items.is_empty());
        assert!(!cart.remove(id));
    }

    #[test]
    fn test_wishlist_is_a_set() {
        let mut cart = Cart::new(Uuid::now_v7());
        let id = Uuid::now_v7();
        cart.wish(id);
        cart.wish(id);
        assert_eq!(cart.wishlist.len(), 1);
        assert!(cart.unwish(id));
        assert!(!cart.unwish(id));
    }

    #[test]
    fn test_merge_lines_sums_duplicates() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let merged = merge_lines([(a, 1), (b, 2), (a, 3)]);
        assert_eq!(merged, vec![(a, 4), (b, 2)]);
    }

    #[test]
    fn test_price_cart() {
        let pens = product("Pens", 250, 10);
        let paper = product("Paper", 1000, 1);
        let mut gone = product("Gone", 99, 5);
        gone.status = ProductStatus::Discontinued;
        let missing = Uuid::now_v7();

        let lines = vec![(pens.id, 4), (paper.id, 2), (gone.id, 1), (missing, 1)];
        let products: HashMap<Uuid, Product> = [pens.clone(), paper.clone(), gone.clone()]
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let priced = price_cart(&lines, &products);
        assert_eq!(priced.lines.len(), 3);
        assert_eq!(priced.subtotal, 1000);
        assert_eq!(priced.item_count, 7);
        assert_eq!(priced.unavailable, vec![paper.id, gone.id, missing]);
        assert!(priced.lines[0].available);
        assert_eq!(priced.lines[1].line_total, 2000);
        assert!(!priced.lines[1].available);
    }

    #[test]
    fn test_wishlist_view_marks_missing_products() {
        let pens = product("Pens", 250, 0);
        let items = vec![
            WishlistItem {
                product_id: pens.id,
                added_at: Utc::now(),
            },
            WishlistItem {
                product_id: Uuid::now_v7(),
                added_at: Utc::now(),
            },
        ];
        let products = HashMap::from([(pens.id, pens)]);

        let view = wishlist_view(&items, &products);
        assert_eq!(view.items[0].name.as_deref(), Some("Pens"));
        assert!(!view.items[0].available);
        assert!(view.items[1].name.is_none());
    }
}
