use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Hard cap on page size for product listings
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Product status
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    Default,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductStatus {
    /// Listed and purchasable while stock lasts
    #[default]
    Active,
    /// Hidden from the storefront
    Inactive,
    /// Listed but not purchasable until restocked
    OutOfStock,
    /// Permanently withdrawn
    Discontinued,
    /// Being prepared, hidden from the storefront
    Draft,
}

impl ProductStatus {
    /// Statuses shown on the storefront when no status filter is given.
    pub const VISIBLE: [ProductStatus; 2] = [ProductStatus::Active, ProductStatus::OutOfStock];

    /// Status after stock changes to `stock`. Only the active and out of stock
    /// states follow the stock level; the others are set by hand.
    pub fn for_stock(self, stock: i32) -> Self {
        match self {
            ProductStatus::Active if stock <= 0 => ProductStatus::OutOfStock,
            ProductStatus::OutOfStock if stock > 0 => ProductStatus::Active,
            other => other,
        }
    }
}

/// Product category
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    Default,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductCategory {
    BusinessCards,
    Flyers,
    Brochures,
    Posters,
    Banners,
    Stickers,
    Stationery,
    Apparel,
    PhotoPrints,
    Signage,
    Packaging,
    #[default]
    Other,
}

impl ProductCategory {
    /// Human readable name, e.g. "Business Cards".
    pub fn label(&self) -> &'static str {
        match self {
            ProductCategory::BusinessCards => "Business Cards",
            ProductCategory::Flyers => "Flyers",
            ProductCategory::Brochures => "Brochures",
            ProductCategory::Posters => "Posters",
            ProductCategory::Banners => "Banners",
            ProductCategory::Stickers => "Stickers",
            ProductCategory::Stationery => "Stationery",
            ProductCategory::Apparel => "Apparel",
            ProductCategory::PhotoPrints => "Photo Prints",
            ProductCategory::Signage => "Signage",
            ProductCategory::Packaging => "Packaging",
            ProductCategory::Other => "Other",
        }
    }

    pub fn all() -> impl Iterator<Item = ProductCategory> {
        ProductCategory::iter()
    }
}

/// Product image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    /// Image URL
    pub url: String,
    /// Alternative text for accessibility
    #[serde(default)]
    pub alt: Option<String>,
    /// Whether this is the primary/hero image
    #[serde(default)]
    pub is_primary: bool,
    /// Sort order for display
    #[serde(default)]
    pub sort_order: i32,
    /// Media store key when the file is hosted by this service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Aggregated review rating, maintained by the reviews domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductRating {
    /// Mean of published review ratings, two decimals
    pub average: f64,
    /// Number of published reviews
    pub count: i64,
}

/// Product entity - represents a product stored in MongoDB
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    /// Unique identifier (stored as _id in MongoDB)
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    /// Product name, unique across the catalog
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Price in cents
    pub price: i64,
    /// Original price in cents, shown struck through
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<i64>,
    /// Units on hand
    pub stock: i32,
    pub category: ProductCategory,
    pub status: ProductStatus,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    /// Stock Keeping Unit; absent rather than null so the sparse unique index
    /// skips products without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form print attributes such as paper, size or finish
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub featured: bool,
    /// Smallest quantity accepted per order line
    #[serde(default = "default_min_order_quantity")]
    pub min_order_quantity: i32,
    #[serde(default)]
    pub rating: ProductRating,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating a new product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    /// Price in cents
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(range(min = 0))]
    pub compare_at_price: Option<i64>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub category: ProductCategory,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub featured: bool,
    #[validate(range(min = 1, max = 100000))]
    #[serde(default = "default_min_order_quantity")]
    pub min_order_quantity: i32,
}

/// DTO for updating an existing product
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price: Option<i64>,
    #[validate(range(min = 0))]
    pub compare_at_price: Option<i64>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub category: Option<ProductCategory>,
    pub status: Option<ProductStatus>,
    pub images: Option<Vec<ProductImage>>,
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    pub tags: Option<Vec<String>>,
    pub attributes: Option<BTreeMap<String, String>>,
    pub featured: Option<bool>,
    #[validate(range(min = 1, max = 100000))]
    pub min_order_quantity: Option<i32>,
}

impl UpdateProduct {
    /// Same clean-up as [`Product::new`] for the fields that are present.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.map(|n| n.trim().to_string());
        self.sku = self.sku.map(|s| s.trim().to_uppercase());
        self.tags = self.tags.map(normalize_tags);
        if let Some(images) = self.images.as_mut() {
            normalize_images(images);
        }
        self.min_order_quantity = self.min_order_quantity.map(|m| m.max(1));
        self
    }
}

/// Sort order for product listings
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Rating,
    Name,
}

/// Query filters for listing products
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ProductFilter {
    /// Filter by status; storefront-visible statuses when omitted
    pub status: Option<ProductStatus>,
    pub category: Option<ProductCategory>,
    pub brand: Option<String>,
    /// Minimum price (in cents)
    pub min_price: Option<i64>,
    /// Maximum price (in cents)
    pub max_price: Option<i64>,
    /// Only show products in stock
    pub in_stock: Option<bool>,
    pub tag: Option<String>,
    pub featured: Option<bool>,
    /// Search in name, description, SKU and tags
    pub search: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    /// Maximum number of results (at most 100)
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Number of results to skip
    #[serde(default)]
    pub offset: u64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            status: None,
            category: None,
            brand: None,
            min_price: None,
            max_price: None,
            in_stock: None,
            tag: None,
            featured: None,
            search: None,
            sort: ProductSort::default(),
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl ProductFilter {
    /// Clamp paging to the accepted bounds.
    pub fn normalized(mut self) -> Self {
        self.limit = clamp_limit(self.limit);
        self
    }
}

/// Stock adjustment request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct StockAdjustment {
    /// Quantity to add (positive) or remove (negative)
    #[validate(range(min = -1000000, max = 1000000))]
    pub quantity: i32,
    /// Reason for adjustment
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

pub(crate) fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

fn default_min_order_quantity() -> i32 {
    1
}

pub(crate) fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_PAGE_SIZE)
}

/// Trim, drop empties and de-duplicate tags while keeping their order.
pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::<String>::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

/// Keep exactly one primary image (the first flagged one, else the first
/// image) and renumber sort order.
pub(crate) fn normalize_images(images: &mut [ProductImage]) {
    let primary = images.iter().position(|i| i.is_primary).unwrap_or(0);
    for (index, image) in images.iter_mut().enumerate() {
        image.is_primary = index == primary;
        image.sort_order = index as i32;
    }
}

impl Product {
    /// Create a new product from CreateProduct DTO
    pub fn new(input: CreateProduct) -> Self {
        let now = Utc::now();
        let mut images = input.images;
        normalize_images(&mut images);
        Self {
            id: Uuid::now_v7(),
            name: input.name.trim().to_string(),
            description: input.description,
            price: input.price,
            compare_at_price: input.compare_at_price,
            stock: input.stock,
            category: input.category,
            status: input.status.for_stock(input.stock),
            images,
            sku: input.sku.map(|s| s.trim().to_uppercase()),
            brand: input.brand,
            tags: normalize_tags(input.tags),
            attributes: input.attributes,
            featured: input.featured,
            min_order_quantity: input.min_order_quantity.max(1),
            rating: ProductRating::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if product is in stock
    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Whether customers can put this product in a cart or order.
    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::Active && self.is_in_stock()
    }

    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images
            .iter()
            .find(|i| i.is_primary)
            .or_else(|| self.images.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn input() -> CreateProduct {
        CreateProduct {
            name: "  Matte Business Cards ".to_string(),
            description: "350gsm".to_string(),
            price: 2500,
            compare_at_price: None,
            stock: 10,
            category: ProductCategory::BusinessCards,
            status: ProductStatus::Active,
            images: vec![],
            sku: Some("bc-001".to_string()),
            brand: None,
            tags: vec!["Cards".to_string(), "cards".to_string(), " ".to_string()],
            attributes: BTreeMap::from([("finish".to_string(), "matte".to_string())]),
            featured: false,
            min_order_quantity: 0,
        }
    }

    #[test]
    fn test_new_product_normalizes_input() {
        let product = Product::new(input());
        assert_eq!(product.name, "Matte Business Cards");
        assert_eq!(product.sku.as_deref(), Some("BC-001"));
        assert_eq!(product.tags, vec!["cards"]);
        assert_eq!(product.min_order_quantity, 1);
        assert_eq!(product.status, ProductStatus::Active);
        assert_eq!(product.rating, ProductRating::default());
    }

    #[test]
    fn test_new_product_without_stock_is_out_of_stock() {
        let product = Product::new(CreateProduct {
            stock: 0,
            ..input()
        });
        assert_eq!(product.status, ProductStatus::OutOfStock);
        assert!(!product.is_purchasable());
    }

    #[test]
    fn test_update_normalizes_present_fields_only() {
        let update = UpdateProduct {
            name: Some("  Kraft Stickers ".to_string()),
            sku: Some(" st-9 ".to_string()),
            tags: Some(vec!["Eco".to_string(), "eco".to_string()]),
            min_order_quantity: Some(0),
            ..Default::default()
        }
        .normalized();

        assert_eq!(update.name.as_deref(), Some("Kraft Stickers"));
        assert_eq!(update.sku.as_deref(), Some("ST-9"));
        assert_eq!(update.tags, Some(vec!["eco".to_string()]));
        assert_eq!(update.min_order_quantity, Some(1));
        assert!(update.stock.is_none());
        assert!(update.images.is_none());
    }

    #[test]
    fn test_manual_statuses_ignore_stock() {
        assert_eq!(ProductStatus::Draft.for_stock(0), ProductStatus::Draft);
        assert_eq!(
            ProductStatus::Discontinued.for_stock(10),
            ProductStatus::Discontinued
        );
        assert_eq!(ProductStatus::Inactive.for_stock(0), ProductStatus::Inactive);
    }

    #[test]
    fn test_normalize_images_keeps_one_primary() {
        let image = |url: &str, primary: bool| ProductImage {
            url: url.to_string(),
            alt: None,
            is_primary: primary,
            sort_order: 9,
            key: None,
        };
        let mut images = vec![image("a", false), image("b", true), image("c", true)];
        normalize_images(&mut images);

        assert!(!images[0].is_primary);
        assert!(images[1].is_primary);
        assert!(!images[2].is_primary);
        assert_eq!(images[2].sort_order, 2);

        let mut none_flagged = vec![image("a", false), image("b", false)];
        normalize_images(&mut none_flagged);
        assert!(none_flagged[0].is_primary);
    }

    #[test]
    fn test_category_strings() {
        assert_eq!(ProductCategory::PhotoPrints.to_string(), "photo_prints");
        assert_eq!(
            ProductCategory::from_str("business_cards").unwrap(),
            ProductCategory::BusinessCards
        );
        assert_eq!(ProductCategory::all().count(), 12);
        assert_eq!(ProductCategory::BusinessCards.label(), "Business Cards");
    }

    #[test]
    fn test_filter_limit_is_clamped() {
        let filter = ProductFilter {
            limit: 500,
            ..Default::default()
        }
        .normalized();
        assert_eq!(filter.limit, MAX_PAGE_SIZE);

        let filter = ProductFilter {
            limit: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(filter.limit, 1);
    }
}
