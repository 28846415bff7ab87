//! Carts Domain
//!
//! One document per user holding the server-side cart and the wishlist.
//! Carts store product ids and quantities only; names, prices and stock come
//! from the catalog each time a cart is read, so a priced cart never shows a
//! stale price.
//!
//! Anonymous shoppers keep their cart on the client and use `POST /quote` to
//! price it; after sign-in `POST /merge` folds it into the stored cart.

pub mod error;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;

pub use error::{CartError, CartResult};
pub use handlers::ApiDoc;
pub use models::{
    AddItemRequest, Cart, CartItem, CartLineInput, CartLinesRequest, MergeIssue,
    MergeIssueKind, MergeResult, MoveToCartRequest, PricedCart, PricedLine, SetQuantityRequest,
    WishlistItem, WishlistView, price_cart,
};
pub use mongodb::MongoCartRepository;
pub use repository::CartRepository;
pub use service::CartService;
