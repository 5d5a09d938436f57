//! Shopping cart: HTTP endpoints and the optimistic cart session.

mod client;
mod session;

use std::future::Future;

use ecom_core::{AddItemRequest, Cart, CartItemId};

use crate::error::Result;

pub use client::CartClient;
pub use session::{CartSession, CartState};

/// Server-side cart operations. Every call answers with the authoritative cart.
///
/// Implementations must be lazy: no request may be issued until the returned
/// future is first polled, since [`CartSession`] builds the future before it
/// has acquired its turn in the operation queue.
pub trait CartApi: Send + Sync + 'static {
    /// `GET /cart`
    fn get_cart(&self) -> impl Future<Output = Result<Cart>> + Send;

    /// `POST /cart/items`
    fn add_item(&self, request: &AddItemRequest) -> impl Future<Output = Result<Cart>> + Send;

    /// `PATCH /cart/items/{id}`
    fn update_item(
        &self,
        item_id: &CartItemId,
        quantity: u32,
    ) -> impl Future<Output = Result<Cart>> + Send;

    /// `DELETE /cart/items/{id}`
    fn remove_item(&self, item_id: &CartItemId) -> impl Future<Output = Result<Cart>> + Send;

    /// `DELETE /cart`
    fn clear(&self) -> impl Future<Output = Result<Cart>> + Send;

    /// `POST /cart/coupon`
    fn apply_coupon(&self, code: &str) -> impl Future<Output = Result<Cart>> + Send;

    /// `DELETE /cart/coupon`
    fn remove_coupon(&self) -> impl Future<Output = Result<Cart>> + Send;
}
