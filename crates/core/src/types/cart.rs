//! Cart types and the totals recomputation rule.
//!
//! The server is the source of truth for carts. Clients mutate a local copy
//! optimistically and call [`Cart::recalculate`] after every local change so
//! the derived fields (`subtotal`, `total`, `item_count`) never drift from
//! the item list.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CartId, CartItemId, ProductId, VariantId};

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Price per unit.
    pub unit_price: Decimal,
    pub quantity: u32,
    /// `unit_price * quantity`, as computed by the server.
    pub line_total: Decimal,
}

impl CartItem {
    /// Whether this line holds the given product/variant combination.
    #[must_use]
    pub fn matches(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> bool {
        &self.product_id == product_id && self.variant_id.as_ref() == variant_id
    }

    /// Set the quantity and rewrite the line total from the unit price.
    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.line_total = self.unit_price * Decimal::from(quantity);
    }
}

/// A shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub subtotal: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    pub total: Decimal,
    pub item_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

impl Cart {
    /// An empty cart with zeroed totals.
    #[must_use]
    pub fn empty(id: CartId) -> Self {
        Self {
            id,
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
            item_count: 0,
            coupon_code: None,
        }
    }

    /// Recompute the derived totals from the item list.
    ///
    /// - `subtotal = Σ line_total`
    /// - `total = max(0, subtotal - discount)`
    /// - `item_count = Σ quantity`
    pub fn recalculate(&mut self) {
        self.subtotal = self.items.iter().map(|item| item.line_total).sum();
        self.item_count = self
            .items
            .iter()
            .fold(0u32, |count, item| count.saturating_add(item.quantity));
        self.total = (self.subtotal - self.discount).max(Decimal::ZERO);
    }

    /// Find a line by its ID.
    #[must_use]
    pub fn item(&self, item_id: &CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == item_id)
    }

    /// Find a line by its ID, mutably.
    pub fn item_mut(&mut self, item_id: &CartItemId) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|item| &item.id == item_id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Request body for `POST /cart/items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
}

impl AddItemRequest {
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            variant_id: None,
            quantity,
        }
    }

    #[must_use]
    pub fn with_variant(mut self, variant_id: impl Into<VariantId>) -> Self {
        self.variant_id = Some(variant_id.into());
        self
    }
}

/// Request body for `PATCH /cart/items/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}
