use ecom_core::{AddItemRequest, Cart, CartItemId, UpdateItemRequest};
use reqwest::Method;
use serde::Serialize;
use tracing::instrument;

use super::CartApi;
use crate::error::Result;
use crate::http::{ApiClient, RequestOptions};

#[derive(Serialize)]
struct ApplyCouponRequest<'a> {
    code: &'a str,
}

/// [`CartApi`] over the storefront REST endpoints.
#[derive(Debug, Clone)]
pub struct CartClient {
    api: ApiClient,
}

impl CartClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl CartApi for CartClient {
    #[instrument(skip(self))]
    async fn get_cart(&self) -> Result<Cart> {
        self.api.get("cart").await
    }

    #[instrument(skip(self), fields(product_id = %request.product_id, quantity = request.quantity))]
    async fn add_item(&self, request: &AddItemRequest) -> Result<Cart> {
        self.api.post("cart/items", request).await
    }

    #[instrument(skip(self))]
    async fn update_item(&self, item_id: &CartItemId, quantity: u32) -> Result<Cart> {
        let url = self.api.resource_url("cart/items", item_id.as_str())?;
        let body = UpdateItemRequest { quantity };
        self.api
            .send_url(Method::PATCH, url, Some(&body), RequestOptions::default())
            .await
            .map(|response| response.data)
    }

    #[instrument(skip(self))]
    async fn remove_item(&self, item_id: &CartItemId) -> Result<Cart> {
        let url = self.api.resource_url("cart/items", item_id.as_str())?;
        self.api
            .send_url::<Cart, ()>(Method::DELETE, url, None, RequestOptions::default())
            .await
            .map(|response| response.data)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<Cart> {
        self.api.delete("cart").await
    }

    #[instrument(skip(self))]
    async fn apply_coupon(&self, code: &str) -> Result<Cart> {
        self.api
            .post("cart/coupon", &ApplyCouponRequest { code })
            .await
    }

    #[instrument(skip(self))]
    async fn remove_coupon(&self) -> Result<Cart> {
        self.api.delete("cart/coupon").await
    }
}
