//! Cart commands.
//!
//! Each invocation loads the server cart first so optimistic updates apply
//! to real data, then prints the cart the server confirmed.

use std::fmt::Write as _;

use ecom_client::CartSession;
use ecom_core::{AddItemRequest, Cart, CartItemId, Money};
use rust_decimal::Decimal;

use super::{CliError, Context};

async fn loaded(ctx: &Context) -> Result<CartSession, CliError> {
    ctx.require_session()?;
    let session = ctx.cart();
    session.load().await?;
    Ok(session)
}

pub async fn show(ctx: &Context) -> Result<(), CliError> {
    ctx.require_session()?;
    let cart = ctx.cart().load().await?;
    print!("{}", render_cart(&cart));
    Ok(())
}

pub async fn add(
    ctx: &Context,
    product_id: &str,
    quantity: u32,
    variant: Option<String>,
) -> Result<(), CliError> {
    let mut request = AddItemRequest::new(product_id, quantity);
    if let Some(variant) = variant {
        request = request.with_variant(variant);
    }

    let cart = loaded(ctx).await?.add_item(&request).await?;
    print!("{}", render_cart(&cart));
    Ok(())
}

pub async fn update(ctx: &Context, item_id: &str, quantity: u32) -> Result<(), CliError> {
    let cart = loaded(ctx)
        .await?
        .update_item_quantity(&CartItemId::new(item_id), quantity)
        .await?;
    print!("{}", render_cart(&cart));
    Ok(())
}

pub async fn remove(ctx: &Context, item_id: &str) -> Result<(), CliError> {
    let cart = loaded(ctx).await?.remove_item(&CartItemId::new(item_id)).await?;
    print!("{}", render_cart(&cart));
    Ok(())
}

pub async fn clear(ctx: &Context) -> Result<(), CliError> {
    let cart = loaded(ctx).await?.clear_cart().await?;
    print!("{}", render_cart(&cart));
    Ok(())
}

pub async fn apply_coupon(ctx: &Context, code: &str) -> Result<(), CliError> {
    let cart = loaded(ctx).await?.apply_coupon(code).await?;
    print!("{}", render_cart(&cart));
    Ok(())
}

pub async fn remove_coupon(ctx: &Context) -> Result<(), CliError> {
    let cart = loaded(ctx).await?.remove_coupon().await?;
    print!("{}", render_cart(&cart));
    Ok(())
}

fn render_cart(cart: &Cart) -> String {
    let mut out = String::new();
    if cart.is_empty() {
        out.push_str("Your cart is empty.\n");
        return out;
    }

    let _ = writeln!(out, "Cart ({} items)", cart.item_count);
    for item in &cart.items {
        let _ = writeln!(
            out,
            "  {:<24} {:<32} {:>3} x {:>12} = {:>12}",
            item.id,
            item.name,
            item.quantity,
            Money::bdt(item.unit_price).to_string(),
            Money::bdt(item.line_total).to_string(),
        );
    }
    let _ = writeln!(out, "Subtotal  {}", Money::bdt(cart.subtotal));
    if cart.discount > Decimal::ZERO {
        let code = cart.coupon_code.as_deref().unwrap_or("discount");
        let _ = writeln!(out, "Discount -{} ({code})", Money::bdt(cart.discount));
    }
    let _ = writeln!(out, "Total     {}", Money::bdt(cart.total));
    out
}
