//! Catalog browsing.

use std::fmt::Write as _;

use ecom_client::Page;
use ecom_core::{Money, ProductQuery, ProductSummary};

use super::{CliError, Context};

pub async fn list(ctx: &Context, query: &ProductQuery) -> Result<(), CliError> {
    let page = ctx.catalog().list_products(query).await?;
    print!("{}", render_page(&page));
    Ok(())
}

pub async fn show(ctx: &Context, slug: &str) -> Result<(), CliError> {
    let product = ctx.catalog().get_product(slug).await?;
    print!("{}", render_product(&product));
    Ok(())
}

fn price_label(product: &ProductSummary) -> String {
    let price = Money::bdt(product.price);
    match product.compare_at_price {
        Some(was) if product.is_on_sale() => format!("{price} (was {})", Money::bdt(was)),
        _ => price.to_string(),
    }
}

fn render_page(page: &Page<ProductSummary>) -> String {
    let mut out = String::new();
    if page.items.is_empty() {
        out.push_str("No products found.\n");
        return out;
    }

    for product in &page.items {
        let _ = writeln!(out, "{:<32} {:<40} {}", product.slug, product.name, price_label(product));
    }
    if let Some(meta) = &page.meta {
        let _ = writeln!(
            out,
            "\nPage {} of {} ({} products)",
            meta.page, meta.total_pages, meta.total
        );
    }
    out
}

fn render_product(product: &ProductSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", product.name);
    let _ = writeln!(out, "  id:    {}", product.id);
    let _ = writeln!(out, "  price: {}", price_label(product));
    match product.stock {
        Some(0) => out.push_str("  stock: sold out\n"),
        Some(stock) => {
            let _ = writeln!(out, "  stock: {stock}");
        }
        None => {}
    }
    for image in &product.images {
        let _ = writeln!(out, "  image: {image}");
    }
    out
}
