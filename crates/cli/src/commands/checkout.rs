//! Checkout preview.
//!
//! Resolves vendor details, groups the cart by vendor, prices shipping for
//! the delivery district and applies an optional promo code. Nothing is
//! written to the cart.

use bazaar_cart::{OrderSummary, PromoApplier, QuantityOverrides, VendorDirectory};
use bazaar_core::{CartItemId, District};
use tracing::info;

use super::{CliError, Session};

pub struct CheckoutOptions {
    pub district: Option<String>,
    pub promo: Option<String>,
    /// Item and quantity for a single-item checkout.
    pub buy_now: Option<(String, u32)>,
}

pub async fn run(session: &Session, options: CheckoutOptions) -> Result<(), CliError> {
    let destination = options.district.map(District::new);
    let directory = VendorDirectory::from_config(session.client.clone(), &session.config);

    let summary = if let Some((item, quantity)) = options.buy_now {
        let item_id = CartItemId::new(&item);
        let line = session
            .store
            .item(&item_id)
            .ok_or(CliError::UnknownItem(item))?;
        let resolved = directory.resolve(std::slice::from_ref(&line)).await;
        let line = resolved.into_iter().next().unwrap_or(line);
        OrderSummary::buy_now(&line, quantity, destination.as_ref())?
    } else {
        let items = directory.resolve(&session.store.items()).await;
        OrderSummary::compute(&items, destination.as_ref(), &QuantityOverrides::new())
    };

    if summary.is_empty() {
        info!("Cart is empty, nothing to check out");
        return Ok(());
    }

    for group in &summary.groups {
        info!(
            vendor = %group.vendor_key(),
            lines = group.lines.len(),
            subtotal = %group.subtotal,
            shipping = %group.shipping_cost,
            total = %group.line_total,
            "Vendor group"
        );
        for line in &group.lines {
            info!(
                id = %line.item.id,
                "  {} x{} = {}",
                line.item.name,
                line.quantity,
                line.line_price()
            );
        }
    }

    let mut promos = PromoApplier::default();
    if let Some(code) = options.promo {
        promos = PromoApplier::load(&session.client).await?;
        promos.apply(&code)?;
    }
    let priced = promos.totals(summary.grand_total);

    info!(
        items = summary.item_count(),
        subtotal = %summary.subtotal,
        shipping = %summary.total_shipping,
        grand_total = %priced.grand_total,
        discount = %priced.discount_amount,
        final_total = %priced.final_total,
        "Order summary"
    );
    Ok(())
}
