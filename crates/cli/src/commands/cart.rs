//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! bazaar cart show
//! bazaar cart add -p prod_123 -q 2
//! bazaar cart remove -i line_9
//! ```

use bazaar_cart::MutationStatus;
use bazaar_core::{CartItemId, ProductId, VariantId};
use tracing::{info, warn};

use super::{CliError, Session};

/// Log every cart line and the unit count.
pub fn show(session: &Session) {
    let items = session.store.items();
    if items.is_empty() {
        info!("Cart is empty");
        return;
    }

    for item in &items {
        info!(
            id = %item.id,
            vendor = item.vendor.business_name.as_deref().unwrap_or(item.vendor.id.as_str()),
            "{} x{} @ {} = {}",
            item.name,
            item.quantity(),
            item.unit_price,
            item.line_price()
        );
    }
    info!(
        lines = items.len(),
        units = session.store.total_quantity(),
        "Cart loaded"
    );
}

pub async fn add(
    session: &Session,
    product: &str,
    quantity: u32,
    variant: Option<&str>,
) -> Result<(), CliError> {
    let product_id = ProductId::new(product);
    let variant_id = variant.map(VariantId::new);
    let status = session
        .store
        .add_item(&product_id, quantity, variant_id.as_ref())
        .await?;
    report(status, "Added to cart");
    show(session);
    Ok(())
}

pub async fn remove(session: &Session, item: &str) -> Result<(), CliError> {
    let item_id = known_item(session, item)?;
    let status = session.store.delete_item(&item_id).await?;
    report(status, "Removed from cart");
    show(session);
    Ok(())
}

pub async fn increase(session: &Session, item: &str, amount: u32) -> Result<(), CliError> {
    let item_id = known_item(session, item)?;
    let status = session.store.increase_quantity(&item_id, amount).await?;
    report(status, "Quantity increased");
    show(session);
    Ok(())
}

pub async fn decrease(session: &Session, item: &str, amount: u32) -> Result<(), CliError> {
    let item_id = known_item(session, item)?;
    let status = session.store.decrease_quantity(&item_id, amount).await?;
    report(status, "Quantity decreased");
    show(session);
    Ok(())
}

fn known_item(session: &Session, item: &str) -> Result<CartItemId, CliError> {
    let item_id = CartItemId::new(item);
    if session.store.item(&item_id).is_none() {
        return Err(CliError::UnknownItem(item.to_string()));
    }
    Ok(item_id)
}

fn report(status: MutationStatus, applied: &str) {
    match status {
        MutationStatus::Applied => info!("{applied}"),
        MutationStatus::Skipped => warn!("Another change to this item is still in flight"),
    }
}
