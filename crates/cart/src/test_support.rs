//! In-memory cart service used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bazaar_core::{
    CartItemId, CartLineItem, District, ProductId, PromoCode, PromoId, Vendor, VendorId,
    VendorRef,
};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use tokio::sync::Notify;

use crate::client::{AddToCart, CartApi};
use crate::error::CartError;

/// A remote call observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchCart,
    Add(ProductId, u32),
    Remove(CartItemId),
    Decrement(CartItemId),
    FetchPromos,
    FetchVendor(VendorId),
}

/// Which mutation a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Fetch,
    Add,
    Remove,
    Decrement,
}

struct Product {
    name: String,
    price: Decimal,
    vendor: VendorRef,
}

#[derive(Default)]
struct FakeState {
    items: Vec<CartLineItem>,
    products: HashMap<ProductId, Product>,
    promos: Vec<PromoCode>,
    vendors: HashMap<VendorId, Vendor>,
    failures: VecDeque<(Op, StatusCode, String)>,
    calls: Vec<Call>,
    next_line: u32,
}

/// In-memory stand-in for the cart service.
#[derive(Default)]
pub struct FakeCartApi {
    state: Mutex<FakeState>,
    hold: Mutex<Option<Arc<Notify>>>,
}

impl FakeCartApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a product that can be added to the cart.
    pub fn with_product(self, id: &str, price: i64, vendor: VendorRef) -> Self {
        self.state().products.insert(
            ProductId::new(id),
            Product {
                name: format!("Product {id}"),
                price: Decimal::from(price),
                vendor,
            },
        );
        self
    }

    pub fn with_promo(self, code: &str, percentage: i64) -> Self {
        let mut state = self.state();
        let id = PromoId::new(format!("promo-{}", state.promos.len() + 1));
        state.promos.push(PromoCode {
            id,
            code: code.to_string(),
            discount_percentage: Decimal::from(percentage),
        });
        drop(state);
        self
    }

    pub fn with_vendor(self, id: &str, name: &str, district: &str) -> Self {
        self.state().vendors.insert(
            VendorId::new(id),
            Vendor {
                id: VendorId::new(id),
                business_name: name.to_string(),
                district: District::new(district),
            },
        );
        self
    }

    /// Make the next call of `op` fail with `status` and `message`.
    pub fn fail_next(&self, op: Op, status: StatusCode, message: &str) {
        self.state()
            .failures
            .push_back((op, status, message.to_string()));
    }

    /// Hold every mutation open until the returned `Notify` is signalled.
    pub fn hold_mutations(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&notify));
        notify
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    Call::Add(..) | Call::Remove(_) | Call::Decrement(..)
                )
            })
            .count()
    }

    pub fn server_items(&self) -> Vec<CartLineItem> {
        self.state().items.clone()
    }

    fn begin(&self, call: Call, op: Op) -> Result<(), CartError> {
        let mut state = self.state();
        state.calls.push(call);
        if let Some(pos) = state.failures.iter().position(|(o, _, _)| *o == op) {
            if let Some((_, status, message)) = state.failures.remove(pos) {
                return Err(CartError::from_status(status, message, None));
            }
        }
        Ok(())
    }

    async fn wait_if_held(&self) {
        let notify = self
            .hold
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(notify) = notify {
            notify.notified().await;
        }
    }

    fn not_found(item_id: &CartItemId) -> CartError {
        CartError::from_status(
            StatusCode::NOT_FOUND,
            format!("Cart item {item_id} not found"),
            None,
        )
    }
}

#[async_trait]
impl CartApi for FakeCartApi {
    async fn fetch_cart(&self) -> Result<Vec<CartLineItem>, CartError> {
        self.begin(Call::FetchCart, Op::Fetch)?;
        Ok(self.state().items.clone())
    }

    async fn add_item(&self, request: &AddToCart) -> Result<(), CartError> {
        let result = self.begin(
            Call::Add(request.product_id.clone(), request.quantity),
            Op::Add,
        );
        self.wait_if_held().await;
        result?;

        let mut state = self.state();
        if let Some(line) = state.items.iter_mut().find(|line| {
            line.product_id == request.product_id && line.variant_id == request.variant_id
        }) {
            let quantity = line.quantity() + request.quantity;
            *line = rebuild(line, quantity);
            return Ok(());
        }

        let Some(product) = state.products.get(&request.product_id) else {
            return Err(CartError::from_status(
                StatusCode::NOT_FOUND,
                "Product not found".to_string(),
                None,
            ));
        };
        let name = product.name.clone();
        let price = product.price;
        let vendor = product.vendor.clone();
        state.next_line += 1;
        let id = CartItemId::new(format!("line-{}", state.next_line));
        let mut line = CartLineItem::new(
            id.clone(),
            request.product_id.clone(),
            name,
            price,
            request.quantity,
            vendor,
        )
        .map_err(|_| Self::not_found(&id))?;
        if let Some(variant) = &request.variant_id {
            line = line.with_variant(variant.clone());
        }
        state.items.push(line);
        Ok(())
    }

    async fn remove_item(&self, item_id: &CartItemId) -> Result<(), CartError> {
        let result = self.begin(Call::Remove(item_id.clone()), Op::Remove);
        self.wait_if_held().await;
        result?;

        let mut state = self.state();
        let before = state.items.len();
        state.items.retain(|line| &line.id != item_id);
        if state.items.len() == before {
            return Err(Self::not_found(item_id));
        }
        Ok(())
    }

    async fn decrement_item(&self, item_id: &CartItemId) -> Result<(), CartError> {
        let result = self.begin(Call::Decrement(item_id.clone()), Op::Decrement);
        self.wait_if_held().await;
        result?;

        let mut state = self.state();
        let Some(pos) = state.items.iter().position(|line| &line.id == item_id) else {
            return Err(Self::not_found(item_id));
        };
        let Some(line) = state.items.get(pos) else {
            return Err(Self::not_found(item_id));
        };
        if line.quantity() <= 1 {
            state.items.remove(pos);
        } else {
            let rebuilt = rebuild(line, line.quantity() - 1);
            if let Some(slot) = state.items.get_mut(pos) {
                *slot = rebuilt;
            }
        }
        Ok(())
    }

    async fn fetch_promo_codes(&self) -> Result<Vec<PromoCode>, CartError> {
        self.state().calls.push(Call::FetchPromos);
        Ok(self.state().promos.clone())
    }

    async fn fetch_vendor(&self, vendor_id: &VendorId) -> Result<Vendor, CartError> {
        let mut state = self.state();
        state.calls.push(Call::FetchVendor(vendor_id.clone()));
        state.vendors.get(vendor_id).cloned().ok_or_else(|| {
            CartError::from_status(
                StatusCode::NOT_FOUND,
                format!("Vendor {vendor_id} not found"),
                None,
            )
        })
    }
}

fn rebuild(line: &CartLineItem, quantity: u32) -> CartLineItem {
    let rebuilt = CartLineItem::new(
        line.id.clone(),
        line.product_id.clone(),
        line.name.clone(),
        line.unit_price,
        quantity,
        line.vendor.clone(),
    )
    .unwrap_or_else(|_| line.clone());
    match &line.variant_id {
        Some(variant) => rebuilt.with_variant(variant.clone()),
        None => rebuilt,
    }
}

/// A vendor reference with name and district filled in.
pub fn vendor(id: &str, name: &str, district: &str) -> VendorRef {
    VendorRef {
        id: VendorId::new(id),
        business_name: Some(name.to_string()),
        district: Some(District::new(district)),
    }
}

/// A line item for pure (non-network) tests.
pub fn line(id: &str, price: i64, quantity: u32, vendor: VendorRef) -> CartLineItem {
    CartLineItem::new(
        CartItemId::new(id),
        ProductId::new(format!("product-{id}")),
        format!("Item {id}"),
        Decimal::from(price),
        quantity,
        vendor,
    )
    .unwrap_or_else(|e| panic!("invalid test line: {e}"))
}
