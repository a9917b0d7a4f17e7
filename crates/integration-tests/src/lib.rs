//! Integration tests for Bazaar.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_sync` - Cart store and HTTP client against the fake service
//! - `checkout` - Vendor lookup, shipping groups and promo pricing
//!
//! # Fake Cart Service
//!
//! [`FakeCartService`] is a small `axum` app bound to an ephemeral port. It
//! speaks the cart service's JSON, enforces stock limits and bearer tokens,
//! and can be scripted to fail the next request on a given route.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bazaar_cart::CartConfig;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

// =============================================================================
// Fixtures
// =============================================================================

/// Vendor information a product carries into the cart response.
#[derive(Debug, Clone)]
pub struct VendorInfo {
    pub id: String,
    pub business_name: Option<String>,
    pub district: Option<String>,
}

impl VendorInfo {
    /// Vendor with name and district embedded in cart items.
    #[must_use]
    pub fn embedded(id: &str, business_name: &str, district: &str) -> Self {
        Self {
            id: id.to_string(),
            business_name: Some(business_name.to_string()),
            district: Some(district.to_string()),
        }
    }

    /// Vendor that cart items only reference by ID.
    #[must_use]
    pub fn id_only(id: &str) -> Self {
        Self {
            id: id.to_string(),
            business_name: None,
            district: None,
        }
    }

    fn to_json(&self) -> Value {
        let mut vendor = json!({ "id": self.id });
        if let Some(name) = &self.business_name {
            vendor["businessName"] = json!(name);
        }
        if let Some(district) = &self.district {
            vendor["district"] = json!({ "name": district });
        }
        vendor
    }
}

/// A product the fake service can put in the cart.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub unit_price: Decimal,
    /// Maximum units per cart line.
    pub stock: i64,
    pub vendor: VendorInfo,
}

impl Product {
    #[must_use]
    pub fn new(id: &str, unit_price: Decimal, vendor: VendorInfo) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Product {id}"),
            unit_price,
            stock: 100,
            vendor,
        }
    }

    #[must_use]
    pub const fn with_stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }
}

/// A request the fake service received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Route label such as `"DELETE /cart"`.
    pub route: String,
    pub body: Value,
}

// =============================================================================
// Service State
// =============================================================================

#[derive(Debug, Clone)]
struct Line {
    id: String,
    product_id: String,
    variant_id: Option<String>,
    quantity: i64,
}

#[derive(Default)]
struct ServiceState {
    lines: Vec<Line>,
    products: HashMap<String, Product>,
    vendors: HashMap<String, (String, String)>,
    promos: Vec<Value>,
    token: Option<String>,
    session_expired: bool,
    failures: VecDeque<(String, StatusCode, String)>,
    requests: Vec<RecordedRequest>,
}

type Shared = Arc<Mutex<ServiceState>>;

fn lock(state: &Shared) -> MutexGuard<'_, ServiceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ServiceState {
    /// Record the request, then apply auth and scripted failures.
    fn admit(&mut self, route: &str, headers: &HeaderMap, body: Value) -> Result<(), Response> {
        self.requests.push(RecordedRequest {
            route: route.to_string(),
            body,
        });

        let authorized = match &self.token {
            _ if self.session_expired => false,
            Some(token) => headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value == format!("Bearer {token}")),
            None => true,
        };
        if !authorized {
            return Err(error(StatusCode::UNAUTHORIZED, "Authentication required", None));
        }

        if let Some(pos) = self.failures.iter().position(|(r, _, _)| r == route)
            && let Some((_, status, body)) = self.failures.remove(pos)
        {
            return Err((status, body).into_response());
        }
        Ok(())
    }

    fn line_json(&self, line: &Line) -> Value {
        let Some(product) = self.products.get(&line.product_id) else {
            return Value::Null;
        };
        let mut item = json!({
            "id": line.id,
            "productId": line.product_id,
            "name": product.name,
            "unitPrice": product.unit_price.to_string(),
            "quantity": line.quantity,
            "vendor": product.vendor.to_json(),
        });
        if let Some(variant) = &line.variant_id {
            item["variantId"] = json!(variant);
        }
        item
    }
}

fn error(status: StatusCode, message: &str, field: Option<&str>) -> Response {
    let mut body = json!({ "message": message });
    if let Some(field) = field {
        body["field"] = json!(field);
    }
    (status, Json(body)).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddBody {
    product_id: String,
    quantity: i64,
    #[serde(default)]
    variant_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveBody {
    cart_item_id: String,
    #[serde(default)]
    decrease_only: bool,
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    if let Err(response) = state.admit("GET /cart", &headers, Value::Null) {
        return response;
    }
    let items: Vec<Value> = state.lines.iter().map(|l| state.line_json(l)).collect();
    Json(items).into_response()
}

async fn add_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = lock(&state);
    let state = &mut *guard;
    if let Err(response) = state.admit("POST /cart", &headers, body.clone()) {
        return response;
    }
    let Ok(body) = serde_json::from_value::<AddBody>(body) else {
        return error(StatusCode::BAD_REQUEST, "productId is required", Some("productId"));
    };
    if body.quantity <= 0 {
        return error(StatusCode::BAD_REQUEST, "quantity must be positive", Some("quantity"));
    }
    let Some(stock) = state.products.get(&body.product_id).map(|p| p.stock) else {
        return error(StatusCode::NOT_FOUND, "Product not found", None);
    };

    let existing = state
        .lines
        .iter()
        .position(|l| l.product_id == body.product_id && l.variant_id == body.variant_id);
    let current = existing
        .and_then(|pos| state.lines.get(pos))
        .map_or(0, |l| l.quantity);
    if current + body.quantity > stock {
        return error(
            StatusCode::BAD_REQUEST,
            &format!("Only {stock} left in stock"),
            Some("quantity"),
        );
    }

    match existing.and_then(|pos| state.lines.get_mut(pos)) {
        Some(line) => line.quantity += body.quantity,
        None => state.lines.push(Line {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: body.product_id,
            variant_id: body.variant_id,
            quantity: body.quantity,
        }),
    }
    StatusCode::CREATED.into_response()
}

async fn remove_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = lock(&state);
    let state = &mut *guard;
    if let Err(response) = state.admit("DELETE /cart", &headers, body.clone()) {
        return response;
    }
    let Ok(body) = serde_json::from_value::<RemoveBody>(body) else {
        return error(StatusCode::BAD_REQUEST, "cartItemId is required", Some("cartItemId"));
    };
    let Some(pos) = state.lines.iter().position(|l| l.id == body.cart_item_id) else {
        return error(StatusCode::NOT_FOUND, "Cart item not found", None);
    };

    let remaining = if body.decrease_only {
        state
            .lines
            .get(pos)
            .map_or(0, |l| l.quantity - 1)
    } else {
        0
    };
    if remaining > 0 {
        if let Some(line) = state.lines.get_mut(pos) {
            line.quantity = remaining;
        }
    } else {
        state.lines.remove(pos);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn promo_codes(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    if let Err(response) = state.admit("GET /promo-codes", &headers, Value::Null) {
        return response;
    }
    Json(state.promos.clone()).into_response()
}

async fn vendor(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut state = lock(&state);
    if let Err(response) = state.admit("GET /vendors", &headers, json!({ "id": id })) {
        return response;
    }
    match state.vendors.get(&id) {
        Some((name, district)) => Json(json!({
            "businessName": name,
            "district": { "name": district },
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Vendor not found" })))
            .into_response(),
    }
}

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/cart", get(get_cart).post(add_item).delete(remove_item))
        .route("/promo-codes", get(promo_codes))
        .route("/vendors/{id}", get(vendor))
        .with_state(state);

    Router::new().nest("/api", api)
}

// =============================================================================
// FakeCartService
// =============================================================================

/// Fake cart service running on `127.0.0.1`.
///
/// The server task is aborted when the value is dropped.
pub struct FakeCartService {
    state: Shared,
    base_url: Url,
    server: JoinHandle<()>,
}

impl FakeCartService {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state: Shared = Arc::new(Mutex::new(ServiceState::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let base_url = Url::parse(&format!("http://{addr}/api/"))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let app = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            state,
            base_url,
            server,
        })
    }

    /// Base URL of the API, with trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Client configuration pointing at this service.
    #[must_use]
    pub fn config(&self) -> CartConfig {
        let mut config = CartConfig::new(self.base_url.clone());
        if let Some(token) = lock(&self.state).token.clone() {
            config.api_token = Some(SecretString::from(token));
        }
        config
    }

    pub fn add_product(&self, product: Product) {
        lock(&self.state)
            .products
            .insert(product.id.clone(), product);
    }

    /// Register a vendor for `GET /vendors/{id}`.
    pub fn add_vendor(&self, id: &str, business_name: &str, district: &str) {
        lock(&self.state).vendors.insert(
            id.to_string(),
            (business_name.to_string(), district.to_string()),
        );
    }

    pub fn add_promo(&self, code: &str, percentage: u32) {
        let mut state = lock(&self.state);
        let id = format!("promo-{}", state.promos.len() + 1);
        state.promos.push(json!({
            "id": id,
            "code": code,
            "discountPercentage": percentage,
        }));
    }

    /// Require `Authorization: Bearer {token}` on every request.
    pub fn require_token(&self, token: &str) {
        lock(&self.state).token = Some(token.to_string());
    }

    /// Reject every further request with 401.
    pub fn expire_session(&self) {
        lock(&self.state).session_expired = true;
    }

    /// Fail the next request on `route` (e.g. `"POST /cart"`) with `body`.
    pub fn fail_next(&self, route: &str, status: StatusCode, body: &str) {
        lock(&self.state)
            .failures
            .push_back((route.to_string(), status, body.to_string()));
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    /// Requests received on `route`.
    #[must_use]
    pub fn requests_to(&self, route: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.route == route)
            .collect()
    }

    /// Number of lines currently in the server-side cart.
    #[must_use]
    pub fn line_count(&self) -> usize {
        lock(&self.state).lines.len()
    }
}

impl Drop for FakeCartService {
    fn drop(&mut self) {
        self.server.abort();
    }
}
