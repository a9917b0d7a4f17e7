//! Network boundary to the cart service.
//!
//! # Architecture
//!
//! - [`CartApi`] is the seam between the cart store and the network, so the
//!   store can run against [`HttpCartClient`] in production and in-memory
//!   fakes in tests
//! - The cart service is the source of truth. Nothing here caches or patches
//!   cart state; mutation responses are only inspected for errors
//! - No deduplication lives here. Calls for different identities may run
//!   concurrently; duplicate suppression belongs to the store's guards
//!
//! # Endpoints
//!
//! - `GET /cart` - canonical line item list
//! - `POST /cart` - add or increment a product
//! - `DELETE /cart` - remove a line, or decrement it with `decreaseOnly`
//! - `GET /promo-codes` - promo catalog
//! - `GET /vendors/{id}` - vendor name and district

mod conversions;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use bazaar_core::{CartItemId, CartLineItem, ProductId, PromoCode, VariantId, Vendor, VendorId};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::CartConfig;
use crate::error::CartError;

use conversions::{convert_cart, convert_vendor};
use types::{AddItemBody, CartItemPayload, ErrorBody, RemoveItemBody, VendorLookupPayload};

/// Maximum number of body characters included in logs.
const LOG_BODY_LIMIT: usize = 500;

/// Request to add units of a product to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddToCart {
    /// Product to add.
    pub product_id: ProductId,
    /// Units to add (at least 1).
    pub quantity: u32,
    /// Selected variant, if any.
    pub variant_id: Option<VariantId>,
}

/// Operations the cart store needs from the cart service.
///
/// Implementations must be stateless request/response wrappers: every
/// method maps to exactly one remote call.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Fetch the canonical cart.
    async fn fetch_cart(&self) -> Result<Vec<CartLineItem>, CartError>;

    /// Add `quantity` units of a product, creating or incrementing its line.
    async fn add_item(&self, request: &AddToCart) -> Result<(), CartError>;

    /// Remove a line entirely.
    async fn remove_item(&self, item_id: &CartItemId) -> Result<(), CartError>;

    /// Decrement a line by one unit.
    async fn decrement_item(&self, item_id: &CartItemId) -> Result<(), CartError>;

    /// Fetch the promo catalog.
    async fn fetch_promo_codes(&self) -> Result<Vec<PromoCode>, CartError>;

    /// Look up a vendor's business name and district.
    async fn fetch_vendor(&self, vendor_id: &VendorId) -> Result<Vendor, CartError>;
}

#[async_trait]
impl<T: CartApi + ?Sized> CartApi for Arc<T> {
    async fn fetch_cart(&self) -> Result<Vec<CartLineItem>, CartError> {
        (**self).fetch_cart().await
    }

    async fn add_item(&self, request: &AddToCart) -> Result<(), CartError> {
        (**self).add_item(request).await
    }

    async fn remove_item(&self, item_id: &CartItemId) -> Result<(), CartError> {
        (**self).remove_item(item_id).await
    }

    async fn decrement_item(&self, item_id: &CartItemId) -> Result<(), CartError> {
        (**self).decrement_item(item_id).await
    }

    async fn fetch_promo_codes(&self) -> Result<Vec<PromoCode>, CartError> {
        (**self).fetch_promo_codes().await
    }

    async fn fetch_vendor(&self, vendor_id: &VendorId) -> Result<Vendor, CartError> {
        (**self).fetch_vendor(vendor_id).await
    }
}

// =============================================================================
// HttpCartClient
// =============================================================================

/// HTTP client for the cart service.
///
/// Cheaply cloneable; clones share one connection pool.
#[derive(Clone)]
pub struct HttpCartClient {
    inner: Arc<HttpCartClientInner>,
}

struct HttpCartClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCartClient {
    /// Create a new cart service client.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &CartConfig) -> Result<Self, CartError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = config.bearer_token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                CartError::Validation {
                    field: Some("api_token".to_string()),
                    message: format!("Invalid API token format: {e}"),
                }
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        let mut base_url = config.api_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(HttpCartClientInner { client, base_url }),
        })
    }

    /// The base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, CartError> {
        let url = self
            .inner
            .base_url
            .join(path)
            .map_err(|e| CartError::Decode(format!("Invalid request path {path}: {e}")))?;
        Ok(self.inner.client.request(method, url))
    }

    /// Send a request and return the body of a successful response.
    ///
    /// Non-success statuses are classified into a [`CartError`].
    async fn send(&self, request: RequestBuilder) -> Result<String, CartError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        if status != StatusCode::UNAUTHORIZED {
            tracing::debug!(
                status = %status,
                body = %truncate(&text),
                "Cart service returned non-success status"
            );
        }

        let body = ErrorBody::parse(&text);
        let field = body.field.clone();
        let mut message = body.into_message();
        if message.is_empty() {
            message = status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string();
        }
        Err(CartError::from_status(status, message, field))
    }

    /// Send a request and decode its JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CartError> {
        let text = self.send(request).await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&text),
                "Failed to parse cart service response"
            );
            CartError::Decode(e.to_string())
        })
    }
}

#[async_trait]
impl CartApi for HttpCartClient {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<Vec<CartLineItem>, CartError> {
        let payload: Vec<CartItemPayload> =
            self.send_json(self.request(Method::GET, "cart")?).await?;
        let items = convert_cart(payload);
        debug!(lines = items.len(), "Fetched cart");
        Ok(items)
    }

    #[instrument(skip(self, request), fields(product_id = %request.product_id, quantity = request.quantity))]
    async fn add_item(&self, request: &AddToCart) -> Result<(), CartError> {
        let body = AddItemBody {
            product_id: request.product_id.as_str(),
            quantity: request.quantity,
            variant_id: request.variant_id.as_ref().map(VariantId::as_str),
        };
        self.send(self.request(Method::POST, "cart")?.json(&body))
            .await
            .map(drop)
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn remove_item(&self, item_id: &CartItemId) -> Result<(), CartError> {
        let body = RemoveItemBody {
            cart_item_id: item_id.as_str(),
            decrease_only: false,
        };
        self.send(self.request(Method::DELETE, "cart")?.json(&body))
            .await
            .map(drop)
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn decrement_item(&self, item_id: &CartItemId) -> Result<(), CartError> {
        let body = RemoveItemBody {
            cart_item_id: item_id.as_str(),
            decrease_only: true,
        };
        self.send(self.request(Method::DELETE, "cart")?.json(&body))
            .await
            .map(drop)
    }

    #[instrument(skip(self))]
    async fn fetch_promo_codes(&self) -> Result<Vec<PromoCode>, CartError> {
        self.send_json(self.request(Method::GET, "promo-codes")?)
            .await
    }

    #[instrument(skip(self), fields(vendor_id = %vendor_id))]
    async fn fetch_vendor(&self, vendor_id: &VendorId) -> Result<Vendor, CartError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CartError::Decode("Cart service URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["vendors", vendor_id.as_str()]);

        let payload: VendorLookupPayload = self
            .send_json(self.inner.client.get(url))
            .await
            .map_err(|e| match e {
                CartError::NotFound(_) => CartError::NotFound(format!("Vendor {vendor_id}")),
                other => other,
            })?;
        Ok(convert_vendor(vendor_id.clone(), payload))
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(LOG_BODY_LIMIT).collect()
}
