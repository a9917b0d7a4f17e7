//! CLI commands.

pub mod cart;
pub mod checkout;

use bazaar_cart::config::ConfigError;
use bazaar_cart::{CartConfig, CartError, CartStore, HttpCartClient, PromoError};
use bazaar_core::QuantityError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Promo(#[from] PromoError),

    #[error(transparent)]
    Quantity(#[from] QuantityError),

    /// The item is not in the cart.
    #[error("No cart item with ID {0}")]
    UnknownItem(String),
}

/// A loaded cart and the client behind it.
pub struct Session {
    pub config: CartConfig,
    pub client: HttpCartClient,
    pub store: CartStore<HttpCartClient>,
}

impl Session {
    /// Load configuration, connect and fetch the cart.
    pub async fn connect() -> Result<Self, CliError> {
        let config = CartConfig::from_env()?;
        tracing::debug!(?config, "Loaded configuration");

        let client = HttpCartClient::new(&config)?;
        let store = CartStore::from_config(client.clone(), &config);
        store.refresh().await?;

        Ok(Self {
            config,
            client,
            store,
        })
    }
}
