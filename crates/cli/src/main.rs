//! Bazaar CLI - drive the cart service from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! bazaar cart show
//!
//! # Add two units of a product
//! bazaar cart add --product prod_123 --quantity 2
//!
//! # Change a line's quantity
//! bazaar cart increase --item line_9 --amount 1
//! bazaar cart decrease --item line_9
//!
//! # Price the cart for a district with a promo code
//! bazaar checkout --district Lalitpur --promo SAVE10
//!
//! # Price a single item at a different quantity
//! bazaar checkout --district Pokhara --buy-now line_9 --quantity 3
//! ```
//!
//! # Environment Variables
//!
//! See `bazaar_cart::config` for the cart service settings. `SENTRY_DSN`
//! enables error reporting.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar cart and checkout tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Group the cart by vendor and price it
    Checkout {
        /// Delivery district; shipping is free while unknown
        #[arg(short, long)]
        district: Option<String>,

        /// Promo code to apply to the grand total
        #[arg(short, long)]
        promo: Option<String>,

        /// Price only this cart item
        #[arg(long, value_name = "ITEM")]
        buy_now: Option<String>,

        /// Quantity for --buy-now
        #[arg(short, long, default_value_t = 1, requires = "buy_now")]
        quantity: u32,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines
    Show,
    /// Add a product
    Add {
        /// Product ID
        #[arg(short, long)]
        product: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Variant ID
        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Remove a line
    Remove {
        /// Cart item ID
        #[arg(short, long)]
        item: String,
    },
    /// Increase a line's quantity
    Increase {
        /// Cart item ID
        #[arg(short, long)]
        item: String,

        #[arg(short, long, default_value_t = 1)]
        amount: u32,
    },
    /// Decrease a line's quantity, removing it at zero
    Decrease {
        /// Cart item ID
        #[arg(short, long)]
        item: String,

        #[arg(short, long, default_value_t = 1)]
        amount: u32,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN")
        .ok()
        .filter(|dsn| !dsn.trim().is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Send warnings and errors to Sentry as events, info and debug as breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let _sentry_guard = init_sentry();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_cart=info,bazaar_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let session = commands::Session::connect().await?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&session),
            CartAction::Add {
                product,
                quantity,
                variant,
            } => commands::cart::add(&session, &product, quantity, variant.as_deref()).await?,
            CartAction::Remove { item } => commands::cart::remove(&session, &item).await?,
            CartAction::Increase { item, amount } => {
                commands::cart::increase(&session, &item, amount).await?;
            }
            CartAction::Decrease { item, amount } => {
                commands::cart::decrease(&session, &item, amount).await?;
            }
        },
        Commands::Checkout {
            district,
            promo,
            buy_now,
            quantity,
        } => {
            let options = commands::checkout::CheckoutOptions {
                district,
                promo,
                buy_now: buy_now.map(|item| (item, quantity)),
            };
            commands::checkout::run(&session, options).await?;
        }
    }
    Ok(())
}
